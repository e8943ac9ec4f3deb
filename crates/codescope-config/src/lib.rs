//! Centralized configuration management for codescope
//!
//! Every tunable in the analysis pipeline lives here: cache TTL, retry
//! policy, git lookback depth, GitHub batching, reasoning-service limits.
//!
//! Configuration follows a simple hierarchy:
//! 1. Safe defaults (defined as constants)
//! 2. Environment variable overrides
//! 3. Runtime validation

pub mod error;

pub use error::{ConfigError, ConfigResult};

// =============================================================================
// SAFE DEFAULTS - Work without any environment configuration
// =============================================================================

// History mining
const DEFAULT_HISTORY_MAX_COMMITS: usize = 50; // Bounded log depth per range

// Review-link resolution (GitHub)
const DEFAULT_REVIEWS_API_BASE: &str = "https://api.github.com";
const DEFAULT_REVIEWS_BATCH_SIZE: usize = 5; // Concurrent lookups per batch
const DEFAULT_REVIEWS_MAX_LOOKBACK_COMMITS: usize = 20;
const DEFAULT_REVIEWS_MAX_RESULTS: usize = 10;
const DEFAULT_REVIEWS_TIMEOUT_SECONDS: u64 = 10;

// Reasoning service
const DEFAULT_REASONING_API_BASE: &str = "https://api.openai.com/v1";
const DEFAULT_REASONING_MODEL: &str = "gpt-4o-mini";
const DEFAULT_REASONING_MAX_CODE_CHARS: usize = 6_000; // Tail-truncated excerpt
const DEFAULT_REASONING_MAX_CONTEXT_COMMITS: usize = 5;
const DEFAULT_REASONING_TIMEOUT_SECONDS: u64 = 30;

// Retry policy for remote calls
const DEFAULT_RETRY_MAX_ATTEMPTS: u32 = 3;
const DEFAULT_RETRY_INITIAL_DELAY_MS: u64 = 500;
const DEFAULT_RETRY_BACKOFF_MULTIPLIER: f64 = 2.0;
const DEFAULT_RETRY_MAX_DELAY_MS: u64 = 10_000;

// Result cache
const DEFAULT_CACHE_TTL_SECONDS: u64 = 300; // 5 minutes

// Telemetry
const DEFAULT_TRACING_LEVEL: &str = "info";

/// Core configuration for the entire codescope application
///
/// All settings have safe defaults and can be overridden via environment
/// variables prefixed with `CODESCOPE_`.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ApplicationConfig {
    /// History mining configuration
    pub history: HistoryConfig,

    /// Review-link resolution configuration
    pub reviews: ReviewsConfig,

    /// Reasoning-service configuration
    pub reasoning: ReasoningConfig,

    /// Retry policy applied to remote calls
    pub retry: RetryConfig,

    /// Result cache configuration
    pub cache: CacheConfig,

    /// Telemetry configuration
    pub telemetry: TelemetryConfig,
}

/// History mining configuration
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct HistoryConfig {
    /// Maximum number of commits fetched per line-range query
    pub max_commits: usize,
}

/// Review-link resolution configuration
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ReviewsConfig {
    /// Bearer token for the hosting API; absence degrades to an
    /// annotated-empty PR section rather than an error
    pub token: Option<String>,

    /// Base URL of the hosting API
    pub api_base: String,

    /// Number of concurrent per-commit lookups per batch
    pub batch_size: usize,

    /// Maximum commits considered when searching for linked PRs
    pub max_lookback_commits: usize,

    /// Stop collecting once this many distinct PRs are found
    pub max_results: usize,

    /// Per-lookup deadline in seconds
    pub timeout_seconds: u64,
}

/// Reasoning-service configuration
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ReasoningConfig {
    /// API key; absence routes summarization to the heuristic strategy
    pub api_key: Option<String>,

    /// Base URL of the reasoning API
    pub api_base: String,

    /// Model identifier sent with each request
    pub model: String,

    /// Hard cap on code excerpt length (characters, tail truncated)
    pub max_code_chars: usize,

    /// Maximum recent commit subjects included as context
    pub max_context_commits: usize,

    /// Per-call deadline in seconds
    pub timeout_seconds: u64,
}

/// Retry policy applied to remote calls
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct RetryConfig {
    /// Total attempts including the first
    pub max_attempts: u32,

    /// Delay before the first retry, milliseconds
    pub initial_delay_ms: u64,

    /// Multiplier applied after each retry
    pub backoff_multiplier: f64,

    /// Cap on the inter-attempt delay, milliseconds
    pub max_delay_ms: u64,
}

/// Result cache configuration
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct CacheConfig {
    /// Wall-clock lifetime of a cache entry, seconds
    pub ttl_seconds: u64,
}

/// Telemetry configuration
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct TelemetryConfig {
    /// Default tracing level when `RUST_LOG` is unset
    pub tracing_level: String,
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            history: HistoryConfig {
                max_commits: DEFAULT_HISTORY_MAX_COMMITS,
            },
            reviews: ReviewsConfig {
                token: None,
                api_base: DEFAULT_REVIEWS_API_BASE.to_string(),
                batch_size: DEFAULT_REVIEWS_BATCH_SIZE,
                max_lookback_commits: DEFAULT_REVIEWS_MAX_LOOKBACK_COMMITS,
                max_results: DEFAULT_REVIEWS_MAX_RESULTS,
                timeout_seconds: DEFAULT_REVIEWS_TIMEOUT_SECONDS,
            },
            reasoning: ReasoningConfig {
                api_key: None,
                api_base: DEFAULT_REASONING_API_BASE.to_string(),
                model: DEFAULT_REASONING_MODEL.to_string(),
                max_code_chars: DEFAULT_REASONING_MAX_CODE_CHARS,
                max_context_commits: DEFAULT_REASONING_MAX_CONTEXT_COMMITS,
                timeout_seconds: DEFAULT_REASONING_TIMEOUT_SECONDS,
            },
            retry: RetryConfig {
                max_attempts: DEFAULT_RETRY_MAX_ATTEMPTS,
                initial_delay_ms: DEFAULT_RETRY_INITIAL_DELAY_MS,
                backoff_multiplier: DEFAULT_RETRY_BACKOFF_MULTIPLIER,
                max_delay_ms: DEFAULT_RETRY_MAX_DELAY_MS,
            },
            cache: CacheConfig {
                ttl_seconds: DEFAULT_CACHE_TTL_SECONDS,
            },
            telemetry: TelemetryConfig {
                tracing_level: DEFAULT_TRACING_LEVEL.to_string(),
            },
        }
    }
}

impl ApplicationConfig {
    /// Build configuration from defaults overridden by environment variables
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(v) = env_parse("CODESCOPE_HISTORY_MAX_COMMITS") {
            config.history.max_commits = v;
        }

        config.reviews.token = env_string("CODESCOPE_GITHUB_TOKEN")
            .or_else(|| env_string("GITHUB_TOKEN"))
            .or(config.reviews.token);
        if let Some(v) = env_string("CODESCOPE_REVIEWS_API_BASE") {
            config.reviews.api_base = v;
        }
        if let Some(v) = env_parse("CODESCOPE_REVIEWS_BATCH_SIZE") {
            config.reviews.batch_size = v;
        }
        if let Some(v) = env_parse("CODESCOPE_REVIEWS_MAX_LOOKBACK_COMMITS") {
            config.reviews.max_lookback_commits = v;
        }
        if let Some(v) = env_parse("CODESCOPE_REVIEWS_MAX_RESULTS") {
            config.reviews.max_results = v;
        }
        if let Some(v) = env_parse("CODESCOPE_REVIEWS_TIMEOUT_SECONDS") {
            config.reviews.timeout_seconds = v;
        }

        config.reasoning.api_key = env_string("CODESCOPE_REASONING_API_KEY")
            .or_else(|| env_string("OPENAI_API_KEY"))
            .or(config.reasoning.api_key);
        if let Some(v) = env_string("CODESCOPE_REASONING_API_BASE") {
            config.reasoning.api_base = v;
        }
        if let Some(v) = env_string("CODESCOPE_REASONING_MODEL") {
            config.reasoning.model = v;
        }
        if let Some(v) = env_parse("CODESCOPE_REASONING_MAX_CODE_CHARS") {
            config.reasoning.max_code_chars = v;
        }
        if let Some(v) = env_parse("CODESCOPE_REASONING_MAX_CONTEXT_COMMITS") {
            config.reasoning.max_context_commits = v;
        }
        if let Some(v) = env_parse("CODESCOPE_REASONING_TIMEOUT_SECONDS") {
            config.reasoning.timeout_seconds = v;
        }

        if let Some(v) = env_parse("CODESCOPE_RETRY_MAX_ATTEMPTS") {
            config.retry.max_attempts = v;
        }
        if let Some(v) = env_parse("CODESCOPE_RETRY_INITIAL_DELAY_MS") {
            config.retry.initial_delay_ms = v;
        }
        if let Some(v) = env_parse("CODESCOPE_RETRY_BACKOFF_MULTIPLIER") {
            config.retry.backoff_multiplier = v;
        }
        if let Some(v) = env_parse("CODESCOPE_RETRY_MAX_DELAY_MS") {
            config.retry.max_delay_ms = v;
        }

        if let Some(v) = env_parse("CODESCOPE_CACHE_TTL_SECONDS") {
            config.cache.ttl_seconds = v;
        }

        if let Some(v) = env_string("CODESCOPE_TRACING_LEVEL") {
            config.telemetry.tracing_level = v;
        }

        config
    }

    /// Validate configuration invariants
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the offending field when a
    /// value cannot drive the pipeline (zero attempts, zero batch width,
    /// sub-1.0 backoff, zero TTL).
    pub fn validate(&self) -> ConfigResult<()> {
        if self.history.max_commits == 0 {
            return Err(ConfigError::invalid("history.max_commits must be > 0"));
        }
        if self.reviews.batch_size == 0 {
            return Err(ConfigError::invalid("reviews.batch_size must be > 0"));
        }
        if self.reviews.max_results == 0 {
            return Err(ConfigError::invalid("reviews.max_results must be > 0"));
        }
        if self.retry.max_attempts == 0 {
            return Err(ConfigError::invalid("retry.max_attempts must be > 0"));
        }
        if self.retry.backoff_multiplier < 1.0 {
            return Err(ConfigError::invalid(
                "retry.backoff_multiplier must be >= 1.0",
            ));
        }
        if self.cache.ttl_seconds == 0 {
            return Err(ConfigError::invalid("cache.ttl_seconds must be > 0"));
        }
        if self.reasoning.max_code_chars == 0 {
            return Err(ConfigError::invalid("reasoning.max_code_chars must be > 0"));
        }
        Ok(())
    }
}

fn env_string(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    match std::env::var(key) {
        Ok(raw) => match raw.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("ignoring unparseable {key}={raw}");
                None
            }
        },
        Err(_) => None,
    }
}
