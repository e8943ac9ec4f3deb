//! Retry and timeout combinators for external calls
//!
//! Every outbound call in the pipeline (git invocations, GitHub lookups,
//! reasoning-service requests) is wrapped in a per-call deadline and then
//! retried with exponential backoff. The timeout wraps the operation first;
//! the timeout-wrapped call is the unit that gets retried, so a timed-out
//! attempt counts as one retryable failure.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

/// Error produced when an operation exceeds its per-call deadline
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("operation '{operation}' timed out after {timeout_ms}ms")]
pub struct TimeoutError {
    /// Human-readable name of the operation that was abandoned
    pub operation: String,
    /// The deadline that was exceeded, in milliseconds
    pub timeout_ms: u64,
}

/// Observer invoked before each retry sleep: (next attempt number, delay, error text).
/// Side-effect only; must not alter control flow.
pub type RetryObserver = Arc<dyn Fn(u32, Duration, &str) + Send + Sync>;

/// Policy governing [`with_retry`]
#[derive(Clone)]
pub struct RetryPolicy {
    /// Total number of attempts, including the first (never retried below 1)
    pub max_attempts: u32,
    /// Delay before the first retry
    pub initial_delay: Duration,
    /// Multiplier applied to the delay after each retry
    pub backoff_multiplier: f64,
    /// Upper bound on the inter-attempt delay
    pub max_delay: Duration,
    /// Classifier deciding, from the error's display text, whether a failure
    /// is worth retrying
    pub is_retryable: fn(&str) -> bool,
    /// Optional diagnostics hook called before each retry
    pub on_retry: Option<RetryObserver>,
}

impl std::fmt::Debug for RetryPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("max_attempts", &self.max_attempts)
            .field("initial_delay", &self.initial_delay)
            .field("backoff_multiplier", &self.backoff_multiplier)
            .field("max_delay", &self.max_delay)
            .finish_non_exhaustive()
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(500),
            backoff_multiplier: 2.0,
            max_delay: Duration::from_secs(10),
            is_retryable: is_transient_error,
            on_retry: None,
        }
    }
}

impl RetryPolicy {
    /// Attach a diagnostics observer called before each retry
    #[must_use]
    pub fn with_observer(mut self, observer: RetryObserver) -> Self {
        self.on_retry = Some(observer);
        self
    }
}

/// Default classifier matching transient network and overload signatures
pub fn is_transient_error(message: &str) -> bool {
    const TRANSIENT: &[&str] = &[
        "timed out",
        "timeout",
        "rate limit",
        "rate_limit",
        "connection reset",
        "econnreset",
        "dns",
        "socket hang up",
        "overloaded",
        "503",
        "529",
    ];
    let lower = message.to_lowercase();
    TRANSIENT.iter().any(|needle| lower.contains(needle))
}

/// Invoke `op` until it succeeds or the policy is exhausted
///
/// Retries only errors the policy classifies as retryable; a non-retryable
/// error is returned immediately. On exhaustion the final attempt's error is
/// returned.
///
/// # Errors
///
/// Returns the last error produced by `op`.
pub async fn with_retry<T, E, F, Fut>(policy: &RetryPolicy, op_name: &str, mut op: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut delay = policy.initial_delay;

    for attempt in 1..=max_attempts {
        match op().await {
            Ok(value) => return Ok(value),
            Err(error) => {
                let message = error.to_string();
                let last_attempt = attempt >= max_attempts;
                if last_attempt || !(policy.is_retryable)(&message) {
                    return Err(error);
                }

                if let Some(observer) = &policy.on_retry {
                    observer(attempt.saturating_add(1), delay, &message);
                }
                tracing::warn!(
                    operation = op_name,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    error = %message,
                    "retrying after transient failure"
                );

                tokio::time::sleep(delay).await;
                delay = next_delay(delay, policy.backoff_multiplier, policy.max_delay);
            }
        }
    }

    // The loop always returns on the final attempt
    unreachable!()
}

fn next_delay(current: Duration, multiplier: f64, max: Duration) -> Duration {
    let scaled = current.as_secs_f64() * multiplier.max(1.0);
    Duration::from_secs_f64(scaled).min(max)
}

/// Race `op` against a deadline; whichever settles first wins
///
/// The losing future is dropped, which is sufficient here - none of the
/// wrapped calls hold resources that outlive their future.
///
/// # Errors
///
/// Returns the operation's own error, or `E::from(TimeoutError)` when the
/// deadline is exceeded.
pub async fn with_timeout<T, E, Fut>(duration: Duration, op_name: &str, op: Fut) -> Result<T, E>
where
    Fut: Future<Output = Result<T, E>>,
    E: From<TimeoutError>,
{
    match tokio::time::timeout(duration, op).await {
        Ok(result) => result,
        Err(_) => Err(E::from(TimeoutError {
            operation: op_name.to_string(),
            timeout_ms: duration.as_millis() as u64,
        })),
    }
}
