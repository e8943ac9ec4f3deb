//! Codescope CLI
//!
//! Analyzes one line range of one file: who changed it, how often, which
//! pull requests introduced it, and what it appears to do. Prints the merged
//! report as pretty JSON.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use codescope_analysis::{AnalysisOrchestrator, AnalysisOutcome, AnalysisRequest};
use codescope_common::{initialize_environment, RetryPolicy};
use codescope_config::{ApplicationConfig, RetryConfig};
use codescope_history::GitHistoryMiner;
use codescope_purpose::{PurposeStrategy, ReasoningClient, ReasoningStrategy, Summarizer};
use codescope_reviews::{GitHubClient, ReviewHost, ReviewResolver};

#[derive(Parser, Debug)]
#[command(
    name = "codescope",
    about = "Provenance and purpose analysis for a file line range"
)]
struct Cli {
    /// File to analyze
    file: PathBuf,

    /// First line of the range (1-based)
    #[arg(long)]
    start: u32,

    /// Last line of the range (inclusive)
    #[arg(long)]
    end: u32,

    /// Recompute even when a fresh cached report exists
    #[arg(long)]
    force_refresh: bool,

    /// Drop all cached reports before running
    #[arg(long)]
    clear_cache: bool,
}

fn retry_policy(config: &RetryConfig) -> RetryPolicy {
    RetryPolicy {
        max_attempts: config.max_attempts,
        initial_delay: Duration::from_millis(config.initial_delay_ms),
        backoff_multiplier: config.backoff_multiplier,
        max_delay: Duration::from_millis(config.max_delay_ms),
        ..RetryPolicy::default()
    }
}

fn build_orchestrator(config: &ApplicationConfig) -> AnalysisOrchestrator {
    let miner = GitHistoryMiner::with_cli(config.history.max_commits);

    let host = config.reviews.token.as_ref().map(|token| {
        Arc::new(GitHubClient::new(config.reviews.api_base.clone(), token.clone()))
            as Arc<dyn ReviewHost>
    });
    let resolver = ReviewResolver::new(
        host,
        retry_policy(&config.retry),
        Duration::from_secs(config.reviews.timeout_seconds),
        config.reviews.batch_size,
        config.reviews.max_lookback_commits,
        config.reviews.max_results,
    );

    let preferred = config.reasoning.api_key.as_ref().map(|key| {
        let backend = Arc::new(ReasoningClient::new(
            config.reasoning.api_base.clone(),
            key.clone(),
        ));
        Arc::new(ReasoningStrategy::new(
            backend,
            config.reasoning.model.clone(),
            retry_policy(&config.retry),
            Duration::from_secs(config.reasoning.timeout_seconds),
            config.reasoning.max_code_chars,
            config.reasoning.max_context_commits,
        )) as Arc<dyn PurposeStrategy>
    });

    AnalysisOrchestrator::new(
        Arc::new(miner),
        Arc::new(Summarizer::new(preferred)),
        Arc::new(resolver),
        Duration::from_secs(config.cache.ttl_seconds),
    )
}

/// Extract the requested 1-based inclusive line range from the file
fn read_range(path: &std::path::Path, start: u32, end: u32) -> anyhow::Result<String> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read {}", path.display()))?;

    let lines: Vec<&str> = contents.lines().collect();
    let total = u32::try_from(lines.len()).unwrap_or(u32::MAX);
    if start == 0 || end < start {
        bail!("invalid range {start}-{end}: lines are 1-based and end must not precede start");
    }
    if start > total {
        bail!(
            "range {start}-{end} starts past the end of {} ({total} lines)",
            path.display()
        );
    }

    let from = usize::try_from(start).unwrap_or(usize::MAX).saturating_sub(1);
    let to = usize::try_from(end).unwrap_or(usize::MAX).min(lines.len());
    Ok(lines
        .get(from..to)
        .unwrap_or_default()
        .join("\n"))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    initialize_environment();

    let config = ApplicationConfig::from_env();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.telemetry.tracing_level.clone())),
        )
        .with_target(false)
        .init();

    config.validate().context("invalid configuration")?;

    let cli = Cli::parse();
    let code = read_range(&cli.file, cli.start, cli.end)?;

    let orchestrator = build_orchestrator(&config);
    if cli.clear_cache {
        let dropped = orchestrator.clear_cache();
        tracing::info!(dropped, "cache cleared");
    }

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("interrupt received, cancelling at the next stage boundary");
                cancel.cancel();
            }
        });
    }

    let request = AnalysisRequest::new(cli.file, cli.start, cli.end, code);
    match orchestrator.analyze(request, &cancel, cli.force_refresh).await? {
        AnalysisOutcome::Completed(report) => {
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        AnalysisOutcome::Cancelled => {
            eprintln!("analysis cancelled");
        }
    }

    Ok(())
}
