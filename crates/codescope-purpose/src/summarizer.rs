//! Summarizer front
//!
//! Owns strategy selection and failover. The reasoning strategy runs when a
//! credential is configured; any failure there degrades to the heuristic
//! strategy instead of surfacing an error, so callers always receive an
//! analysis.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::PurposeResult;
use crate::heuristics::HeuristicStrategy;
use crate::models::PurposeAnalysis;

/// A single summarization strategy, fallible
#[async_trait]
pub trait PurposeStrategy: Send + Sync {
    /// Produce a structured analysis for the code block
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::PurposeError`] when the strategy cannot
    /// produce an analysis. The heuristic strategy never errors.
    async fn summarize(
        &self,
        code: &str,
        path: &Path,
        recent_commits: &[String],
    ) -> PurposeResult<PurposeAnalysis>;
}

/// The infallible summarization surface the pipeline depends on
#[async_trait]
pub trait PurposeProvider: Send + Sync {
    /// Summarize the code block, always yielding an analysis
    async fn summarize(
        &self,
        code: &str,
        path: &Path,
        recent_commits: &[String],
    ) -> PurposeAnalysis;
}

/// Front that tries the preferred strategy and falls back to heuristics
pub struct Summarizer {
    preferred: Option<Arc<dyn PurposeStrategy>>,
    fallback: HeuristicStrategy,
}

impl Summarizer {
    /// Build a summarizer with an optional preferred strategy
    ///
    /// Pass `None` when no reasoning credential is configured; analysis
    /// then runs purely on heuristics.
    #[must_use]
    pub fn new(preferred: Option<Arc<dyn PurposeStrategy>>) -> Self {
        Self {
            preferred,
            fallback: HeuristicStrategy::new(),
        }
    }

    /// Heuristics-only summarizer
    #[must_use]
    pub fn heuristic_only() -> Self {
        Self::new(None)
    }
}

#[async_trait]
impl PurposeProvider for Summarizer {
    #[tracing::instrument(skip_all, fields(path = %path.display()))]
    async fn summarize(
        &self,
        code: &str,
        path: &Path,
        recent_commits: &[String],
    ) -> PurposeAnalysis {
        if let Some(preferred) = &self.preferred {
            match preferred.summarize(code, path, recent_commits).await {
                Ok(analysis) => return analysis,
                Err(error) => {
                    tracing::warn!(%error, "preferred strategy failed, using heuristics");
                }
            }
        }

        self.fallback.analyze(code, path)
    }
}
