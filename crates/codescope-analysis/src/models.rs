//! Request and report models for the analysis pipeline

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use codescope_history::HistorySummary;
use codescope_purpose::PurposeAnalysis;
use codescope_reviews::PullRequestRecord;

/// One analysis request: a contiguous 1-based inclusive line range of a file
/// together with the code text currently occupying it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisRequest {
    /// File the range belongs to
    pub path: PathBuf,
    /// First line of the range, 1-based
    pub start_line: u32,
    /// Last line of the range, inclusive
    pub end_line: u32,
    /// Code text of the range as it exists right now
    pub code: String,
}

impl AnalysisRequest {
    pub fn new(
        path: impl Into<PathBuf>,
        start_line: u32,
        end_line: u32,
        code: impl Into<String>,
    ) -> Self {
        Self {
            path: path.into(),
            start_line,
            end_line,
            code: code.into(),
        }
    }
}

/// The merged output of all pipeline stages for one request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergedReport {
    /// File path as requested
    pub path: String,
    /// First line of the analyzed range
    pub start_line: u32,
    /// Last line of the analyzed range
    pub end_line: u32,
    /// Semantic purpose analysis
    pub purpose: PurposeAnalysis,
    /// Mined commit history, ownership and change frequency
    pub history: HistorySummary,
    /// Pull requests linked to the range's commits
    pub pull_requests: Vec<PullRequestRecord>,
    /// Present when review resolution could not run or was degraded
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reviews_error: Option<String>,
    /// When the underlying analysis was computed
    pub analyzed_at: DateTime<Utc>,
    /// Whether this report was served from the cache
    pub from_cache: bool,
    /// Age of the cached computation in seconds, present only on cache hits
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_age_seconds: Option<u64>,
}

/// How an analysis run ended
///
/// Cancellation is a successful outcome, not an error: the caller asked the
/// pipeline to stop and it did, producing no report and caching nothing.
#[derive(Debug, Clone, PartialEq)]
pub enum AnalysisOutcome {
    /// The pipeline ran to completion
    Completed(Box<MergedReport>),
    /// Cancellation was observed at a stage boundary
    Cancelled,
}

impl AnalysisOutcome {
    /// The report, if the run completed
    pub fn into_report(self) -> Option<Box<MergedReport>> {
        match self {
            Self::Completed(report) => Some(report),
            Self::Cancelled => None,
        }
    }
}
