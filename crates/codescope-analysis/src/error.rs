//! Error types for the codescope-analysis crate
//!
//! The pipeline absorbs collaborator failures (history, reviews,
//! summarization all degrade in place), so the only errors that reach the
//! caller are rejections raised before any stage runs.

use thiserror::Error;

/// Result type alias for analysis operations
pub type AnalysisResult<T> = Result<T, AnalysisError>;

/// Analysis orchestration error type
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AnalysisError {
    /// Another analysis holds the busy flag
    #[error("An analysis is already in progress; retry once it completes")]
    Busy,

    /// The requested line range cannot describe a 1-based inclusive span
    #[error("Invalid line range {start}-{end}: lines are 1-based and end must not precede start")]
    InvalidRange { start: u32, end: u32 },
}
