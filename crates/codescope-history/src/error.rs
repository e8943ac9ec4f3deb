//! Error types for the codescope-history crate
//!
//! These errors stay inside the crate boundary: `HistoryMiner::mine`
//! absorbs every one of them into an empty summary.

use thiserror::Error;

/// Result type alias for history operations
pub type HistoryResult<T> = Result<T, HistoryError>;

/// History mining error type
#[derive(Error, Debug)]
pub enum HistoryError {
    /// The git tool rejected the invocation
    #[error("Git invocation failed: {0}")]
    Git(String),

    /// Spawning or waiting on the git process failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
