//! Error types for the codescope-purpose crate
//!
//! Only the reasoning-service strategy produces these; the heuristic
//! strategy is infallible and the summarizer front absorbs every reasoning
//! failure by failing over.

use codescope_common::TimeoutError;
use thiserror::Error;

/// Result type alias for purpose analysis
pub type PurposeResult<T> = Result<T, PurposeError>;

/// Purpose-analysis error type
#[derive(Error, Debug)]
pub enum PurposeError {
    /// The reasoning service answered with a non-success status
    #[error("Reasoning service error (HTTP {status}): {message}")]
    Service { status: u16, message: String },

    /// Transport-level failure reaching the service
    #[error("Network error: {0}")]
    Network(String),

    /// The response carried no decodable analysis document
    #[error("Malformed reasoning response: {0}")]
    MalformedResponse(String),

    /// Local per-call deadline exceeded
    #[error(transparent)]
    Timeout(#[from] TimeoutError),
}

impl From<reqwest::Error> for PurposeError {
    fn from(error: reqwest::Error) -> Self {
        Self::Network(error.to_string())
    }
}
