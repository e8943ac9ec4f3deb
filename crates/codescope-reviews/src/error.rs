//! Error taxonomy for review-link resolution
//!
//! Status codes are mapped to distinct variants because the caller renders
//! them differently: 401 is a credential problem the user can fix, 403 may
//! just mean a rate limit, 404 is not an error at all (mapped to an empty
//! result before reaching this type).

use codescope_common::TimeoutError;
use thiserror::Error;

/// Result type alias for review operations
pub type ReviewsResult<T> = Result<T, ReviewsError>;

/// Review-link resolution error type
#[derive(Error, Debug, Clone)]
pub enum ReviewsError {
    /// No hosting credential configured; user-actionable, never aborts
    #[error("GitHub token is not configured - set CODESCOPE_GITHUB_TOKEN to link pull requests")]
    MissingCredential,

    /// Repository has no `origin` remote
    #[error("No remote origin configured for this repository")]
    NoOrigin,

    /// The origin URL does not match any recognized hosting form
    #[error("Remote origin '{0}' could not be parsed into owner/repo")]
    UnrecognizedOrigin(String),

    /// HTTP 401
    #[error("GitHub rejected the credential (HTTP 401) - check the configured token")]
    InvalidCredential,

    /// HTTP 403: insufficient permission or rate limit exceeded
    #[error("GitHub denied access or the rate limit was exceeded (HTTP 403)")]
    PermissionOrRateLimit,

    /// Any other non-2xx response
    #[error("GitHub request failed (HTTP {status}): {message}")]
    Remote { status: u16, message: String },

    /// Transport-level failure
    #[error("Network error: {0}")]
    Network(String),

    /// Local per-call deadline exceeded
    #[error(transparent)]
    Timeout(#[from] TimeoutError),
}

impl From<reqwest::Error> for ReviewsError {
    fn from(error: reqwest::Error) -> Self {
        Self::Network(error.to_string())
    }
}
