//! Common utilities shared across Codescope crates
//!
//! Provides the correlation ID used for tracing operations across service
//! boundaries, the retry/timeout combinators every external call goes
//! through, and one-shot environment initialization.

pub mod correlation;
pub mod init;
pub mod retry;

pub use correlation::CorrelationId;
pub use init::initialize_environment;
pub use retry::{with_retry, with_timeout, RetryPolicy, TimeoutError};
