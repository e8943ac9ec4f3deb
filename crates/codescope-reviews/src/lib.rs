//! Pull-request linking for analyzed commit ranges
//!
//! Given the commits touching a line range, queries the hosting API for the
//! pull requests that introduced them. Every failure mode here is non-fatal
//! to the analysis pipeline: missing credential, unparseable origin and
//! remote errors all degrade to an annotated-empty PR section.

pub mod client;
pub mod error;
pub mod models;
pub mod remote;
pub mod resolver;

pub use client::{GitHubClient, ReviewHost};
pub use error::{ReviewsError, ReviewsResult};
pub use models::{PrState, PullRequestRecord};
pub use remote::parse_remote_url;
pub use resolver::{ReviewLinks, ReviewResolver};
