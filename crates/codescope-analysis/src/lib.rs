//! Analysis orchestration and result caching
//!
//! Ties the pipeline together: one request yields one merged report built
//! from history mining, purpose summarization and review resolution, served
//! from a content-validated TTL cache when nothing has changed. One run at
//! a time; cancellation is cooperative and cancels cleanly between stages.

pub mod cache;
pub mod error;
pub mod models;
pub mod orchestrator;

pub use cache::AnalysisCache;
pub use error::{AnalysisError, AnalysisResult};
pub use models::{AnalysisOutcome, AnalysisRequest, MergedReport};
pub use orchestrator::{AnalysisOrchestrator, ReviewLinker};
