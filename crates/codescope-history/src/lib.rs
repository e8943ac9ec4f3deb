//! Version-control history mining for a single file line range
//!
//! Extracts commit history scoped to a contiguous line range, derives
//! per-author ownership statistics and a change-frequency label. History
//! absence (no repository, git failure, binary file) is a valid terminal
//! state, never an error - the rest of the analysis pipeline must keep
//! going without provenance data.

pub mod error;
pub mod miner;
pub mod models;
pub mod parse;
pub mod runner;

pub use error::{HistoryError, HistoryResult};
pub use miner::{GitHistoryMiner, HistoryMiner};
pub use models::{ChangeFrequency, CommitRecord, HistorySummary, OwnerStat};
pub use runner::{CliGitRunner, GitRunner, RepoContext};
