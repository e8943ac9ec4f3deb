//! Git collaborator: repository discovery and raw log invocation
//!
//! Log queries shell out to the `git` CLI because the two textual formats
//! the miner parses are part of the collaborator contract. Repository
//! discovery and origin lookup go through libgit2, which is cheaper than a
//! subprocess for local metadata.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use git2::Repository;
use tokio::process::Command;

use crate::error::{HistoryError, HistoryResult};

/// Sentinel prefixing each commit header in the batched-stat log format
pub const COMMIT_SENTINEL: &str = "@@COMMIT@@";

/// Pretty format shared by both query shapes: `hash|short|name|email|iso|subject`
const LOG_FIELDS: &str = "%H|%h|%an|%ae|%aI|%s";

/// Where a file lives relative to its containing repository
#[derive(Debug, Clone)]
pub struct RepoContext {
    /// Repository working-tree root
    pub root: PathBuf,
    /// Forward-slash path of the file relative to the root
    pub relative_path: String,
    /// URL of the `origin` remote, if configured
    pub origin_url: Option<String>,
}

impl RepoContext {
    /// Locate the repository containing `path`
    ///
    /// Returns `None` when the path is not under version control - a valid
    /// terminal state for the pipeline, not an error.
    pub fn discover(path: &Path) -> Option<Self> {
        // Canonicalize so symlinked temp dirs resolve the same way libgit2
        // reports the working tree
        let path = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
        let repo = Repository::discover(&path).ok()?;
        let root = repo.workdir()?.to_path_buf();

        let relative = path.strip_prefix(&root).ok()?;
        let relative_path = relative.to_string_lossy().replace('\\', "/");

        let origin_url = repo
            .find_remote("origin")
            .ok()
            .and_then(|remote| remote.url().map(std::string::ToString::to_string));

        Some(Self {
            root,
            relative_path,
            origin_url,
        })
    }
}

/// Async boundary to the git log tool
///
/// Both methods return raw stdout for the miner to parse; invocation
/// failures surface as [`HistoryError`] and are absorbed by the miner.
#[async_trait]
pub trait GitRunner: Send + Sync {
    /// Line-range-scoped history (`git log -L`), newest-first
    async fn line_range_log(
        &self,
        root: &Path,
        relative_path: &str,
        start_line: u32,
        end_line: u32,
        max_commits: usize,
    ) -> HistoryResult<String>;

    /// Whole-file history with per-commit numstat totals in one batched
    /// call, each commit header prefixed by [`COMMIT_SENTINEL`]
    async fn file_stat_log(
        &self,
        root: &Path,
        relative_path: &str,
        max_commits: usize,
    ) -> HistoryResult<String>;
}

/// Production [`GitRunner`] invoking the `git` binary
#[derive(Debug, Default, Clone)]
pub struct CliGitRunner;

impl CliGitRunner {
    pub fn new() -> Self {
        Self
    }

    async fn run(root: &Path, args: &[String]) -> HistoryResult<String> {
        let output = Command::new("git")
            .arg("-C")
            .arg(root)
            .args(args)
            .stdin(Stdio::null())
            .output()
            .await?;

        if output.status.success() {
            Ok(String::from_utf8_lossy(&output.stdout).into_owned())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            Err(HistoryError::Git(stderr.trim().to_string()))
        }
    }
}

#[async_trait]
impl GitRunner for CliGitRunner {
    async fn line_range_log(
        &self,
        root: &Path,
        relative_path: &str,
        start_line: u32,
        end_line: u32,
        max_commits: usize,
    ) -> HistoryResult<String> {
        let args = vec![
            "log".to_string(),
            format!("-L{start_line},{end_line}:{relative_path}"),
            format!("--max-count={max_commits}"),
            format!("--pretty=format:{LOG_FIELDS}"),
        ];
        Self::run(root, &args).await
    }

    async fn file_stat_log(
        &self,
        root: &Path,
        relative_path: &str,
        max_commits: usize,
    ) -> HistoryResult<String> {
        let args = vec![
            "log".to_string(),
            "--numstat".to_string(),
            format!("--max-count={max_commits}"),
            format!("--pretty=format:{COMMIT_SENTINEL}{LOG_FIELDS}"),
            "--".to_string(),
            relative_path.to_string(),
        ];
        Self::run(root, &args).await
    }
}
