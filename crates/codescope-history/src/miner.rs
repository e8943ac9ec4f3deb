//! History miner: raw git output to `HistorySummary`

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::models::{ChangeFrequency, CommitRecord, HistorySummary, OwnerStat};
use crate::parse;
use crate::runner::{CliGitRunner, GitRunner, RepoContext};

/// Trait seam for history extraction, mockable in orchestrator tests
#[async_trait]
pub trait HistoryMiner: Send + Sync {
    /// Mine commit history for a 1-based inclusive line range
    ///
    /// Infallible by contract: any underlying git failure yields the empty
    /// summary so history absence never blocks the pipeline.
    async fn mine(&self, path: &Path, start_line: u32, end_line: u32) -> HistorySummary;

    /// URL of the `origin` remote for the repository containing `path`
    fn origin_url(&self, path: &Path) -> Option<String>;
}

/// Production miner backed by a [`GitRunner`]
pub struct GitHistoryMiner {
    runner: Arc<dyn GitRunner>,
    max_commits: usize,
}

impl GitHistoryMiner {
    pub fn new(runner: Arc<dyn GitRunner>, max_commits: usize) -> Self {
        Self {
            runner,
            max_commits,
        }
    }

    /// Miner using the system `git` binary
    pub fn with_cli(max_commits: usize) -> Self {
        Self::new(Arc::new(CliGitRunner::new()), max_commits)
    }

    async fn commits_for(&self, ctx: &RepoContext, start: u32, end: u32) -> Vec<CommitRecord> {
        // Line-range query first; git rejects -L for binary files and
        // out-of-bounds ranges, in which case whole-file history with
        // batched stats is the fallback.
        match self
            .runner
            .line_range_log(&ctx.root, &ctx.relative_path, start, end, self.max_commits)
            .await
        {
            Ok(raw) => {
                let commits = parse::parse_line_range_log(&raw);
                if commits.is_empty() {
                    self.file_fallback(ctx).await
                } else {
                    commits
                }
            }
            Err(error) => {
                tracing::debug!(%error, "line-range log rejected, falling back to file history");
                self.file_fallback(ctx).await
            }
        }
    }

    async fn file_fallback(&self, ctx: &RepoContext) -> Vec<CommitRecord> {
        match self
            .runner
            .file_stat_log(&ctx.root, &ctx.relative_path, self.max_commits)
            .await
        {
            Ok(raw) => parse::parse_file_stat_log(&raw),
            Err(error) => {
                tracing::debug!(%error, "file history unavailable, treating as no history");
                Vec::new()
            }
        }
    }
}

#[async_trait]
impl HistoryMiner for GitHistoryMiner {
    #[tracing::instrument(skip(self), fields(path = %path.display()))]
    async fn mine(&self, path: &Path, start_line: u32, end_line: u32) -> HistorySummary {
        let Some(ctx) = RepoContext::discover(path) else {
            return HistorySummary::empty();
        };

        let mut commits = self.commits_for(&ctx, start_line, end_line).await;
        commits.truncate(self.max_commits);

        summarize(commits)
    }

    fn origin_url(&self, path: &Path) -> Option<String> {
        RepoContext::discover(path).and_then(|ctx| ctx.origin_url)
    }
}

/// Aggregate parsed commits into the final summary
fn summarize(commits: Vec<CommitRecord>) -> HistorySummary {
    if commits.is_empty() {
        return HistorySummary::empty();
    }

    let owners = compute_owners(&commits);
    let last_modified = commits.iter().filter_map(|c| c.timestamp).max();
    let created_at = commits.iter().filter_map(|c| c.timestamp).min();
    let change_frequency = bucket_frequency(commits.len(), created_at, last_modified);

    HistorySummary {
        commits,
        owners,
        last_modified,
        created_at,
        change_frequency,
    }
}

/// Group commits by author identity (email preferred, else name) and derive
/// per-owner stats. Percentage is rounded independently per owner.
pub fn compute_owners(commits: &[CommitRecord]) -> Vec<OwnerStat> {
    let total = commits.len();
    let mut owners: Vec<OwnerStat> = Vec::new();

    for commit in commits {
        let identity = if commit.author_email.is_empty() {
            commit.author_name.to_lowercase()
        } else {
            commit.author_email.to_lowercase()
        };

        let existing = owners.iter_mut().find(|o| {
            let key = if o.email.is_empty() {
                o.name.to_lowercase()
            } else {
                o.email.to_lowercase()
            };
            key == identity
        });

        match existing {
            Some(owner) => {
                owner.commits = owner.commits.saturating_add(1);
                owner.lines_changed = owner.lines_changed.saturating_add(commit.lines_changed);
                if commit.timestamp > owner.last_commit {
                    owner.last_commit = commit.timestamp;
                }
            }
            None => owners.push(OwnerStat {
                name: commit.author_name.clone(),
                email: commit.author_email.clone(),
                commits: 1,
                lines_changed: commit.lines_changed,
                last_commit: commit.timestamp,
                percentage: 0,
            }),
        }
    }

    for owner in &mut owners {
        #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        {
            owner.percentage = ((owner.commits as f64 / total as f64) * 100.0).round() as u32;
        }
    }

    // Stable: ties keep first-seen order
    owners.sort_by(|a, b| b.commits.cmp(&a.commits));
    owners
}

/// Bucket the commit rate (normalized to a monthly figure) into the fixed
/// ordinal labels. Fewer than 2 commits cannot establish a rate.
pub fn bucket_frequency(
    commit_count: usize,
    oldest: Option<DateTime<Utc>>,
    newest: Option<DateTime<Utc>>,
) -> ChangeFrequency {
    if commit_count < 2 {
        return ChangeFrequency::RarelyChanged;
    }
    let (Some(oldest), Some(newest)) = (oldest, newest) else {
        return ChangeFrequency::RarelyChanged;
    };

    let span_days = (newest - oldest).num_days().max(1);
    #[allow(clippy::cast_precision_loss)]
    let per_month = commit_count as f64 / span_days as f64 * 30.0;

    if per_month > 10.0 {
        ChangeFrequency::VeryFrequent
    } else if per_month >= 5.0 {
        ChangeFrequency::Frequent
    } else if per_month >= 1.0 {
        ChangeFrequency::Occasional
    } else if per_month >= 0.25 {
        ChangeFrequency::Rare
    } else {
        ChangeFrequency::VeryStable
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::indexing_slicing)]

    use super::*;
    use crate::error::{HistoryError, HistoryResult};
    use chrono::TimeZone;
    use std::sync::Mutex;

    fn commit(email: &str, name: &str, days_ago: i64, lines: u32) -> CommitRecord {
        CommitRecord {
            hash: "a".repeat(40),
            short_hash: "aaaaaaa".to_string(),
            author_name: name.to_string(),
            author_email: email.to_string(),
            timestamp: Some(Utc::now() - chrono::Duration::days(days_ago)),
            message: "change".to_string(),
            lines_changed: lines,
        }
    }

    #[test]
    fn two_authors_split_67_33() {
        let commits = vec![
            commit("alice@example.com", "Alice", 1, 5),
            commit("alice@example.com", "Alice", 2, 3),
            commit("bob@example.com", "Bob", 3, 7),
        ];

        let owners = compute_owners(&commits);
        assert_eq!(owners.len(), 2);
        assert_eq!(owners[0].name, "Alice");
        assert_eq!(owners[0].commits, 2);
        assert_eq!(owners[0].percentage, 67);
        assert_eq!(owners[1].commits, 1);
        assert_eq!(owners[1].percentage, 33);
    }

    #[test]
    fn percentages_sum_within_rounding_tolerance() {
        let mut commits = Vec::new();
        for i in 0..7 {
            commits.push(commit(&format!("dev{i}@example.com"), "Dev", 1, 1));
        }
        commits.push(commit("dev0@example.com", "Dev", 2, 1));

        let owners = compute_owners(&commits);
        let sum: u32 = owners.iter().map(|o| o.percentage).sum();
        assert!((98..=102).contains(&sum), "sum was {sum}");
        assert!(owners.iter().all(|o| o.percentage > 0));
    }

    #[test]
    fn identity_groups_by_email_case_insensitively() {
        let commits = vec![
            commit("Alice@Example.com", "Alice", 1, 1),
            commit("alice@example.com", "Alice B", 2, 1),
        ];
        let owners = compute_owners(&commits);
        assert_eq!(owners.len(), 1);
        assert_eq!(owners[0].commits, 2);
        assert_eq!(owners[0].percentage, 100);
    }

    #[test]
    fn frequency_buckets_match_thresholds() {
        let at = |days: i64| Some(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + chrono::Duration::days(days));

        // 12 commits over 30 days => 12/month
        assert_eq!(
            bucket_frequency(12, at(0), at(30)),
            ChangeFrequency::VeryFrequent
        );
        // 6 commits over 30 days
        assert_eq!(bucket_frequency(6, at(0), at(30)), ChangeFrequency::Frequent);
        // 3 commits over 30 days
        assert_eq!(
            bucket_frequency(3, at(0), at(30)),
            ChangeFrequency::Occasional
        );
        // 2 commits over 120 days => 0.5/month
        assert_eq!(bucket_frequency(2, at(0), at(120)), ChangeFrequency::Rare);
        // 2 commits over 2 years
        assert_eq!(
            bucket_frequency(2, at(0), at(730)),
            ChangeFrequency::VeryStable
        );
        // Fewer than 2 commits always maps to rarely-changed
        assert_eq!(bucket_frequency(1, at(0), at(0)), ChangeFrequency::RarelyChanged);
        assert_eq!(bucket_frequency(0, None, None), ChangeFrequency::RarelyChanged);
    }

    // ---- mine() behavior with a scripted runner ----

    struct ScriptedRunner {
        line_range: Mutex<Option<HistoryResult<String>>>,
        file_stat: Mutex<Option<HistoryResult<String>>>,
    }

    impl ScriptedRunner {
        fn new(
            line_range: HistoryResult<String>,
            file_stat: HistoryResult<String>,
        ) -> Self {
            Self {
                line_range: Mutex::new(Some(line_range)),
                file_stat: Mutex::new(Some(file_stat)),
            }
        }
    }

    #[async_trait]
    impl GitRunner for ScriptedRunner {
        async fn line_range_log(
            &self,
            _root: &std::path::Path,
            _relative_path: &str,
            _start: u32,
            _end: u32,
            _max: usize,
        ) -> HistoryResult<String> {
            self.line_range.lock().unwrap().take().unwrap()
        }

        async fn file_stat_log(
            &self,
            _root: &std::path::Path,
            _relative_path: &str,
            _max: usize,
        ) -> HistoryResult<String> {
            self.file_stat.lock().unwrap().take().unwrap()
        }
    }

    fn repo_file() -> (tempfile::TempDir, std::path::PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        git2::Repository::init(dir.path()).unwrap();
        let file = dir.path().join("auth.ts");
        std::fs::write(&file, "function login() {}").unwrap();
        (dir, file)
    }

    #[tokio::test]
    async fn falls_back_to_file_history_when_range_query_rejected() {
        let (_dir, file) = repo_file();
        let header = format!(
            "@@COMMIT@@{}|aaaaaaa|Alice|alice@example.com|2024-03-01T10:00:00+00:00|Add login\n3\t1\tauth.ts\n",
            "a".repeat(40)
        );
        let runner = ScriptedRunner::new(
            Err(HistoryError::Git("fatal: file diff exceeds range".to_string())),
            Ok(header),
        );

        let miner = GitHistoryMiner::new(Arc::new(runner), 50);
        let summary = miner.mine(&file, 10, 40).await;

        assert_eq!(summary.commits.len(), 1);
        assert_eq!(summary.commits[0].lines_changed, 4);
        assert_eq!(summary.change_frequency, ChangeFrequency::RarelyChanged);
    }

    #[tokio::test]
    async fn tool_failure_yields_empty_summary_not_error() {
        let (_dir, file) = repo_file();
        let runner = ScriptedRunner::new(
            Err(HistoryError::Git("boom".to_string())),
            Err(HistoryError::Git("boom".to_string())),
        );

        let miner = GitHistoryMiner::new(Arc::new(runner), 50);
        let summary = miner.mine(&file, 1, 5).await;
        assert_eq!(summary, HistorySummary::empty());
    }

    #[tokio::test]
    async fn no_repository_yields_empty_summary_without_invoking_git() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("orphan.rs");
        std::fs::write(&file, "fn main() {}").unwrap();

        // Runner would panic if consulted twice; discovery short-circuits first
        let runner = ScriptedRunner::new(Ok(String::new()), Ok(String::new()));
        let miner = GitHistoryMiner::new(Arc::new(runner), 50);

        let summary = miner.mine(&file, 1, 5).await;
        assert_eq!(summary, HistorySummary::empty());
    }
}
