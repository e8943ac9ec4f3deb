//! Batched pull-request resolution across a commit set
//!
//! Batches are issued sequentially; lookups within a batch run concurrently
//! to parallelize I/O waits without stampeding the remote rate limit. The
//! dedup set is only touched between batch completions, so inserts need no
//! locking in this single-task model.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use codescope_common::{with_retry, with_timeout, RetryPolicy};
use futures::future::join_all;

use crate::client::ReviewHost;
use crate::error::ReviewsError;
use crate::models::PullRequestRecord;

/// Outcome of review-link resolution: PRs found plus an optional non-fatal
/// error annotation for the report's reviews section
#[derive(Debug, Clone, Default)]
pub struct ReviewLinks {
    /// Deduplicated PRs, newest-created first, capped at the configured max
    pub pull_requests: Vec<PullRequestRecord>,
    /// User-facing explanation when resolution could not run or was degraded
    pub error: Option<String>,
}

impl ReviewLinks {
    fn failed(error: &ReviewsError) -> Self {
        Self {
            pull_requests: Vec::new(),
            error: Some(error.to_string()),
        }
    }
}

/// Resolver configuration and collaborator handle
pub struct ReviewResolver {
    host: Option<Arc<dyn ReviewHost>>,
    retry: RetryPolicy,
    lookup_timeout: Duration,
    batch_size: usize,
    max_lookback_commits: usize,
    max_results: usize,
}

impl ReviewResolver {
    pub fn new(
        host: Option<Arc<dyn ReviewHost>>,
        retry: RetryPolicy,
        lookup_timeout: Duration,
        batch_size: usize,
        max_lookback_commits: usize,
        max_results: usize,
    ) -> Self {
        Self {
            host,
            retry,
            lookup_timeout,
            batch_size: batch_size.max(1),
            max_lookback_commits,
            max_results,
        }
    }

    /// Resolve pull requests for the commits touching the analyzed range
    ///
    /// Never fails: missing credential, absent/unparseable origin and
    /// remote errors all produce an annotated-empty result.
    #[tracing::instrument(skip(self, commits), fields(commit_count = commits.len()))]
    pub async fn resolve(&self, origin_url: Option<&str>, commits: &[String]) -> ReviewLinks {
        let Some(host) = &self.host else {
            return ReviewLinks::failed(&ReviewsError::MissingCredential);
        };
        let Some(origin) = origin_url else {
            return ReviewLinks::failed(&ReviewsError::NoOrigin);
        };
        let Some((owner, repo)) = crate::remote::parse_remote_url(origin) else {
            return ReviewLinks::failed(&ReviewsError::UnrecognizedOrigin(origin.to_string()));
        };

        let lookback = commits
            .get(..commits.len().min(self.max_lookback_commits))
            .unwrap_or(commits);

        let mut seen: HashSet<u64> = HashSet::new();
        let mut found: Vec<PullRequestRecord> = Vec::new();
        let mut first_error: Option<String> = None;

        for batch in lookback.chunks(self.batch_size) {
            if found.len() >= self.max_results {
                break;
            }

            let lookups = batch.iter().map(|sha| {
                let host = Arc::clone(host);
                let owner = owner.clone();
                let repo = repo.clone();
                async move {
                    with_retry(&self.retry, "pr-lookup", || {
                        with_timeout(
                            self.lookup_timeout,
                            "pr-lookup",
                            host.prs_for_commit(&owner, &repo, sha),
                        )
                    })
                    .await
                }
            });

            for result in join_all(lookups).await {
                match result {
                    Ok(prs) => {
                        for pr in prs {
                            if seen.insert(pr.number) {
                                found.push(pr);
                            }
                        }
                    }
                    // One commit's failed lookup never fails the batch
                    Err(error) => {
                        tracing::debug!(%error, "dropping failed PR lookup");
                        first_error.get_or_insert_with(|| error.to_string());
                    }
                }
            }
        }

        found.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        found.truncate(self.max_results);

        // Partial successes beat the error annotation; an all-failed run
        // surfaces the first error so the report can explain the empty list.
        let error = if found.is_empty() { first_error } else { None };
        ReviewLinks {
            pull_requests: found,
            error,
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::indexing_slicing)]

    use super::*;
    use crate::error::ReviewsResult;
    use async_trait::async_trait;
    use chrono::{Duration as ChronoDuration, Utc};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    fn pr(number: u64, age_days: i64) -> PullRequestRecord {
        PullRequestRecord {
            number,
            title: format!("PR {number}"),
            url: format!("https://github.com/acme/app/pull/{number}"),
            author: "alice".to_string(),
            state: crate::models::PrState::Merged,
            created_at: Some(Utc::now() - ChronoDuration::days(age_days)),
            merged_at: Some(Utc::now()),
            description: String::new(),
            labels: vec![],
        }
    }

    /// Host that maps each sha to a canned response and counts lookups
    struct CannedHost {
        responses: Mutex<std::collections::HashMap<String, ReviewsResult<Vec<PullRequestRecord>>>>,
        lookups: AtomicUsize,
    }

    impl CannedHost {
        fn new(
            entries: Vec<(&str, ReviewsResult<Vec<PullRequestRecord>>)>,
        ) -> Self {
            Self {
                responses: Mutex::new(
                    entries
                        .into_iter()
                        .map(|(sha, response)| (sha.to_string(), response))
                        .collect(),
                ),
                lookups: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl ReviewHost for CannedHost {
        async fn prs_for_commit(
            &self,
            _owner: &str,
            _repo: &str,
            sha: &str,
        ) -> ReviewsResult<Vec<PullRequestRecord>> {
            self.lookups.fetch_add(1, Ordering::SeqCst);
            self.responses
                .lock()
                .unwrap()
                .get(sha)
                .cloned()
                .unwrap_or_else(|| Ok(Vec::new()))
        }
    }

    fn resolver(host: Option<Arc<dyn ReviewHost>>) -> ReviewResolver {
        let retry = RetryPolicy {
            max_attempts: 1,
            ..RetryPolicy::default()
        };
        ReviewResolver::new(host, retry, Duration::from_secs(5), 2, 20, 10)
    }

    const ORIGIN: &str = "git@github.com:acme/app.git";

    #[tokio::test]
    async fn missing_credential_is_annotated_not_fatal() {
        let links = resolver(None).resolve(Some(ORIGIN), &["abc".to_string()]).await;
        assert!(links.pull_requests.is_empty());
        assert!(links.error.as_deref().unwrap().contains("token"));
    }

    #[tokio::test]
    async fn absent_origin_is_annotated_not_fatal() {
        let host: Arc<dyn ReviewHost> = Arc::new(CannedHost::new(vec![]));
        let links = resolver(Some(host)).resolve(None, &["abc".to_string()]).await;
        assert!(links.pull_requests.is_empty());
        assert!(links.error.is_some());
    }

    #[tokio::test]
    async fn dedups_by_number_and_orders_newest_first() {
        let host = CannedHost::new(vec![
            ("c1", Ok(vec![pr(7, 10)])),
            ("c2", Ok(vec![pr(7, 10), pr(9, 1)])),
            ("c3", Ok(vec![pr(3, 30)])),
        ]);
        let host: Arc<dyn ReviewHost> = Arc::new(host);

        let commits: Vec<String> = ["c1", "c2", "c3"].iter().map(|s| (*s).to_string()).collect();
        let links = resolver(Some(host)).resolve(Some(ORIGIN), &commits).await;

        let numbers: Vec<u64> = links.pull_requests.iter().map(|p| p.number).collect();
        assert_eq!(numbers, vec![9, 7, 3]);
        assert!(links.error.is_none());
    }

    #[tokio::test]
    async fn individual_lookup_failures_are_dropped() {
        let host = CannedHost::new(vec![
            ("c1", Err(ReviewsError::PermissionOrRateLimit)),
            ("c2", Ok(vec![pr(5, 2)])),
        ]);
        let host: Arc<dyn ReviewHost> = Arc::new(host);

        let commits: Vec<String> = ["c1", "c2"].iter().map(|s| (*s).to_string()).collect();
        let links = resolver(Some(host)).resolve(Some(ORIGIN), &commits).await;

        assert_eq!(links.pull_requests.len(), 1);
        assert_eq!(links.pull_requests[0].number, 5);
        // Partial success: no error annotation
        assert!(links.error.is_none());
    }

    #[tokio::test]
    async fn all_failed_lookups_surface_first_error() {
        let host = CannedHost::new(vec![
            ("c1", Err(ReviewsError::InvalidCredential)),
            ("c2", Err(ReviewsError::InvalidCredential)),
        ]);
        let host: Arc<dyn ReviewHost> = Arc::new(host);

        let commits: Vec<String> = ["c1", "c2"].iter().map(|s| (*s).to_string()).collect();
        let links = resolver(Some(host)).resolve(Some(ORIGIN), &commits).await;

        assert!(links.pull_requests.is_empty());
        assert!(links.error.as_deref().unwrap().contains("401"));
    }

    #[tokio::test]
    async fn stops_issuing_batches_once_max_results_reached() {
        let entries: Vec<(&str, ReviewsResult<Vec<PullRequestRecord>>)> = vec![
            ("c1", Ok(vec![pr(1, 1), pr(2, 2)])),
            ("c2", Ok(vec![pr(3, 3), pr(4, 4)])),
            ("c3", Ok(vec![pr(5, 5)])),
            ("c4", Ok(vec![pr(6, 6)])),
        ];
        let host = Arc::new(CannedHost::new(entries));

        let retry = RetryPolicy {
            max_attempts: 1,
            ..RetryPolicy::default()
        };
        // batch width 2, cap at 3 results
        let resolver = ReviewResolver::new(
            Some(Arc::clone(&host) as Arc<dyn ReviewHost>),
            retry,
            Duration::from_secs(5),
            2,
            20,
            3,
        );

        let commits: Vec<String> = ["c1", "c2", "c3", "c4"]
            .iter()
            .map(|s| (*s).to_string())
            .collect();
        let links = resolver.resolve(Some(ORIGIN), &commits).await;

        assert_eq!(links.pull_requests.len(), 3);
        // Second batch never issued: only c1 and c2 looked up
        assert_eq!(host.lookups.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn lookback_cap_limits_commits_considered() {
        let host = Arc::new(CannedHost::new(vec![]));
        let retry = RetryPolicy {
            max_attempts: 1,
            ..RetryPolicy::default()
        };
        let resolver = ReviewResolver::new(
            Some(Arc::clone(&host) as Arc<dyn ReviewHost>),
            retry,
            Duration::from_secs(5),
            10,
            2,
            10,
        );

        let commits: Vec<String> = (0..6).map(|i| format!("c{i}")).collect();
        let _ = resolver.resolve(Some(ORIGIN), &commits).await;
        assert_eq!(host.lookups.load(Ordering::SeqCst), 2);
    }
}
