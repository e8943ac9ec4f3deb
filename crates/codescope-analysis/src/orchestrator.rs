//! Analysis orchestrator
//!
//! Sequences the pipeline for one request: cache probe, history mining,
//! then purpose summarization and review resolution concurrently, then the
//! merge and cache insert. One analysis runs at a time per orchestrator;
//! a second request while the busy flag is held is rejected immediately.
//!
//! Cancellation is cooperative and observed at stage boundaries only: a
//! stage already in flight runs to completion, then the token is consulted
//! before the next one starts. A cancelled run caches nothing.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio_util::sync::CancellationToken;

use codescope_common::CorrelationId;
use codescope_history::HistoryMiner;
use codescope_purpose::PurposeProvider;
use codescope_reviews::{ReviewLinks, ReviewResolver};

use crate::cache::AnalysisCache;
use crate::error::{AnalysisError, AnalysisResult};
use crate::models::{AnalysisOutcome, AnalysisRequest, MergedReport};

/// Trait seam over review resolution, mockable in orchestrator tests
#[async_trait]
pub trait ReviewLinker: Send + Sync {
    /// Resolve pull requests for the given origin and commit hashes
    async fn resolve(&self, origin_url: Option<&str>, commits: &[String]) -> ReviewLinks;
}

#[async_trait]
impl ReviewLinker for ReviewResolver {
    async fn resolve(&self, origin_url: Option<&str>, commits: &[String]) -> ReviewLinks {
        Self::resolve(self, origin_url, commits).await
    }
}

/// Coordinates the pipeline stages for one request at a time
pub struct AnalysisOrchestrator {
    history: Arc<dyn HistoryMiner>,
    summarizer: Arc<dyn PurposeProvider>,
    reviews: Arc<dyn ReviewLinker>,
    cache: AnalysisCache,
    busy: AtomicBool,
}

/// Releases the busy flag when the run ends, on every exit path
struct BusyGuard<'a>(&'a AtomicBool);

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl AnalysisOrchestrator {
    pub fn new(
        history: Arc<dyn HistoryMiner>,
        summarizer: Arc<dyn PurposeProvider>,
        reviews: Arc<dyn ReviewLinker>,
        cache_ttl: Duration,
    ) -> Self {
        Self {
            history,
            summarizer,
            reviews,
            cache: AnalysisCache::new(cache_ttl),
            busy: AtomicBool::new(false),
        }
    }

    /// Run one analysis
    ///
    /// Serves from the cache when the entry is fresh and the code unchanged,
    /// unless `force_refresh` is set. Collaborator failures never surface:
    /// history absence yields an empty summary, review failures an annotated
    /// empty PR list, and summarization falls back to heuristics.
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::Busy`] when another analysis is running and
    /// [`AnalysisError::InvalidRange`] for a malformed line range. Nothing
    /// else escapes as an error.
    pub async fn analyze(
        &self,
        request: AnalysisRequest,
        cancel: &CancellationToken,
        force_refresh: bool,
    ) -> AnalysisResult<AnalysisOutcome> {
        if request.start_line == 0 || request.end_line < request.start_line {
            return Err(AnalysisError::InvalidRange {
                start: request.start_line,
                end: request.end_line,
            });
        }

        if self
            .busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(AnalysisError::Busy);
        }
        let _guard = BusyGuard(&self.busy);

        let correlation_id = CorrelationId::new();
        let path_display = request.path.display().to_string();
        tracing::info!(
            %correlation_id,
            path = %path_display,
            start = request.start_line,
            end = request.end_line,
            "starting analysis"
        );

        if cancel.is_cancelled() {
            return Ok(AnalysisOutcome::Cancelled);
        }

        if !force_refresh {
            if let Some(report) = self.cache.lookup(
                &path_display,
                request.start_line,
                request.end_line,
                &request.code,
            ) {
                tracing::debug!(%correlation_id, "serving cached report");
                return Ok(AnalysisOutcome::Completed(Box::new(report)));
            }
        }

        let history = self
            .history
            .mine(&request.path, request.start_line, request.end_line)
            .await;

        if cancel.is_cancelled() {
            tracing::info!(%correlation_id, "analysis cancelled after history stage");
            return Ok(AnalysisOutcome::Cancelled);
        }

        let subjects: Vec<String> = history.commits.iter().map(|c| c.message.clone()).collect();
        let hashes: Vec<String> = history.commits.iter().map(|c| c.hash.clone()).collect();
        let origin = self.history.origin_url(&request.path);

        let (purpose, links) = tokio::join!(
            self.summarizer
                .summarize(&request.code, &request.path, &subjects),
            self.reviews.resolve(origin.as_deref(), &hashes),
        );

        if cancel.is_cancelled() {
            tracing::info!(%correlation_id, "analysis cancelled before merge, nothing cached");
            return Ok(AnalysisOutcome::Cancelled);
        }

        let report = MergedReport {
            path: path_display,
            start_line: request.start_line,
            end_line: request.end_line,
            purpose,
            history,
            pull_requests: links.pull_requests,
            reviews_error: links.error,
            analyzed_at: Utc::now(),
            from_cache: false,
            cache_age_seconds: None,
        };

        self.cache.store(&report, &request.code);
        tracing::info!(%correlation_id, "analysis complete");

        Ok(AnalysisOutcome::Completed(Box::new(report)))
    }

    /// Drop every cached report, returning how many were held
    pub fn clear_cache(&self) -> usize {
        self.cache.clear()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use codescope_common::RetryPolicy;
    use codescope_history::{ChangeFrequency, CommitRecord, HistorySummary};
    use codescope_purpose::{HeuristicStrategy, PurposeAnalysis};
    use std::path::{Path, PathBuf};
    use std::sync::atomic::AtomicUsize;
    use tokio::sync::Notify;

    fn commit(hash_byte: char, message: &str) -> CommitRecord {
        CommitRecord {
            hash: hash_byte.to_string().repeat(40),
            short_hash: hash_byte.to_string().repeat(7),
            author_name: "Alice".to_string(),
            author_email: "alice@example.com".to_string(),
            timestamp: Some(Utc::now()),
            message: message.to_string(),
            lines_changed: 3,
        }
    }

    struct StubMiner {
        summary: HistorySummary,
        origin: Option<String>,
        calls: AtomicUsize,
    }

    impl StubMiner {
        fn with_commits(commits: Vec<CommitRecord>) -> Self {
            let summary = HistorySummary {
                commits,
                owners: Vec::new(),
                last_modified: None,
                created_at: None,
                change_frequency: ChangeFrequency::Occasional,
            };
            Self {
                summary,
                origin: Some("git@github.com:acme/app.git".to_string()),
                calls: AtomicUsize::new(0),
            }
        }

        fn empty() -> Self {
            Self {
                summary: HistorySummary::empty(),
                origin: None,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl HistoryMiner for StubMiner {
        async fn mine(&self, _path: &Path, _start: u32, _end: u32) -> HistorySummary {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.summary.clone()
        }

        fn origin_url(&self, _path: &Path) -> Option<String> {
            self.origin.clone()
        }
    }

    struct CountingSummarizer {
        calls: AtomicUsize,
    }

    impl CountingSummarizer {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl PurposeProvider for CountingSummarizer {
        async fn summarize(
            &self,
            code: &str,
            path: &Path,
            _recent_commits: &[String],
        ) -> PurposeAnalysis {
            self.calls.fetch_add(1, Ordering::SeqCst);
            HeuristicStrategy::new().analyze(code, path)
        }
    }

    struct CountingLinker {
        calls: AtomicUsize,
    }

    impl CountingLinker {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl ReviewLinker for CountingLinker {
        async fn resolve(&self, _origin: Option<&str>, _commits: &[String]) -> ReviewLinks {
            self.calls.fetch_add(1, Ordering::SeqCst);
            ReviewLinks {
                pull_requests: Vec::new(),
                error: None,
            }
        }
    }

    struct Fixture {
        orchestrator: Arc<AnalysisOrchestrator>,
        miner: Arc<StubMiner>,
        summarizer: Arc<CountingSummarizer>,
        linker: Arc<CountingLinker>,
    }

    fn fixture_with(miner: StubMiner, ttl: Duration) -> Fixture {
        let miner = Arc::new(miner);
        let summarizer = Arc::new(CountingSummarizer::new());
        let linker = Arc::new(CountingLinker::new());
        let orchestrator = Arc::new(AnalysisOrchestrator::new(
            miner.clone(),
            summarizer.clone(),
            linker.clone(),
            ttl,
        ));
        Fixture {
            orchestrator,
            miner,
            summarizer,
            linker,
        }
    }

    fn fixture() -> Fixture {
        fixture_with(
            StubMiner::with_commits(vec![commit('a', "Add login"), commit('b', "Fix token check")]),
            Duration::from_secs(300),
        )
    }

    fn request(code: &str) -> AnalysisRequest {
        AnalysisRequest::new(PathBuf::from("src/auth.ts"), 10, 42, code)
    }

    #[tokio::test]
    async fn repeat_request_is_served_from_cache_with_no_external_calls() {
        let fx = fixture();
        let cancel = CancellationToken::new();

        let first = fx
            .orchestrator
            .analyze(request("function login() {}"), &cancel, false)
            .await
            .unwrap()
            .into_report()
            .unwrap();
        assert!(!first.from_cache);

        let second = fx
            .orchestrator
            .analyze(request("function login() {}"), &cancel, false)
            .await
            .unwrap()
            .into_report()
            .unwrap();

        assert!(second.from_cache);
        assert!(second.cache_age_seconds.is_some());
        assert_eq!(fx.miner.calls.load(Ordering::SeqCst), 1);
        assert_eq!(fx.summarizer.calls.load(Ordering::SeqCst), 1);
        assert_eq!(fx.linker.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn changed_code_recomputes_for_the_same_range() {
        let fx = fixture();
        let cancel = CancellationToken::new();

        fx.orchestrator
            .analyze(request("function login() {}"), &cancel, false)
            .await
            .unwrap();
        let second = fx
            .orchestrator
            .analyze(request("function login() { audit(); }"), &cancel, false)
            .await
            .unwrap()
            .into_report()
            .unwrap();

        assert!(!second.from_cache);
        assert_eq!(fx.summarizer.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn expired_entry_recomputes() {
        let fx = fixture_with(
            StubMiner::with_commits(vec![commit('a', "Add login")]),
            Duration::ZERO,
        );
        let cancel = CancellationToken::new();

        fx.orchestrator
            .analyze(request("const x = 1;"), &cancel, false)
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(5)).await;
        let second = fx
            .orchestrator
            .analyze(request("const x = 1;"), &cancel, false)
            .await
            .unwrap()
            .into_report()
            .unwrap();

        assert!(!second.from_cache);
        assert_eq!(fx.summarizer.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn force_refresh_bypasses_a_fresh_entry() {
        let fx = fixture();
        let cancel = CancellationToken::new();

        fx.orchestrator
            .analyze(request("const x = 1;"), &cancel, false)
            .await
            .unwrap();
        let second = fx
            .orchestrator
            .analyze(request("const x = 1;"), &cancel, true)
            .await
            .unwrap()
            .into_report()
            .unwrap();

        assert!(!second.from_cache);
        assert_eq!(fx.summarizer.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn invalid_range_is_rejected_before_any_stage() {
        let fx = fixture();
        let cancel = CancellationToken::new();

        let zero = fx
            .orchestrator
            .analyze(
                AnalysisRequest::new("a.ts", 0, 5, "code"),
                &cancel,
                false,
            )
            .await;
        assert_eq!(
            zero,
            Err(AnalysisError::InvalidRange { start: 0, end: 5 })
        );

        let inverted = fx
            .orchestrator
            .analyze(
                AnalysisRequest::new("a.ts", 9, 3, "code"),
                &cancel,
                false,
            )
            .await;
        assert_eq!(
            inverted,
            Err(AnalysisError::InvalidRange { start: 9, end: 3 })
        );
        assert_eq!(fx.miner.calls.load(Ordering::SeqCst), 0);
    }

    // Summarizer that parks until released, so a second request can race
    struct ParkedSummarizer {
        entered: Arc<Notify>,
        release: Arc<Notify>,
    }

    #[async_trait]
    impl PurposeProvider for ParkedSummarizer {
        async fn summarize(
            &self,
            code: &str,
            path: &Path,
            _recent_commits: &[String],
        ) -> PurposeAnalysis {
            self.entered.notify_one();
            self.release.notified().await;
            HeuristicStrategy::new().analyze(code, path)
        }
    }

    #[tokio::test]
    async fn concurrent_request_is_rejected_as_busy() {
        let entered = Arc::new(Notify::new());
        let release = Arc::new(Notify::new());
        let miner = Arc::new(StubMiner::with_commits(vec![commit('a', "Add login")]));
        let orchestrator = Arc::new(AnalysisOrchestrator::new(
            miner,
            Arc::new(ParkedSummarizer {
                entered: entered.clone(),
                release: release.clone(),
            }),
            Arc::new(CountingLinker::new()),
            Duration::from_secs(300),
        ));

        let background = {
            let orchestrator = orchestrator.clone();
            tokio::spawn(async move {
                let cancel = CancellationToken::new();
                orchestrator
                    .analyze(request("const x = 1;"), &cancel, false)
                    .await
            })
        };

        entered.notified().await;

        let cancel = CancellationToken::new();
        let rejected = orchestrator
            .analyze(request("const y = 2;"), &cancel, false)
            .await;
        assert_eq!(rejected, Err(AnalysisError::Busy));

        release.notify_one();
        let first = background.await.unwrap().unwrap();
        assert!(matches!(first, AnalysisOutcome::Completed(_)));

        // Flag released on completion; a new request goes through
        let after = orchestrator
            .analyze(request("const y = 2;"), &cancel, false)
            .await;
        assert!(matches!(after, Ok(AnalysisOutcome::Completed(_))));
    }

    #[tokio::test]
    async fn pre_cancelled_token_short_circuits_without_stages() {
        let fx = fixture();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let outcome = fx
            .orchestrator
            .analyze(request("const x = 1;"), &cancel, false)
            .await
            .unwrap();

        assert_eq!(outcome, AnalysisOutcome::Cancelled);
        assert_eq!(fx.miner.calls.load(Ordering::SeqCst), 0);
    }

    // Summarizer that cancels the shared token mid-stage; the orchestrator
    // must observe it at the next boundary and cache nothing
    struct CancellingSummarizer {
        token: CancellationToken,
    }

    #[async_trait]
    impl PurposeProvider for CancellingSummarizer {
        async fn summarize(
            &self,
            code: &str,
            path: &Path,
            _recent_commits: &[String],
        ) -> PurposeAnalysis {
            self.token.cancel();
            HeuristicStrategy::new().analyze(code, path)
        }
    }

    #[tokio::test]
    async fn cancellation_mid_run_caches_nothing() {
        let cancel = CancellationToken::new();
        let miner = Arc::new(StubMiner::with_commits(vec![commit('a', "Add login")]));
        let orchestrator = AnalysisOrchestrator::new(
            miner,
            Arc::new(CancellingSummarizer {
                token: cancel.clone(),
            }),
            Arc::new(CountingLinker::new()),
            Duration::from_secs(300),
        );

        let outcome = orchestrator
            .analyze(request("const x = 1;"), &cancel, false)
            .await
            .unwrap();
        assert_eq!(outcome, AnalysisOutcome::Cancelled);

        // Nothing cached: a fresh (uncancelled) run computes from scratch
        let fresh = CancellationToken::new();
        let rerun = orchestrator
            .analyze(request("const x = 1;"), &fresh, false)
            .await
            .unwrap()
            .into_report()
            .unwrap();
        assert!(!rerun.from_cache);
    }

    #[tokio::test]
    async fn missing_repository_still_yields_a_complete_report() {
        let fx = fixture_with(StubMiner::empty(), Duration::from_secs(300));

        // Real resolver with no credential: annotated-empty reviews section
        let resolver = ReviewResolver::new(
            None,
            RetryPolicy::default(),
            Duration::from_secs(5),
            5,
            20,
            10,
        );
        let orchestrator = AnalysisOrchestrator::new(
            fx.miner.clone(),
            fx.summarizer.clone(),
            Arc::new(resolver),
            Duration::from_secs(300),
        );

        let cancel = CancellationToken::new();
        let report = orchestrator
            .analyze(request("function login(token) { return token; }"), &cancel, false)
            .await
            .unwrap()
            .into_report()
            .unwrap();

        assert!(report.history.commits.is_empty());
        assert_eq!(report.history.change_frequency, ChangeFrequency::Unknown);
        assert!(report.pull_requests.is_empty());
        assert!(report.reviews_error.is_some());
        assert!(!report.purpose.purpose.is_empty());
    }

    #[tokio::test]
    async fn clear_cache_counts_entries() {
        let fx = fixture();
        let cancel = CancellationToken::new();

        fx.orchestrator
            .analyze(request("const x = 1;"), &cancel, false)
            .await
            .unwrap();
        assert_eq!(fx.orchestrator.clear_cache(), 1);
        assert_eq!(fx.orchestrator.clear_cache(), 0);
    }
}
