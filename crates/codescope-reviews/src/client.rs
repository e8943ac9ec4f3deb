//! Hosting API client for per-commit pull-request lookups

use async_trait::async_trait;
use reqwest::StatusCode;

use crate::error::{ReviewsError, ReviewsResult};
use crate::models::{PullRequestRecord, RawPullRequest};

/// Trait seam for the remote hosting service
#[async_trait]
pub trait ReviewHost: Send + Sync {
    /// Pull requests that reference the given commit
    ///
    /// # Errors
    ///
    /// Returns the status-code taxonomy of [`ReviewsError`]; a 404 for the
    /// commit is an empty result, not an error.
    async fn prs_for_commit(
        &self,
        owner: &str,
        repo: &str,
        sha: &str,
    ) -> ReviewsResult<Vec<PullRequestRecord>>;
}

/// GitHub REST implementation of [`ReviewHost`]
pub struct GitHubClient {
    http: reqwest::Client,
    api_base: String,
    token: String,
}

impl GitHubClient {
    /// Create a client against the given API base (proxy-friendly)
    pub fn new(api_base: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_base: api_base.into(),
            token: token.into(),
        }
    }
}

#[async_trait]
impl ReviewHost for GitHubClient {
    #[tracing::instrument(skip(self))]
    async fn prs_for_commit(
        &self,
        owner: &str,
        repo: &str,
        sha: &str,
    ) -> ReviewsResult<Vec<PullRequestRecord>> {
        let url = format!(
            "{}/repos/{owner}/{repo}/commits/{sha}/pulls",
            self.api_base.trim_end_matches('/')
        );

        let response = self
            .http
            .get(&url)
            .bearer_auth(&self.token)
            .header("Accept", "application/vnd.github+json")
            .header("User-Agent", "codescope")
            .send()
            .await?;

        match response.status() {
            status if status.is_success() => {
                let raw: Vec<RawPullRequest> = response.json().await?;
                Ok(raw.into_iter().map(PullRequestRecord::from).collect())
            }
            StatusCode::UNAUTHORIZED => Err(ReviewsError::InvalidCredential),
            StatusCode::FORBIDDEN => Err(ReviewsError::PermissionOrRateLimit),
            // Unknown commit or repo: nothing to link, not a failure
            StatusCode::NOT_FOUND => Ok(Vec::new()),
            status => {
                let message = response.text().await.unwrap_or_default();
                Err(ReviewsError::Remote {
                    status: status.as_u16(),
                    message: message.chars().take(200).collect(),
                })
            }
        }
    }
}
