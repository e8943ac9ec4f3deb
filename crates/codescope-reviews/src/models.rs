//! Pull-request models and wire-format decoding

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Hard cap on the stored PR description, in characters
pub const DESCRIPTION_MAX_CHARS: usize = 300;

/// Marker appended to a truncated description
const ELLIPSIS: char = '\u{2026}';

/// Reported lifecycle state of a pull request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrState {
    Open,
    Closed,
    Merged,
}

/// One pull request linked to the analyzed range, deduplicated by number
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequestRecord {
    /// PR number, unique within the repository
    pub number: u64,
    /// Title as shown on the hosting service
    pub title: String,
    /// Web URL
    pub url: String,
    /// Author login
    pub author: String,
    /// Resolved state; a merge timestamp always wins over the raw state
    pub state: PrState,
    /// Creation timestamp
    pub created_at: Option<DateTime<Utc>>,
    /// Merge timestamp, if merged
    pub merged_at: Option<DateTime<Utc>>,
    /// Description truncated to [`DESCRIPTION_MAX_CHARS`] with an ellipsis
    pub description: String,
    /// Label names in the order the service returns them
    pub labels: Vec<String>,
}

/// Pull request object as returned by the hosting API
#[derive(Debug, Deserialize)]
pub struct RawPullRequest {
    pub number: u64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub html_url: String,
    #[serde(default)]
    pub user: Option<RawUser>,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub merged_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub labels: Vec<RawLabel>,
}

#[derive(Debug, Deserialize)]
pub struct RawUser {
    #[serde(default)]
    pub login: String,
}

#[derive(Debug, Deserialize)]
pub struct RawLabel {
    #[serde(default)]
    pub name: String,
}

impl From<RawPullRequest> for PullRequestRecord {
    fn from(raw: RawPullRequest) -> Self {
        // Merged takes precedence over the raw open/closed state whenever a
        // merge timestamp exists.
        let state = if raw.merged_at.is_some() {
            PrState::Merged
        } else if raw.state.eq_ignore_ascii_case("open") {
            PrState::Open
        } else {
            PrState::Closed
        };

        Self {
            number: raw.number,
            title: raw.title,
            url: raw.html_url,
            author: raw.user.map(|u| u.login).unwrap_or_default(),
            state,
            created_at: raw.created_at,
            merged_at: raw.merged_at,
            description: truncate_description(raw.body.as_deref().unwrap_or_default()),
            labels: raw.labels.into_iter().map(|l| l.name).collect(),
        }
    }
}

/// Truncate to the fixed cap, appending an ellipsis marker
pub fn truncate_description(body: &str) -> String {
    if body.chars().count() <= DESCRIPTION_MAX_CHARS {
        return body.to_string();
    }
    let mut truncated: String = body.chars().take(DESCRIPTION_MAX_CHARS).collect();
    truncated.push(ELLIPSIS);
    truncated
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(state: &str, merged: bool) -> RawPullRequest {
        RawPullRequest {
            number: 7,
            title: "Add login".to_string(),
            html_url: "https://github.com/acme/app/pull/7".to_string(),
            user: Some(RawUser {
                login: "alice".to_string(),
            }),
            state: state.to_string(),
            created_at: None,
            merged_at: merged.then(chrono::Utc::now),
            body: None,
            labels: vec![],
        }
    }

    #[test]
    fn merge_timestamp_always_wins_over_raw_state() {
        assert_eq!(PullRequestRecord::from(raw("open", true)).state, PrState::Merged);
        assert_eq!(PullRequestRecord::from(raw("closed", true)).state, PrState::Merged);
        assert_eq!(PullRequestRecord::from(raw("open", false)).state, PrState::Open);
        assert_eq!(PullRequestRecord::from(raw("closed", false)).state, PrState::Closed);
    }

    #[test]
    fn long_descriptions_are_truncated_with_ellipsis() {
        let body = "x".repeat(DESCRIPTION_MAX_CHARS * 2);
        let truncated = truncate_description(&body);
        assert_eq!(truncated.chars().count(), DESCRIPTION_MAX_CHARS + 1);
        assert!(truncated.ends_with('\u{2026}'));
    }

    #[test]
    fn short_descriptions_pass_through_unchanged() {
        assert_eq!(truncate_description("fixes a bug"), "fixes a bug");
    }
}
