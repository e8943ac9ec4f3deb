//! Data models for mined history

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, Serializer};

/// One historical change touching the analyzed range. Immutable once parsed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitRecord {
    /// Full commit hash
    pub hash: String,
    /// Abbreviated commit hash
    pub short_hash: String,
    /// Author display name
    pub author_name: String,
    /// Author email
    pub author_email: String,
    /// Author timestamp
    pub timestamp: Option<DateTime<Utc>>,
    /// Commit subject line
    pub message: String,
    /// Approximate lines changed attributable to this commit in the range
    pub lines_changed: u32,
}

/// Per-author aggregate derived from the commit set
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnerStat {
    /// Display name
    pub name: String,
    /// Email used as the grouping identity when present
    pub email: String,
    /// Number of commits by this author in the analyzed set
    pub commits: usize,
    /// Summed lines changed across those commits
    pub lines_changed: u32,
    /// Timestamp of the author's most recent contribution
    pub last_commit: Option<DateTime<Utc>>,
    /// Integer share of total commits, rounded independently per owner.
    /// Sums to approximately 100 across all owners; not renormalized.
    pub percentage: u32,
}

/// Ordinal change-rate label derived from commit count over elapsed span
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChangeFrequency {
    /// More than 10 changes per month
    VeryFrequent,
    /// 5-10 changes per month
    Frequent,
    /// 1-5 changes per month
    Occasional,
    /// 0.25-1 changes per month
    Rare,
    /// Below 0.25 changes per month
    VeryStable,
    /// Fewer than 2 commits in the analyzed set
    RarelyChanged,
    /// No history available
    Unknown,
}

/// Complete history view for one (file, line-range) request
///
/// Computed fresh per request and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistorySummary {
    /// Commits newest-first, bounded by the configured maximum
    pub commits: Vec<CommitRecord>,
    /// Owners sorted by commit count descending (stable within ties)
    pub owners: Vec<OwnerStat>,
    /// Newest commit timestamp; serialized as "unknown" when absent
    #[serde(serialize_with = "serialize_timestamp_or_unknown")]
    pub last_modified: Option<DateTime<Utc>>,
    /// Oldest commit timestamp; serialized as "unknown" when absent
    #[serde(serialize_with = "serialize_timestamp_or_unknown")]
    pub created_at: Option<DateTime<Utc>>,
    /// Ordinal change-rate label
    pub change_frequency: ChangeFrequency,
}

impl HistorySummary {
    /// The valid terminal state for paths without usable history
    pub fn empty() -> Self {
        Self {
            commits: Vec::new(),
            owners: Vec::new(),
            last_modified: None,
            created_at: None,
            change_frequency: ChangeFrequency::Unknown,
        }
    }
}

#[allow(clippy::ref_option)]
fn serialize_timestamp_or_unknown<S: Serializer>(
    value: &Option<DateTime<Utc>>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match value {
        Some(ts) => serializer.serialize_str(&ts.to_rfc3339()),
        None => serializer.serialize_str("unknown"),
    }
}
