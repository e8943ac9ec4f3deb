//! Parsers for the two raw git log formats
//!
//! Both normalize to [`CommitRecord`]. Malformed lines are skipped, never
//! fatal: git output is treated as untrusted text.

use chrono::{DateTime, Utc};

use crate::models::CommitRecord;
use crate::runner::COMMIT_SENTINEL;

/// Number of pipe-separated fields in a commit header line
const HEADER_FIELDS: usize = 6;

/// Parse `git log -L` output: pipe-delimited headers interleaved with diff
/// hunks. Changed lines in the hunks are counted toward the current commit.
pub fn parse_line_range_log(raw: &str) -> Vec<CommitRecord> {
    let mut commits: Vec<CommitRecord> = Vec::new();

    for line in raw.lines() {
        if let Some(record) = parse_header(line) {
            commits.push(record);
        } else if is_change_line(line) {
            if let Some(current) = commits.last_mut() {
                current.lines_changed = current.lines_changed.saturating_add(1);
            }
        }
    }

    commits
}

/// Parse sentinel-prefixed `git log --numstat` output: each commit header is
/// prefixed by the sentinel token, followed by `added<TAB>deleted<TAB>path`
/// stat lines whose totals are attributed to that commit.
pub fn parse_file_stat_log(raw: &str) -> Vec<CommitRecord> {
    let mut commits: Vec<CommitRecord> = Vec::new();

    for line in raw.lines() {
        if let Some(header) = line.strip_prefix(COMMIT_SENTINEL) {
            if let Some(record) = parse_header(header) {
                commits.push(record);
            }
        } else if let Some((added, deleted)) = parse_numstat(line) {
            if let Some(current) = commits.last_mut() {
                current.lines_changed = current
                    .lines_changed
                    .saturating_add(added)
                    .saturating_add(deleted);
            }
        }
    }

    commits
}

/// Parse one `hash|short|name|email|iso|subject` header line
fn parse_header(line: &str) -> Option<CommitRecord> {
    let parts: Vec<&str> = line.splitn(HEADER_FIELDS, '|').collect();
    if parts.len() != HEADER_FIELDS {
        return None;
    }
    let hash = *parts.first()?;
    // Full hashes are 40 (sha1) or 64 (sha256) hex chars
    if !(hash.len() == 40 || hash.len() == 64) || !hash.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }

    Some(CommitRecord {
        hash: hash.to_string(),
        short_hash: (*parts.get(1)?).to_string(),
        author_name: (*parts.get(2)?).to_string(),
        author_email: (*parts.get(3)?).to_string(),
        timestamp: parse_timestamp(parts.get(4)?),
        message: (*parts.get(5)?).to_string(),
        lines_changed: 0,
    })
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|ts| ts.with_timezone(&Utc))
}

/// A diff body line representing an actual change (not a file marker)
fn is_change_line(line: &str) -> bool {
    (line.starts_with('+') && !line.starts_with("+++"))
        || (line.starts_with('-') && !line.starts_with("---"))
}

/// Parse `added<TAB>deleted<TAB>path`; binary files report `-` and count as 0
fn parse_numstat(line: &str) -> Option<(u32, u32)> {
    let mut fields = line.split('\t');
    let added = fields.next()?;
    let deleted = fields.next()?;
    fields.next()?; // path must be present

    let parse = |raw: &str| {
        if raw == "-" {
            Some(0)
        } else {
            raw.parse::<u32>().ok()
        }
    };
    Some((parse(added)?, parse(deleted)?))
}
