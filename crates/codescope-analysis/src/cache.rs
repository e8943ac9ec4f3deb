//! Content-validated TTL cache for merged reports
//!
//! Keyed by (path, start, end). An entry is only served while the cached
//! content hash still matches the code being analyzed and the entry is
//! younger than the TTL; violations evict lazily on lookup. Edits to the
//! range therefore invalidate without any file watching.

use std::time::{Duration, Instant};

use dashmap::DashMap;
use sha2::{Digest, Sha256};

use crate::models::MergedReport;

type CacheKey = (String, u32, u32);

struct CacheEntry {
    report: MergedReport,
    code_hash: [u8; 32],
    created_at: Instant,
}

/// Concurrent result cache with content-hash validation and a wall-clock TTL
pub struct AnalysisCache {
    entries: DashMap<CacheKey, CacheEntry>,
    ttl: Duration,
}

impl AnalysisCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
        }
    }

    /// SHA-256 of the code text, the content identity of a range
    pub fn hash_code(code: &str) -> [u8; 32] {
        Sha256::digest(code.as_bytes()).into()
    }

    /// Serve a cached report if one exists, is fresh, and still describes
    /// this exact code. Stale or mismatched entries are evicted here.
    ///
    /// A served report is annotated: `from_cache` set, `cache_age_seconds`
    /// filled in.
    pub fn lookup(&self, path: &str, start: u32, end: u32, code: &str) -> Option<MergedReport> {
        let key = (path.to_string(), start, end);

        let hit = {
            let entry = self.entries.get(&key)?;
            let age = entry.created_at.elapsed();
            if age > self.ttl || entry.code_hash != Self::hash_code(code) {
                None
            } else {
                let mut report = entry.report.clone();
                report.from_cache = true;
                report.cache_age_seconds = Some(age.as_secs());
                Some(report)
            }
        };

        if hit.is_none() {
            self.entries.remove(&key);
        }
        hit
    }

    /// Store a freshly computed report, replacing any entry for the key
    pub fn store(&self, report: &MergedReport, code: &str) {
        let key = (report.path.clone(), report.start_line, report.end_line);
        self.entries.insert(
            key,
            CacheEntry {
                report: report.clone(),
                code_hash: Self::hash_code(code),
                created_at: Instant::now(),
            },
        );
    }

    /// Drop every entry, returning how many were held
    pub fn clear(&self) -> usize {
        let count = self.entries.len();
        self.entries.clear();
        count
    }

    /// Force-drop the entry for one range, returning whether one existed
    pub fn invalidate(&self, path: &str, start: u32, end: u32) -> bool {
        self.entries
            .remove(&(path.to_string(), start, end))
            .is_some()
    }

    /// Number of live entries (stale ones included until next lookup)
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
