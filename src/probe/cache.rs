//! Hour-bucketed cache of sweep reports.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use tracing::debug;

use crate::models::ProbeReport;

/// `YYYYMMDDHH`, UTC. Lexicographic order matches chronological order.
pub fn bucket_key(at: DateTime<Utc>) -> String {
    at.format("%Y%m%d%H").to_string()
}

/// Latest report per hour bucket, last writer wins.
///
/// Owned by the caller and shared through an `Arc`; nothing here is global.
#[derive(Debug)]
pub struct ResultCache {
    entries: RwLock<BTreeMap<String, ProbeReport>>,
    max_buckets: usize,
}

impl ResultCache {
    pub fn new(max_buckets: usize) -> Self {
        Self {
            entries: RwLock::new(BTreeMap::new()),
            max_buckets: max_buckets.max(1),
        }
    }

    /// Store `report` under its own bucket, replacing any earlier report for that hour.
    /// Returns the bucket key.
    pub fn store(&self, report: ProbeReport) -> String {
        let key = bucket_key(report.generated_at);
        let mut entries = self.entries.write();
        entries.insert(key.clone(), report);

        while entries.len() > self.max_buckets {
            if let Some((evicted, _)) = entries.pop_first() {
                debug!(bucket = %evicted, "Evicted cached report");
            }
        }
        key
    }

    pub fn get(&self, bucket: &str) -> Option<ProbeReport> {
        self.entries.read().get(bucket).cloned()
    }

    /// Report from the newest bucket
    pub fn latest(&self) -> Option<ProbeReport> {
        self.entries.read().values().next_back().cloned()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}
