//! Latest-snapshot cache.
//!
//! Single writer (the poller), many lock-free readers. Before the first
//! successful poll, reads return `None` so callers can distinguish "no data
//! yet" from a legitimate zero-congestion reading.

use arc_swap::ArcSwapOption;
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::models::NetworkSnapshot;

/// A stored snapshot plus its poll sequence number and production time.
#[derive(Debug, Clone)]
pub struct CachedSnapshot {
    pub seq: u64,
    pub produced_at: DateTime<Utc>,
    pub snapshot: Arc<NetworkSnapshot>,
}

#[derive(Default)]
pub struct SnapshotCache {
    current: ArcSwapOption<CachedSnapshot>,
    next_seq: AtomicU64,
}

impl SnapshotCache {
    pub fn new() -> Self {
        Self {
            current: ArcSwapOption::const_empty(),
            next_seq: AtomicU64::new(1),
        }
    }

    /// Store a freshly derived snapshot, superseding the previous one.
    /// Returns the stored entry so the caller can hand it to the hub.
    pub fn store(&self, snapshot: NetworkSnapshot) -> Arc<CachedSnapshot> {
        let entry = Arc::new(CachedSnapshot {
            seq: self.next_seq.fetch_add(1, Ordering::Relaxed),
            produced_at: Utc::now(),
            snapshot: Arc::new(snapshot),
        });
        self.current.store(Some(entry.clone()));
        entry
    }

    /// Latest entry, or `None` before the first successful poll.
    pub fn latest(&self) -> Option<Arc<CachedSnapshot>> {
        self.current.load_full()
    }

    /// Latest snapshot without the sequencing metadata.
    pub fn snapshot(&self) -> Option<Arc<NetworkSnapshot>> {
        self.latest().map(|entry| entry.snapshot.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Config, PerformanceSample};
    use crate::network::derive::derive_snapshot;

    fn sample_snapshot(tps_numerator: u64) -> NetworkSnapshot {
        let samples = [PerformanceSample {
            num_transactions: tps_numerator,
            num_failed_transactions: 0,
            sample_period_secs: 1.0,
            num_slots: 2,
        }];
        derive_snapshot(&samples, 1000, 1950, &Config::default()).unwrap()
    }

    #[test]
    fn empty_cache_reads_none() {
        let cache = SnapshotCache::new();
        assert!(cache.latest().is_none());
        assert!(cache.snapshot().is_none());
    }

    #[test]
    fn store_replaces_wholesale_and_bumps_seq() {
        let cache = SnapshotCache::new();

        let first = cache.store(sample_snapshot(1000));
        assert_eq!(first.seq, 1);
        assert_eq!(cache.snapshot().unwrap().tps, 1000);

        let second = cache.store(sample_snapshot(2000));
        assert_eq!(second.seq, 2);
        assert_eq!(cache.snapshot().unwrap().tps, 2000);
    }
}
