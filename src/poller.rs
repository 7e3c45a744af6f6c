//! Recurring sampling task: sample → derive → cache → broadcast.
//!
//! The poller is the single writer of the snapshot cache and the only place
//! in the service where an error is deliberately absorbed: a failed cycle is
//! logged, the previous snapshot stays readable, and the next scheduled tick
//! is the retry. There is no immediate retry storm.

use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{info, warn};

use crate::cache::{CachedSnapshot, SnapshotCache};
use crate::error::ServiceError;
use crate::hub::{BroadcastHub, NETWORK_CHANNEL};
use crate::models::Config;
use crate::network::derive::derive_snapshot;
use crate::rpc::PerformanceSource;

pub struct Poller {
    source: Arc<dyn PerformanceSource>,
    cache: Arc<SnapshotCache>,
    hub: Arc<BroadcastHub>,
    config: Config,
}

impl Poller {
    pub fn new(
        source: Arc<dyn PerformanceSource>,
        cache: Arc<SnapshotCache>,
        hub: Arc<BroadcastHub>,
        config: Config,
    ) -> Self {
        Self {
            source,
            cache,
            hub,
            config,
        }
    }

    /// Run until process shutdown. The first cycle fires immediately so the
    /// cache warms without waiting a full interval.
    pub async fn run(self) {
        let mut ticker = interval(Duration::from_secs(self.config.poll_interval_secs));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let mut consecutive_failures: u32 = 0;
        loop {
            ticker.tick().await;
            match self.poll_once().await {
                Ok(update) => {
                    if consecutive_failures > 0 {
                        info!(seq = update.seq, "poll recovered");
                    }
                    consecutive_failures = 0;
                }
                Err(e) => {
                    consecutive_failures += 1;
                    warn!(
                        error = %e,
                        consecutive_failures,
                        "poll cycle failed, keeping previous snapshot"
                    );
                }
            }
        }
    }

    /// One full cycle. On success the cache is replaced atomically and the
    /// new snapshot is fanned out to subscribers.
    pub async fn poll_once(&self) -> Result<Arc<CachedSnapshot>, ServiceError> {
        let samples = self
            .source
            .recent_samples(self.config.status_sample_count)
            .await?;
        let slot = self.source.current_slot().await?;
        let nodes = self.source.cluster_nodes().await?;

        let snapshot = derive_snapshot(&samples, slot, nodes.len(), &self.config)?;
        let update = self.cache.store(snapshot);

        // Publish unconditionally: the hub retains the envelope so a late
        // joiner gets the latest snapshot without waiting a poll cycle.
        let subscribers = self.hub.subscriber_count();
        let delivered = self.hub.publish(NETWORK_CHANNEL, &update);
        if subscribers > 0 {
            info!(
                seq = update.seq,
                subscribers, delivered, "pushed network update to connected clients"
            );
        }

        Ok(update)
    }
}
