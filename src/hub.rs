//! Subscriber registry and snapshot fan-out.
//!
//! The registry lock is never held across an await: fan-out uses `try_send`
//! on bounded per-subscriber queues, so one slow or dead socket is evicted
//! instead of stalling the broadcast. A late joiner is seeded with the latest
//! retained update before becoming visible to the broadcast path, so it never
//! waits a full poll cycle and never sees a duplicate around the join.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::cache::CachedSnapshot;
use crate::models::ServerMessage;

/// The only channel currently wired up; the registry itself is keyed
/// generically.
pub const NETWORK_CHANNEL: &str = "network";

const DEFAULT_QUEUE_DEPTH: usize = 16;

pub type SubscriberId = u64;

struct Subscriber {
    channel: String,
    tx: mpsc::Sender<Arc<str>>,
    /// Highest poll sequence already queued; guards against duplicate or
    /// out-of-order delivery around joins.
    last_seq: u64,
}

struct Retained {
    seq: u64,
    payload: Arc<str>,
}

#[derive(Default)]
struct Registry {
    next_id: SubscriberId,
    subscribers: HashMap<SubscriberId, Subscriber>,
    retained: HashMap<String, Retained>,
}

pub struct BroadcastHub {
    registry: RwLock<Registry>,
    queue_depth: usize,
}

impl Default for BroadcastHub {
    fn default() -> Self {
        Self::new()
    }
}

impl BroadcastHub {
    pub fn new() -> Self {
        Self::with_queue_depth(DEFAULT_QUEUE_DEPTH)
    }

    pub fn with_queue_depth(queue_depth: usize) -> Self {
        Self {
            registry: RwLock::new(Registry::default()),
            queue_depth: queue_depth.max(1),
        }
    }

    /// Register a subscriber on `channel` and hand back its queue.
    pub fn subscribe(&self, channel: &str) -> (SubscriberId, mpsc::Receiver<Arc<str>>) {
        let (tx, rx) = mpsc::channel(self.queue_depth);
        let mut registry = self.registry.write();

        let id = registry.next_id;
        registry.next_id += 1;

        let mut last_seq = 0;
        if let Some(retained) = registry.retained.get(channel) {
            // Freshly created queue with capacity >= 1; this cannot fail.
            let _ = tx.try_send(retained.payload.clone());
            last_seq = retained.seq;
        }

        registry.subscribers.insert(
            id,
            Subscriber {
                channel: channel.to_string(),
                tx,
                last_seq,
            },
        );
        debug!(id, channel, "subscriber joined");
        (id, rx)
    }

    pub fn unsubscribe(&self, id: SubscriberId) {
        if self.registry.write().subscribers.remove(&id).is_some() {
            debug!(id, "subscriber left");
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.registry.read().subscribers.len()
    }

    /// Fan a new snapshot out to every live subscriber of `channel`.
    ///
    /// The update envelope is serialized once. A full or closed queue evicts
    /// that subscriber without affecting delivery to the rest. Returns the
    /// number of subscribers the update was queued for.
    pub fn publish(&self, channel: &str, update: &CachedSnapshot) -> usize {
        let message = ServerMessage::NetworkUpdate {
            data: (*update.snapshot).clone(),
            timestamp: update.produced_at,
        };
        let payload: Arc<str> = match serde_json::to_string(&message) {
            Ok(json) => json.into(),
            Err(e) => {
                warn!(error = %e, "failed to serialize network update");
                return 0;
            }
        };

        let mut registry = self.registry.write();
        registry.retained.insert(
            channel.to_string(),
            Retained {
                seq: update.seq,
                payload: payload.clone(),
            },
        );

        let mut delivered = 0;
        let mut evicted = Vec::new();
        for (&id, subscriber) in registry.subscribers.iter_mut() {
            if subscriber.channel != channel || subscriber.last_seq >= update.seq {
                continue;
            }
            match subscriber.tx.try_send(payload.clone()) {
                Ok(()) => {
                    subscriber.last_seq = update.seq;
                    delivered += 1;
                }
                Err(mpsc::error::TrySendError::Full(_)) => {
                    warn!(id, "subscriber queue full, evicting");
                    evicted.push(id);
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    debug!(id, "subscriber connection gone, evicting");
                    evicted.push(id);
                }
            }
        }
        for id in evicted {
            registry.subscribers.remove(&id);
        }

        delivered
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::SnapshotCache;
    use crate::models::{Config, PerformanceSample};
    use crate::network::derive::derive_snapshot;

    fn store_snapshot(cache: &SnapshotCache, tps: u64) -> Arc<CachedSnapshot> {
        let samples = [PerformanceSample {
            num_transactions: tps,
            num_failed_transactions: 0,
            sample_period_secs: 1.0,
            num_slots: 2,
        }];
        cache.store(derive_snapshot(&samples, 1, 1950, &Config::default()).unwrap())
    }

    fn parse_update(payload: &str) -> u64 {
        match serde_json::from_str::<ServerMessage>(payload).unwrap() {
            ServerMessage::NetworkUpdate { data, .. } => data.tps,
            other => panic!("unexpected message: {:?}", other),
        }
    }

    #[tokio::test]
    async fn publish_reaches_all_channel_subscribers() {
        let hub = BroadcastHub::new();
        let cache = SnapshotCache::new();

        let (_a, mut rx_a) = hub.subscribe(NETWORK_CHANNEL);
        let (_b, mut rx_b) = hub.subscribe(NETWORK_CHANNEL);
        let (_c, mut rx_c) = hub.subscribe("other");

        let update = store_snapshot(&cache, 2000);
        let delivered = hub.publish(NETWORK_CHANNEL, &update);
        assert_eq!(delivered, 2);

        assert_eq!(parse_update(&rx_a.recv().await.unwrap()), 2000);
        assert_eq!(parse_update(&rx_b.recv().await.unwrap()), 2000);
        assert!(rx_c.try_recv().is_err());
    }

    #[tokio::test]
    async fn late_joiner_gets_latest_snapshot_immediately() {
        let hub = BroadcastHub::new();
        let cache = SnapshotCache::new();

        hub.publish(NETWORK_CHANNEL, &store_snapshot(&cache, 1000));
        let latest = store_snapshot(&cache, 3000);
        hub.publish(NETWORK_CHANNEL, &latest);

        let (_id, mut rx) = hub.subscribe(NETWORK_CHANNEL);
        assert_eq!(parse_update(&rx.recv().await.unwrap()), 3000);

        // No duplicate of the same poll on the next publish.
        assert!(rx.try_recv().is_err());
        let newer = store_snapshot(&cache, 3600);
        hub.publish(NETWORK_CHANNEL, &newer);
        assert_eq!(parse_update(&rx.recv().await.unwrap()), 3600);
    }

    #[tokio::test]
    async fn closed_subscriber_is_evicted_without_affecting_others() {
        let hub = BroadcastHub::new();
        let cache = SnapshotCache::new();

        let (_dead, rx_dead) = hub.subscribe(NETWORK_CHANNEL);
        let (_live, mut rx_live) = hub.subscribe(NETWORK_CHANNEL);
        drop(rx_dead);
        assert_eq!(hub.subscriber_count(), 2);

        let delivered = hub.publish(NETWORK_CHANNEL, &store_snapshot(&cache, 2000));
        assert_eq!(delivered, 1);
        assert_eq!(hub.subscriber_count(), 1);
        assert_eq!(parse_update(&rx_live.recv().await.unwrap()), 2000);
    }

    #[tokio::test]
    async fn slow_subscriber_is_evicted_when_queue_fills() {
        let hub = BroadcastHub::with_queue_depth(1);
        let cache = SnapshotCache::new();

        let (_id, _rx) = hub.subscribe(NETWORK_CHANNEL);
        assert_eq!(hub.publish(NETWORK_CHANNEL, &store_snapshot(&cache, 1000)), 1);
        // Queue now full and undrained; the next publish evicts.
        assert_eq!(hub.publish(NETWORK_CHANNEL, &store_snapshot(&cache, 2000)), 0);
        assert_eq!(hub.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn unsubscribe_removes_from_fanout() {
        let hub = BroadcastHub::new();
        let cache = SnapshotCache::new();

        let (id, _rx) = hub.subscribe(NETWORK_CHANNEL);
        hub.unsubscribe(id);
        assert_eq!(hub.subscriber_count(), 0);
        assert_eq!(hub.publish(NETWORK_CHANNEL, &store_snapshot(&cache, 1000)), 0);
    }
}
