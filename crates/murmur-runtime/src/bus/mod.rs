//! Event fan-out to connected subscribers.
//!
//! Every broadcast goes to every connected subscriber; consumers filter on
//! `stream_id`. Each subscriber owns a bounded queue and `broadcast` never
//! waits on it: a full queue is handled by the configured [`OverflowPolicy`],
//! a closed one is pruned. Delivery is at-most-once and FIFO per subscriber.

mod subscriber;
mod subscription;

pub use subscriber::{Delivery, Subscriber};
pub use subscription::Subscription;

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use metrics::{counter, gauge};
use murmur_core::{RelayError, StreamEvent, SubscriberId};
use murmur_settings::{BusSettings, OverflowMode};
use parking_lot::RwLock;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::metrics::{BUS_BROADCAST_DROPS_TOTAL, BUS_FORCED_DISCONNECTS_TOTAL, BUS_SUBSCRIBERS_ACTIVE};

/// What to do when a subscriber's queue is full.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OverflowPolicy {
    /// Disconnect on the first dropped event.
    Disconnect,
    /// Drop events; disconnect once `max_drops` have been dropped in total.
    Tolerate {
        /// Lifetime drops allowed before disconnect.
        max_drops: u64,
    },
}

/// Bus parameters.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BusConfig {
    /// Per-subscriber queue capacity (minimum 1).
    pub queue_capacity: usize,
    /// Full-queue policy.
    pub overflow: OverflowPolicy,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self::from(&BusSettings::default())
    }
}

impl From<&BusSettings> for BusConfig {
    fn from(settings: &BusSettings) -> Self {
        Self {
            queue_capacity: settings.queue_capacity,
            overflow: match settings.overflow {
                OverflowMode::Disconnect => OverflowPolicy::Disconnect,
                OverflowMode::Tolerate => OverflowPolicy::Tolerate {
                    max_drops: settings.max_drops,
                },
            },
        }
    }
}

/// Per-broadcast delivery tally.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    /// Subscribers that received the event.
    pub delivered: usize,
    /// Subscribers whose queue was full.
    pub dropped: usize,
    /// Subscribers removed during this broadcast.
    pub disconnected: usize,
}

/// Registry of connected subscribers.
#[derive(Debug)]
pub struct EventBus {
    config: BusConfig,
    subscribers: RwLock<HashMap<SubscriberId, Arc<Subscriber>>>,
    next_epoch: AtomicU64,
}

impl EventBus {
    /// Create an empty bus.
    pub fn new(config: BusConfig) -> Self {
        Self {
            config,
            subscribers: RwLock::new(HashMap::new()),
            next_epoch: AtomicU64::new(0),
        }
    }

    /// Bus parameters.
    pub fn config(&self) -> BusConfig {
        self.config
    }

    /// Register `id` and return its event stream.
    ///
    /// The connection confirmation is the first queued event. An existing
    /// registration under the same id is replaced and its stream ends.
    pub fn connect(self: &Arc<Self>, id: SubscriberId) -> Subscription {
        let (tx, rx) = mpsc::channel(self.config.queue_capacity.max(1));
        let epoch = self.next_epoch.fetch_add(1, Ordering::Relaxed);
        let subscriber = Arc::new(Subscriber::new(id.clone(), epoch, tx));
        let _ = subscriber.deliver(Arc::new(StreamEvent::connect()));

        let (replaced, count) = {
            let mut subs = self.subscribers.write();
            let replaced = subs.insert(id.clone(), subscriber).is_some();
            (replaced, subs.len())
        };
        gauge!(BUS_SUBSCRIBERS_ACTIVE).set(count as f64);
        if replaced {
            info!(subscriber_id = %id, "subscriber reconnected, previous stream closed");
        } else {
            debug!(subscriber_id = %id, subscribers = count, "subscriber connected");
        }
        Subscription::new(id, epoch, rx, Arc::downgrade(self))
    }

    /// Remove `id`. Returns whether it was connected.
    pub fn disconnect(&self, id: &SubscriberId) -> bool {
        self.remove_where(id, |_| true)
    }

    /// Remove `id` only if it is still the registration created at `epoch`.
    pub(crate) fn release(&self, id: &SubscriberId, epoch: u64) -> bool {
        self.remove_where(id, |s| s.epoch == epoch)
    }

    /// Remove every subscriber, ending all streams.
    pub fn disconnect_all(&self) -> usize {
        let removed = {
            let mut subs = self.subscribers.write();
            let n = subs.len();
            subs.clear();
            n
        };
        gauge!(BUS_SUBSCRIBERS_ACTIVE).set(0.0);
        if removed > 0 {
            info!(subscribers = removed, "all subscribers disconnected");
        }
        removed
    }

    /// Enqueue `event` to every connected subscriber without waiting.
    ///
    /// Failures affect only the failing subscriber.
    pub fn broadcast(&self, event: StreamEvent) -> BroadcastReport {
        let event = Arc::new(event);
        let snapshot: Vec<Arc<Subscriber>> = self.subscribers.read().values().cloned().collect();

        let mut report = BroadcastReport::default();
        let mut to_remove = Vec::new();
        for sub in &snapshot {
            match sub.deliver(Arc::clone(&event)) {
                Delivery::Sent => report.delivered += 1,
                Delivery::Full(drops) => {
                    report.dropped += 1;
                    counter!(BUS_BROADCAST_DROPS_TOTAL).increment(1);
                    let evict = match self.config.overflow {
                        OverflowPolicy::Disconnect => true,
                        OverflowPolicy::Tolerate { max_drops } => drops >= max_drops,
                    };
                    if evict {
                        let err = RelayError::Delivery {
                            subscriber_id: sub.id.to_string(),
                            reason: format!("queue full after {drops} dropped events"),
                        };
                        warn!(
                            error = %err,
                            connected_secs = sub.age().as_secs(),
                            "disconnecting slow subscriber"
                        );
                        counter!(BUS_FORCED_DISCONNECTS_TOTAL).increment(1);
                        to_remove.push((sub.id.clone(), sub.epoch));
                    } else {
                        warn!(subscriber_id = %sub.id, total_drops = drops, "subscriber queue full, event dropped");
                    }
                }
                Delivery::Closed => {
                    debug!(subscriber_id = %sub.id, "subscriber channel closed, pruning");
                    to_remove.push((sub.id.clone(), sub.epoch));
                }
            }
        }

        for (id, epoch) in &to_remove {
            if self.release(id, *epoch) {
                report.disconnected += 1;
            }
        }
        debug!(
            kind = event.kind.sse_name(),
            stream_id = event.stream_id().map(|s| s.as_str()),
            recipients = snapshot.len(),
            delivered = report.delivered,
            "broadcast event"
        );
        report
    }

    /// Number of connected subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.read().len()
    }

    /// Whether `id` is connected.
    pub fn is_connected(&self, id: &SubscriberId) -> bool {
        self.subscribers.read().contains_key(id)
    }

    fn remove_where(&self, id: &SubscriberId, pred: impl Fn(&Subscriber) -> bool) -> bool {
        let (removed, count) = {
            let mut subs = self.subscribers.write();
            let removed = match subs.get(id) {
                Some(s) if pred(s) => subs.remove(id).is_some(),
                _ => false,
            };
            (removed, subs.len())
        };
        if removed {
            gauge!(BUS_SUBSCRIBERS_ACTIVE).set(count as f64);
            debug!(subscriber_id = %id, subscribers = count, "subscriber disconnected");
        }
        removed
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(BusConfig::default())
    }
}
