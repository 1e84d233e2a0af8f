//! One connected listener on the bus.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use murmur_core::{StreamEvent, SubscriberId};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

/// Outcome of a single non-blocking delivery.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Delivery {
    /// Event enqueued.
    Sent,
    /// Queue full; event dropped. Carries the lifetime drop count.
    Full(u64),
    /// Receiver gone.
    Closed,
}

/// Registry entry for a connected subscriber.
#[derive(Debug)]
pub struct Subscriber {
    /// Connection identity.
    pub id: SubscriberId,
    /// Distinguishes this connection from a later one reusing the same id.
    pub(crate) epoch: u64,
    tx: mpsc::Sender<Arc<StreamEvent>>,
    connected_at: Instant,
    dropped: AtomicU64,
}

impl Subscriber {
    pub(crate) fn new(id: SubscriberId, epoch: u64, tx: mpsc::Sender<Arc<StreamEvent>>) -> Self {
        Self {
            id,
            epoch,
            tx,
            connected_at: Instant::now(),
            dropped: AtomicU64::new(0),
        }
    }

    /// Enqueue without waiting.
    pub fn deliver(&self, event: Arc<StreamEvent>) -> Delivery {
        match self.tx.try_send(event) {
            Ok(()) => Delivery::Sent,
            Err(TrySendError::Full(_)) => {
                Delivery::Full(self.dropped.fetch_add(1, Ordering::Relaxed) + 1)
            }
            Err(TrySendError::Closed(_)) => Delivery::Closed,
        }
    }

    /// Events dropped for this connection so far.
    pub fn drop_count(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Connection age.
    pub fn age(&self) -> Duration {
        self.connected_at.elapsed()
    }
}
