//! Receiving end of a bus connection.

use std::pin::Pin;
use std::sync::{Arc, Weak};
use std::task::{Context, Poll};

use futures::Stream;
use murmur_core::{StreamEvent, SubscriberId};
use tokio::sync::mpsc;

use super::EventBus;

/// Event stream for one subscriber.
///
/// Yields events in broadcast order and ends when the bus disconnects this
/// subscriber (explicit disconnect, replacement, overflow, or shutdown).
/// Dropping it removes the registration if it is still the current one.
#[derive(Debug)]
pub struct Subscription {
    id: SubscriberId,
    epoch: u64,
    rx: mpsc::Receiver<Arc<StreamEvent>>,
    bus: Weak<EventBus>,
}

impl Subscription {
    pub(crate) fn new(
        id: SubscriberId,
        epoch: u64,
        rx: mpsc::Receiver<Arc<StreamEvent>>,
        bus: Weak<EventBus>,
    ) -> Self {
        Self { id, epoch, rx, bus }
    }

    /// Subscriber identity.
    pub fn id(&self) -> &SubscriberId {
        &self.id
    }

    /// Next event, or `None` once disconnected.
    pub async fn recv(&mut self) -> Option<Arc<StreamEvent>> {
        self.rx.recv().await
    }

    /// Next event if one is already queued.
    pub fn try_recv(&mut self) -> Option<Arc<StreamEvent>> {
        self.rx.try_recv().ok()
    }
}

impl Stream for Subscription {
    type Item = Arc<StreamEvent>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(bus) = self.bus.upgrade() {
            let _ = bus.release(&self.id, self.epoch);
        }
    }
}
