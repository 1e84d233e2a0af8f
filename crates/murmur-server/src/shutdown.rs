//! Graceful shutdown via `CancellationToken`.
//!
//! Draining order: stop accepting submissions, wait (bounded) for in-flight
//! jobs so their final events reach listeners, then close every subscriber
//! stream so the HTTP server can finish.

use std::time::Duration;

use murmur_runtime::{EventBus, StreamCoordinator};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Default grace period for in-flight jobs.
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(10);

/// Coordinates graceful shutdown across the server.
#[derive(Debug, Default)]
pub struct ShutdownCoordinator {
    token: CancellationToken,
}

impl ShutdownCoordinator {
    /// Create a new shutdown coordinator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Clone of the cancellation token.
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Initiate shutdown.
    pub fn shutdown(&self) {
        self.token.cancel();
    }

    /// Whether a shutdown has been initiated.
    pub fn is_shutting_down(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Drain jobs for up to `grace`, then disconnect every subscriber.
    ///
    /// Returns `true` if every job finished within the grace period.
    pub async fn drain(&self, coordinator: &StreamCoordinator, bus: &EventBus, grace: Duration) -> bool {
        self.shutdown();
        info!(
            active_jobs = coordinator.active_jobs(),
            grace_ms = grace.as_millis() as u64,
            "shutting down"
        );
        let drained = coordinator.shutdown(grace).await;
        if !drained {
            warn!("in-flight jobs abandoned after grace period");
        }
        let closed = bus.disconnect_all();
        info!(closed, "subscriber streams closed");
        drained
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use murmur_core::{EventKind, StreamId, SubmitRequest, SubscriberId};
    use murmur_llm::Generator;
    use murmur_llm::mock::{ScriptedGenerator, ScriptedReply};
    use murmur_runtime::{BusConfig, CoordinatorConfig, SessionStore};
    use std::sync::Arc;

    fn coordinator(replies: Vec<ScriptedReply>) -> (StreamCoordinator, Arc<EventBus>) {
        let bus = Arc::new(EventBus::new(BusConfig::default()));
        let generator: Arc<dyn Generator> = Arc::new(ScriptedGenerator::new(replies));
        let config = CoordinatorConfig {
            chunk_delay: Duration::ZERO,
            ..CoordinatorConfig::default()
        };
        let coordinator =
            StreamCoordinator::new(Arc::new(SessionStore::new(5)), Arc::clone(&bus), generator, config);
        (coordinator, bus)
    }

    fn request() -> SubmitRequest {
        SubmitRequest {
            stream_id: StreamId::from("s1"),
            user_id: "u1".into(),
            display_name: "mina".into(),
            group_label: String::new(),
            message: "hi".into(),
            timestamp: "2025-05-01T12:00:00".into(),
        }
    }

    #[test]
    fn shutdown_sets_flag_and_cancels_token() {
        let coord = ShutdownCoordinator::new();
        let token = coord.token();
        assert!(!coord.is_shutting_down());
        coord.shutdown();
        coord.shutdown();
        assert!(coord.is_shutting_down());
        assert!(token.is_cancelled());
    }

    #[tokio::test(start_paused = true)]
    async fn drain_delivers_final_events_before_closing() {
        let (coordinator, bus) = coordinator(vec![ScriptedReply::delayed(
            Duration::from_secs(2),
            ScriptedReply::text("last words"),
        )]);
        let mut sub = bus.connect(SubscriberId::from("c1"));
        let _handle = coordinator.submit(request()).unwrap();

        let shutdown = ShutdownCoordinator::new();
        assert!(shutdown.drain(&coordinator, &bus, Duration::from_secs(5)).await);
        assert_eq!(bus.subscriber_count(), 0);

        let mut kinds = Vec::new();
        while let Some(event) = sub.recv().await {
            kinds.push(event.kind);
        }
        assert_eq!(
            kinds,
            vec![EventKind::Connect, EventKind::Chunk, EventKind::Chunk, EventKind::Done]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn drain_reports_abandoned_jobs() {
        let (coordinator, bus) = coordinator(vec![ScriptedReply::delayed(
            Duration::from_secs(60),
            ScriptedReply::text("too slow"),
        )]);
        let _handle = coordinator.submit(request()).unwrap();
        let shutdown = ShutdownCoordinator::new();
        assert!(!shutdown.drain(&coordinator, &bus, Duration::from_millis(100)).await);
        assert!(!coordinator.is_accepting());
    }
}
