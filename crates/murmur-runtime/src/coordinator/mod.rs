//! Stream coordinator: runs one job per submission.
//!
//! A job appends the user turn, generates a reply from the preamble plus the
//! stream's window, publishes the reply as ordered chunk events, records the
//! assistant turn, and finishes with a done event. Any failure discards the
//! stream's whole window and publishes a single error event instead.
//!
//! Jobs run on their own tasks. Jobs for the same stream are serialized in
//! submission order; jobs for different streams run concurrently. Subscribers
//! coming and going never cancel a job.

mod job;
mod lanes;

pub use job::{JobHandle, JobState};

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chrono::Utc;
use futures::FutureExt;
use metrics::{counter, gauge};
use murmur_core::text::{preview, segment_reply};
use murmur_core::{ChatMessage, JobId, RelayError, StreamEvent, StreamId, SubmitRequest, Turn, TurnRole};
use murmur_llm::{Generation, GenerationError, Generator};
use murmur_settings::CoordinatorSettings;
use tokio::sync::{OwnedSemaphorePermit, Semaphore, watch};
use tokio_util::task::TaskTracker;
use tracing::{Instrument, debug, info, info_span, instrument, warn};

use crate::bus::EventBus;
use crate::metrics::{JOBS_ACTIVE, JOBS_COMPLETED_TOTAL, JOBS_FAILED_TOTAL, JOBS_SUBMITTED_TOTAL};
use crate::observer::{GenerationObserver, GenerationRecord, TracingObserver};
use crate::prompt::{PromptProvider, StaticPromptProvider};
use crate::session::SessionStore;

use lanes::{LaneTicket, StreamLanes};

/// Coordinator parameters.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CoordinatorConfig {
    /// Upper bound on one generation call.
    pub generation_timeout: Duration,
    /// Pause between published chunks.
    pub chunk_delay: Duration,
    /// Maximum queued plus running jobs.
    pub max_pending_jobs: usize,
    /// Maximum submitted message length in characters.
    pub max_message_chars: usize,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self::from(&CoordinatorSettings::default())
    }
}

impl From<&CoordinatorSettings> for CoordinatorConfig {
    fn from(settings: &CoordinatorSettings) -> Self {
        Self {
            generation_timeout: Duration::from_millis(settings.generation_timeout_ms),
            chunk_delay: Duration::from_millis(settings.chunk_delay_ms),
            max_pending_jobs: settings.max_pending_jobs.max(1),
            max_message_chars: settings.max_message_chars,
        }
    }
}

/// Collaborators shared by every job.
#[derive(Clone)]
struct Pipeline {
    sessions: Arc<SessionStore>,
    bus: Arc<EventBus>,
    generator: Arc<dyn Generator>,
    prompt: Arc<dyn PromptProvider>,
    observer: Arc<dyn GenerationObserver>,
    config: CoordinatorConfig,
}

/// Accepts submissions and drives their jobs to completion.
pub struct StreamCoordinator {
    pipeline: Pipeline,
    permits: Arc<Semaphore>,
    lanes: Arc<StreamLanes>,
    tracker: TaskTracker,
    accepting: AtomicBool,
}

impl StreamCoordinator {
    /// Create a coordinator with no preamble and the tracing observer.
    pub fn new(
        sessions: Arc<SessionStore>,
        bus: Arc<EventBus>,
        generator: Arc<dyn Generator>,
        config: CoordinatorConfig,
    ) -> Self {
        Self {
            permits: Arc::new(Semaphore::new(config.max_pending_jobs)),
            pipeline: Pipeline {
                sessions,
                bus,
                generator,
                prompt: Arc::new(StaticPromptProvider::empty()),
                observer: Arc::new(TracingObserver),
                config,
            },
            lanes: Arc::new(StreamLanes::default()),
            tracker: TaskTracker::new(),
            accepting: AtomicBool::new(true),
        }
    }

    /// Use `prompt` for the preamble.
    #[must_use]
    pub fn with_prompt(mut self, prompt: Arc<dyn PromptProvider>) -> Self {
        self.pipeline.prompt = prompt;
        self
    }

    /// Send generation records to `observer`.
    #[must_use]
    pub fn with_observer(mut self, observer: Arc<dyn GenerationObserver>) -> Self {
        self.pipeline.observer = observer;
        self
    }

    /// Session windows.
    pub fn sessions(&self) -> &Arc<SessionStore> {
        &self.pipeline.sessions
    }

    /// Event bus.
    pub fn bus(&self) -> &Arc<EventBus> {
        &self.pipeline.bus
    }

    /// Coordinator parameters.
    pub fn config(&self) -> CoordinatorConfig {
        self.pipeline.config
    }

    /// Jobs queued or running.
    pub fn active_jobs(&self) -> usize {
        self.pipeline.config.max_pending_jobs - self.permits.available_permits()
    }

    /// Streams with a queued or running job.
    pub fn busy_streams(&self) -> usize {
        self.lanes.busy_streams()
    }

    /// Whether submissions are still accepted.
    pub fn is_accepting(&self) -> bool {
        self.accepting.load(Ordering::Acquire)
    }

    /// Validate `request` and start a job for it.
    ///
    /// Returns as soon as the job is queued; the reply is observable only
    /// through bus events.
    #[instrument(skip_all, fields(stream_id = %request.stream_id, user_id = %request.user_id))]
    pub fn submit(&self, request: SubmitRequest) -> Result<JobHandle, RelayError> {
        if !self.is_accepting() {
            return Err(RelayError::ShuttingDown);
        }
        request.validate(self.pipeline.config.max_message_chars)?;

        let permit = Arc::clone(&self.permits)
            .try_acquire_owned()
            .map_err(|_| RelayError::ServerBusy {
                pending: self.active_jobs(),
                max: self.pipeline.config.max_pending_jobs,
            })?;

        let job_id = JobId::new();
        let stream_id = request.stream_id;
        let (state_tx, state_rx) = watch::channel(JobState::Queued);
        let ticket = self.lanes.enter(&stream_id, &job_id);

        info!(
            job_id = %job_id,
            display_name = %request.display_name,
            group_label = %request.group_label,
            message = %preview(&request.message, 80),
            queued_behind = ticket.has_predecessor(),
            "job accepted"
        );
        counter!(JOBS_SUBMITTED_TOTAL).increment(1);
        gauge!(JOBS_ACTIVE).set(self.active_jobs() as f64);

        let job = Job {
            id: job_id.clone(),
            stream_id: stream_id.clone(),
            message: request.message,
            pipeline: self.pipeline.clone(),
            state: state_tx,
        };
        let mut slot = JobSlot {
            lanes: Arc::clone(&self.lanes),
            ticket: Some(ticket),
            permits: Arc::clone(&self.permits),
            permit: Some(permit),
            max: self.pipeline.config.max_pending_jobs,
        };
        let span = info_span!("job", job_id = %job_id, stream_id = %stream_id);

        let _ = self.tracker.spawn(
            async move {
                slot.wait_turn().await;
                if let Err(payload) = AssertUnwindSafe(job.run()).catch_unwind().await {
                    job.fail(&RelayError::Internal(format!(
                        "job panicked: {}",
                        panic_message(&*payload)
                    )));
                }
                drop(slot);
            }
            .instrument(span),
        );

        Ok(JobHandle::new(job_id, stream_id, state_rx))
    }

    /// Discard the window for `stream_id`. In-flight jobs are not cancelled.
    #[instrument(skip(self), fields(stream_id = %stream_id))]
    pub fn terminate(&self, stream_id: &StreamId) -> bool {
        let existed = self.pipeline.sessions.delete(stream_id);
        info!(existed, "stream terminated");
        existed
    }

    /// Stop accepting submissions and wait up to `grace` for running jobs.
    ///
    /// Returns `true` if every job finished in time.
    pub async fn shutdown(&self, grace: Duration) -> bool {
        self.accepting.store(false, Ordering::Release);
        let _ = self.tracker.close();
        let pending = self.tracker.len();
        info!(pending, "coordinator draining");
        let drained = tokio::time::timeout(grace, self.tracker.wait()).await.is_ok();
        if drained {
            info!("coordinator drained");
        } else {
            warn!(remaining = self.tracker.len(), "coordinator shutdown timed out");
        }
        drained
    }
}

/// A job's lane position and pending-job permit, returned on every exit path.
struct JobSlot {
    lanes: Arc<StreamLanes>,
    ticket: Option<LaneTicket>,
    permits: Arc<Semaphore>,
    permit: Option<OwnedSemaphorePermit>,
    max: usize,
}

impl JobSlot {
    async fn wait_turn(&mut self) {
        if let Some(ticket) = self.ticket.as_mut() {
            ticket.wait_turn().await;
        }
    }
}

impl Drop for JobSlot {
    fn drop(&mut self) {
        if let Some(ticket) = self.ticket.take() {
            self.lanes.leave(ticket);
        }
        drop(self.permit.take());
        gauge!(JOBS_ACTIVE).set((self.max - self.permits.available_permits()) as f64);
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_owned())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_owned())
}

/// One submission in flight.
struct Job {
    id: JobId,
    stream_id: StreamId,
    message: String,
    pipeline: Pipeline,
    state: watch::Sender<JobState>,
}

impl Job {
    async fn run(&self) {
        self.transition(JobState::Generating);
        let _ = self
            .pipeline
            .sessions
            .append(&self.stream_id, TurnRole::User, self.message.as_str());

        let mut messages = self.pipeline.prompt.preamble();
        messages.extend(
            self.pipeline
                .sessions
                .recent(&self.stream_id)
                .iter()
                .map(Turn::to_chat_message),
        );

        let generation = match self.generate(messages).await {
            Ok(generation) => generation,
            Err(err) => return self.fail(&RelayError::from(err)),
        };

        let fragments = segment_reply(&generation.text);
        if fragments.is_empty() {
            return self.fail(&RelayError::from(GenerationError::EmptyResponse));
        }

        self.transition(JobState::Publishing);
        let bus = &self.pipeline.bus;
        let delay = self.pipeline.config.chunk_delay;
        let count = fragments.len();
        for (i, fragment) in fragments.into_iter().enumerate() {
            if i > 0 && !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            let _ = bus.broadcast(StreamEvent::chunk(&self.stream_id, fragment));
        }

        let _ = self
            .pipeline
            .sessions
            .append(&self.stream_id, TurnRole::Assistant, generation.text);
        let _ = bus.broadcast(StreamEvent::done(&self.stream_id));

        self.transition(JobState::Completed);
        counter!(JOBS_COMPLETED_TOTAL).increment(1);
        info!(chunks = count, "job completed");
    }

    async fn generate(&self, messages: Vec<ChatMessage>) -> Result<Generation, GenerationError> {
        let generator = &self.pipeline.generator;
        let timeout = self.pipeline.config.generation_timeout;
        let started_at = Utc::now();
        let start = tokio::time::Instant::now();
        debug!(input_messages = messages.len(), "generating");

        let attempt = AssertUnwindSafe(tokio::time::timeout(timeout, generator.generate(&messages)))
            .catch_unwind()
            .await;
        let result = match attempt {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(GenerationError::Timeout {
                after_ms: timeout.as_millis() as u64,
            }),
            Err(payload) => Err(GenerationError::Panicked(panic_message(&*payload))),
        };

        let record = GenerationRecord {
            job_id: self.id.clone(),
            stream_id: self.stream_id.clone(),
            backend: generator.backend().to_string(),
            model: generator.model().to_string(),
            input: messages,
            output: result
                .as_ref()
                .map(|g| g.text.clone())
                .map_err(ToString::to_string),
            started_at,
            duration: start.elapsed(),
            usage: result.as_ref().ok().and_then(|g| g.usage),
        };
        let observer = &self.pipeline.observer;
        if std::panic::catch_unwind(AssertUnwindSafe(|| observer.record(&record))).is_err() {
            warn!("generation observer panicked, record dropped");
        }
        result
    }

    fn fail(&self, err: &RelayError) {
        let _ = self.pipeline.sessions.delete(&self.stream_id);
        let reason = err.to_string();
        let _ = self
            .pipeline
            .bus
            .broadcast(StreamEvent::error(&self.stream_id, reason.clone()));
        warn!(error = %reason, "job failed, window discarded");
        counter!(JOBS_FAILED_TOTAL).increment(1);
        self.transition(JobState::Failed { reason });
    }

    fn transition(&self, next: JobState) {
        debug!(state = next.label(), "job state");
        let _ = self.state.send_replace(next);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::{BusConfig, OverflowPolicy, Subscription};
    use assert_matches::assert_matches;
    use murmur_core::{EventKind, SubscriberId, ValidationError};
    use murmur_llm::mock::{ScriptedGenerator, ScriptedReply};
    use parking_lot::Mutex;

    struct Harness {
        coordinator: StreamCoordinator,
        generator: Arc<ScriptedGenerator>,
        subscription: Subscription,
    }

    fn config() -> CoordinatorConfig {
        CoordinatorConfig {
            generation_timeout: Duration::from_secs(60),
            chunk_delay: Duration::ZERO,
            max_pending_jobs: 16,
            max_message_chars: 4_000,
        }
    }

    fn harness_with(replies: Vec<ScriptedReply>, config: CoordinatorConfig) -> Harness {
        let generator = Arc::new(ScriptedGenerator::new(replies));
        let bus = Arc::new(EventBus::new(BusConfig {
            queue_capacity: 1024,
            overflow: OverflowPolicy::Disconnect,
        }));
        let subscription = bus.connect(SubscriberId::from("listener"));
        let coordinator = StreamCoordinator::new(
            Arc::new(SessionStore::new(5)),
            bus,
            Arc::clone(&generator) as Arc<dyn Generator>,
            config,
        );
        Harness {
            coordinator,
            generator,
            subscription,
        }
    }

    fn harness(replies: Vec<ScriptedReply>) -> Harness {
        harness_with(replies, config())
    }

    fn request(stream: &str, message: &str) -> SubmitRequest {
        SubmitRequest {
            stream_id: StreamId::from(stream),
            user_id: "u1".into(),
            display_name: "mina".into(),
            group_label: "cohort-2".into(),
            message: message.into(),
            timestamp: "2025-05-01T12:00:00Z".into(),
        }
    }

    /// Queued events after the connect confirmation.
    fn drain(sub: &mut Subscription) -> Vec<Arc<StreamEvent>> {
        std::iter::from_fn(|| sub.try_recv())
            .filter(|e| e.kind != EventKind::Connect)
            .collect()
    }

    fn window(h: &Harness, stream: &str) -> Vec<(TurnRole, String)> {
        h.coordinator
            .sessions()
            .recent(&StreamId::from(stream))
            .into_iter()
            .map(|Turn { role, text, .. }| (role, text))
            .collect()
    }

    #[tokio::test]
    async fn successful_job_publishes_chunks_then_done() {
        let mut h = harness(vec![ScriptedReply::text("hello there")]);
        let handle = h.coordinator.submit(request("s1", "hi")).unwrap();
        assert_eq!(handle.wait().await, JobState::Completed);

        let events = drain(&mut h.subscription);
        let kinds: Vec<_> = events.iter().map(|e| e.kind).collect();
        assert_eq!(kinds, vec![EventKind::Chunk, EventKind::Chunk, EventKind::Done]);
        assert_eq!(events[0].payload.message.as_deref(), Some("hello "));
        assert_eq!(events[1].payload.message.as_deref(), Some("there "));
        assert_eq!(events[2].payload.message, None);
        assert!(events.iter().all(|e| e.stream_id() == Some(&StreamId::from("s1"))));

        assert_eq!(
            window(&h, "s1"),
            vec![
                (TurnRole::User, "hi".to_string()),
                (TurnRole::Assistant, "hello there".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn chunks_concatenate_to_reply() {
        let reply = "one  two\nthree four";
        let mut h = harness(vec![ScriptedReply::text(reply)]);
        let _ = h.coordinator.submit(request("s1", "go")).unwrap().wait().await;

        let joined: String = drain(&mut h.subscription)
            .iter()
            .filter(|e| e.kind == EventKind::Chunk)
            .filter_map(|e| e.payload.message.clone())
            .collect();
        assert_eq!(joined.trim_end(), "one two three four");
    }

    #[tokio::test]
    async fn failed_job_wipes_window_and_emits_one_error() {
        let mut h = harness(vec![ScriptedReply::api_error(500, "backend down")]);
        let s2 = StreamId::from("s2");
        let _ = h.coordinator.sessions().append(&s2, TurnRole::User, "earlier");
        let _ = h.coordinator.sessions().append(&s2, TurnRole::Assistant, "reply");

        let state = h.coordinator.submit(request("s2", "again")).unwrap().wait().await;
        assert_matches!(state, JobState::Failed { ref reason } if reason.contains("backend down"));

        assert!(h.coordinator.sessions().recent(&s2).is_empty());
        assert!(!h.coordinator.sessions().contains(&s2));
        let events = drain(&mut h.subscription);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, EventKind::Error);
        assert_eq!(events[0].stream_id(), Some(&s2));
    }

    #[tokio::test]
    async fn empty_reply_fails_job() {
        let mut h = harness(vec![ScriptedReply::text(" ")]);
        let state = h.coordinator.submit(request("s1", "hi")).unwrap().wait().await;
        assert_matches!(state, JobState::Failed { .. });
        assert!(h.coordinator.sessions().is_empty());
        let events = drain(&mut h.subscription);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, EventKind::Error);
    }

    #[tokio::test]
    async fn six_sequential_messages_keep_last_five_turns() {
        let replies = (0..6).map(|i| ScriptedReply::text(format!("r{i}"))).collect();
        let h = harness(replies);
        for i in 0..6 {
            let handle = h.coordinator.submit(request("s1", &format!("m{i}"))).unwrap();
            assert_eq!(handle.wait().await, JobState::Completed);
        }
        let window = window(&h, "s1");
        assert_eq!(window.len(), 5);
        assert!(!window.iter().any(|(_, text)| text == "m0"));
        assert_eq!(window.last().unwrap(), &(TurnRole::Assistant, "r5".to_string()));
    }

    #[tokio::test]
    async fn prompt_is_preamble_plus_window() {
        let h = harness(vec![ScriptedReply::text("a1"), ScriptedReply::text("a2")]);
        let coordinator = h.coordinator.with_prompt(Arc::new(StaticPromptProvider::new(
            Some("be kind".into()),
            vec![],
        )));
        let _ = coordinator.submit(request("s1", "q1")).unwrap().wait().await;
        let _ = coordinator.submit(request("s1", "q2")).unwrap().wait().await;

        let prompts = h.generator.prompts();
        assert_eq!(
            prompts[1],
            vec![
                ChatMessage::system("be kind"),
                ChatMessage::user("q1"),
                ChatMessage::assistant("a1"),
                ChatMessage::user("q2"),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn same_stream_jobs_run_in_submission_order() {
        let h = harness(vec![
            ScriptedReply::delayed(Duration::from_secs(5), ScriptedReply::text("slow")),
            ScriptedReply::text("fast"),
        ]);
        let first = h.coordinator.submit(request("s1", "first")).unwrap();
        let second = h.coordinator.submit(request("s1", "second")).unwrap();
        assert_eq!(second.state(), JobState::Queued);

        assert_eq!(second.wait().await, JobState::Completed);
        assert_eq!(first.state(), JobState::Completed);

        let prompts = h.generator.prompts();
        assert_eq!(prompts.len(), 2);
        assert_eq!(
            prompts[1],
            vec![
                ChatMessage::user("first"),
                ChatMessage::assistant("slow"),
                ChatMessage::user("second"),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn different_streams_run_concurrently() {
        let h = harness(vec![
            ScriptedReply::delayed(Duration::from_secs(30), ScriptedReply::text("slow")),
            ScriptedReply::text("fast"),
        ]);
        let slow = h.coordinator.submit(request("a", "x")).unwrap();
        tokio::task::yield_now().await;
        let fast = h.coordinator.submit(request("b", "y")).unwrap();

        assert_eq!(fast.wait().await, JobState::Completed);
        assert_ne!(slow.state(), JobState::Completed);
        assert_eq!(slow.wait().await, JobState::Completed);
    }

    #[tokio::test(start_paused = true)]
    async fn generation_timeout_fails_job() {
        let mut cfg = config();
        cfg.generation_timeout = Duration::from_millis(100);
        let mut h = harness_with(
            vec![ScriptedReply::delayed(
                Duration::from_secs(10),
                ScriptedReply::text("too late"),
            )],
            cfg,
        );
        let state = h.coordinator.submit(request("s1", "hi")).unwrap().wait().await;
        assert_matches!(state, JobState::Failed { ref reason } if reason.contains("timed out"));
        assert_eq!(drain(&mut h.subscription)[0].kind, EventKind::Error);
    }

    #[tokio::test(start_paused = true)]
    async fn chunk_delay_spaces_fragments() {
        let mut cfg = config();
        cfg.chunk_delay = Duration::from_millis(50);
        let h = harness_with(vec![ScriptedReply::text("a b c d")], cfg);
        let start = tokio::time::Instant::now();
        let _ = h.coordinator.submit(request("s1", "hi")).unwrap().wait().await;
        assert!(start.elapsed() >= Duration::from_millis(150));
    }

    #[tokio::test]
    async fn invalid_request_is_rejected_without_job() {
        let h = harness(vec![]);
        let err = h.coordinator.submit(request("s1", "   ")).unwrap_err();
        assert_matches!(
            err,
            RelayError::Validation(ValidationError::EmptyField { field: "message" })
        );
        assert_eq!(h.generator.call_count(), 0);
        assert_eq!(h.coordinator.active_jobs(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn rejects_when_pending_limit_reached() {
        let mut cfg = config();
        cfg.max_pending_jobs = 1;
        let h = harness_with(
            vec![ScriptedReply::delayed(Duration::from_secs(5), ScriptedReply::text("ok"))],
            cfg,
        );
        let first = h.coordinator.submit(request("s1", "a")).unwrap();
        assert_eq!(h.coordinator.active_jobs(), 1);
        assert_matches!(
            h.coordinator.submit(request("s2", "b")),
            Err(RelayError::ServerBusy { pending: 1, max: 1 })
        );
        let _ = first.wait().await;
        assert_eq!(h.coordinator.active_jobs(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn terminate_mid_job_does_not_cancel_it() {
        let h = harness(vec![ScriptedReply::delayed(
            Duration::from_secs(2),
            ScriptedReply::text("still here"),
        )]);
        let handle = h.coordinator.submit(request("s1", "hi")).unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(h.coordinator.terminate(&StreamId::from("s1")));
        assert_eq!(handle.wait().await, JobState::Completed);
        assert_eq!(
            window(&h, "s1"),
            vec![(TurnRole::Assistant, "still here".to_string())]
        );
    }

    #[tokio::test]
    async fn terminate_unknown_stream_is_noop() {
        let h = harness(vec![]);
        assert!(!h.coordinator.terminate(&StreamId::from("ghost")));
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_drains_then_rejects() {
        let h = harness(vec![ScriptedReply::delayed(
            Duration::from_secs(3),
            ScriptedReply::text("done"),
        )]);
        let handle = h.coordinator.submit(request("s1", "hi")).unwrap();
        assert!(h.coordinator.shutdown(Duration::from_secs(10)).await);
        assert_eq!(handle.state(), JobState::Completed);
        assert_matches!(
            h.coordinator.submit(request("s1", "late")),
            Err(RelayError::ShuttingDown)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_times_out_on_stuck_job() {
        let h = harness(vec![ScriptedReply::delayed(
            Duration::from_secs(30),
            ScriptedReply::text("eventually"),
        )]);
        let _handle = h.coordinator.submit(request("s1", "hi")).unwrap();
        assert!(!h.coordinator.shutdown(Duration::from_secs(1)).await);
    }

    #[tokio::test]
    async fn job_completes_without_subscribers() {
        let h = harness(vec![ScriptedReply::text("nobody listening")]);
        drop(h.subscription);
        assert_eq!(h.coordinator.bus().subscriber_count(), 0);
        let state = h.coordinator.submit(request("s1", "hi")).unwrap().wait().await;
        assert_eq!(state, JobState::Completed);
        assert_eq!(h.coordinator.sessions().recent(&StreamId::from("s1")).len(), 2);
    }

    #[derive(Default)]
    struct RecordingObserver {
        records: Mutex<Vec<GenerationRecord>>,
    }

    impl GenerationObserver for RecordingObserver {
        fn record(&self, record: &GenerationRecord) {
            self.records.lock().push(record.clone());
        }
    }

    #[tokio::test]
    async fn observer_sees_every_attempt() {
        let h = harness(vec![
            ScriptedReply::text("fine"),
            ScriptedReply::api_error(429, "slow down"),
        ]);
        let observer = Arc::new(RecordingObserver::default());
        let coordinator = h
            .coordinator
            .with_observer(Arc::clone(&observer) as Arc<dyn GenerationObserver>);
        let _ = coordinator.submit(request("s1", "a")).unwrap().wait().await;
        let _ = coordinator.submit(request("s1", "b")).unwrap().wait().await;

        let records = observer.records.lock();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].output.as_deref(), Ok("fine"));
        assert_eq!(records[0].backend, "scripted");
        assert_eq!(records[0].input, vec![ChatMessage::user("a")]);
        assert!(records[1].output.as_ref().unwrap_err().contains("slow down"));
    }

    struct PanickingGenerator;

    #[async_trait::async_trait]
    impl Generator for PanickingGenerator {
        fn backend(&self) -> &str {
            "panicking"
        }

        fn model(&self) -> &str {
            "none"
        }

        async fn generate(&self, _messages: &[ChatMessage]) -> murmur_llm::GenerationResult<Generation> {
            panic!("backend blew up")
        }
    }

    #[tokio::test]
    async fn panicking_generator_fails_job_and_frees_lane() {
        let bus = Arc::new(EventBus::new(BusConfig::default()));
        let mut subscription = bus.connect(SubscriberId::from("listener"));
        let coordinator = StreamCoordinator::new(
            Arc::new(SessionStore::new(5)),
            bus,
            Arc::new(PanickingGenerator),
            config(),
        );
        let s2 = StreamId::from("s2");
        let _ = coordinator.sessions().append(&s2, TurnRole::User, "earlier");

        let state = coordinator.submit(request("s2", "hi")).unwrap().wait().await;
        assert_matches!(state, JobState::Failed { ref reason } if reason.contains("backend blew up"));
        assert!(!coordinator.sessions().contains(&s2));
        let events = drain(&mut subscription);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, EventKind::Error);

        // The lane is released, so a follow-up job on the same stream still runs.
        let next = tokio::time::timeout(
            Duration::from_secs(5),
            coordinator.submit(request("s2", "again")).unwrap().wait(),
        )
        .await
        .unwrap();
        assert!(next.is_terminal());

        assert!(coordinator.shutdown(Duration::from_secs(5)).await);
        assert_eq!(coordinator.busy_streams(), 0);
        assert_eq!(coordinator.active_jobs(), 0);
    }

    struct PanickingObserver;

    impl GenerationObserver for PanickingObserver {
        fn record(&self, _record: &GenerationRecord) {
            panic!("observer sink unavailable");
        }
    }

    #[tokio::test]
    async fn panicking_observer_does_not_fail_job() {
        let h = harness(vec![ScriptedReply::text("still fine")]);
        let mut subscription = h.subscription;
        let coordinator = h.coordinator.with_observer(Arc::new(PanickingObserver));

        let state = coordinator.submit(request("s1", "hi")).unwrap().wait().await;
        assert_eq!(state, JobState::Completed);
        let kinds: Vec<_> = drain(&mut subscription).iter().map(|e| e.kind).collect();
        assert_eq!(kinds, vec![EventKind::Chunk, EventKind::Chunk, EventKind::Done]);
        assert_eq!(coordinator.sessions().recent(&StreamId::from("s1")).len(), 2);
    }
}
