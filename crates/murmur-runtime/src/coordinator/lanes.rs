//! Per-stream FIFO ordering of jobs.
//!
//! Each stream keeps the completion signal of its most recently submitted
//! job. A new job takes that signal as its predecessor and waits on it, so
//! jobs for one stream run one at a time in submission order while different
//! streams proceed independently.

use std::collections::HashMap;

use murmur_core::{JobId, StreamId};
use parking_lot::Mutex;
use tokio::sync::oneshot;

struct Tail {
    job_id: JobId,
    done: oneshot::Receiver<()>,
}

/// Lane registry keyed by stream.
#[derive(Default)]
pub(crate) struct StreamLanes {
    tails: Mutex<HashMap<StreamId, Tail>>,
}

/// A job's place in its stream's lane.
pub(crate) struct LaneTicket {
    stream_id: StreamId,
    job_id: JobId,
    predecessor: Option<oneshot::Receiver<()>>,
    done: oneshot::Sender<()>,
}

impl LaneTicket {
    /// Wait until every earlier job on the stream has finished.
    pub(crate) async fn wait_turn(&mut self) {
        if let Some(prev) = self.predecessor.as_mut() {
            // Err means the predecessor's sender dropped, which is also "finished".
            let _ = prev.await;
            self.predecessor = None;
        }
    }

    /// Whether an earlier job was still pending at submission.
    pub(crate) fn has_predecessor(&self) -> bool {
        self.predecessor.is_some()
    }
}

impl StreamLanes {
    /// Join the back of `stream_id`'s lane.
    pub(crate) fn enter(&self, stream_id: &StreamId, job_id: &JobId) -> LaneTicket {
        let (done, rx) = oneshot::channel();
        let predecessor = self
            .tails
            .lock()
            .insert(
                stream_id.clone(),
                Tail {
                    job_id: job_id.clone(),
                    done: rx,
                },
            )
            .map(|t| t.done);
        LaneTicket {
            stream_id: stream_id.clone(),
            job_id: job_id.clone(),
            predecessor,
            done,
        }
    }

    /// Signal the successor and drop the lane if this job was its last member.
    pub(crate) fn leave(&self, ticket: LaneTicket) {
        let LaneTicket {
            stream_id,
            job_id,
            done,
            ..
        } = ticket;
        let _ = done.send(());
        let mut tails = self.tails.lock();
        if tails.get(&stream_id).is_some_and(|t| t.job_id == job_id) {
            let _ = tails.remove(&stream_id);
        }
    }

    /// Streams with a queued or running job.
    pub(crate) fn busy_streams(&self) -> usize {
        self.tails.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn first_job_runs_immediately() {
        let lanes = StreamLanes::default();
        let mut t = lanes.enter(&StreamId::from("s1"), &JobId::new());
        assert!(!t.has_predecessor());
        t.wait_turn().await;
        lanes.leave(t);
        assert_eq!(lanes.busy_streams(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn second_job_waits_for_first() {
        let lanes = StreamLanes::default();
        let s = StreamId::from("s1");
        let first = lanes.enter(&s, &JobId::new());
        let mut second = lanes.enter(&s, &JobId::new());
        assert!(second.has_predecessor());

        let blocked = tokio::time::timeout(Duration::from_secs(1), second.wait_turn()).await;
        assert!(blocked.is_err());

        lanes.leave(first);
        assert_eq!(lanes.busy_streams(), 1);
        tokio::time::timeout(Duration::from_secs(1), second.wait_turn())
            .await
            .unwrap();
        lanes.leave(second);
        assert_eq!(lanes.busy_streams(), 0);
    }

    #[tokio::test]
    async fn streams_are_independent() {
        let lanes = StreamLanes::default();
        let _a = lanes.enter(&StreamId::from("a"), &JobId::new());
        let b = lanes.enter(&StreamId::from("b"), &JobId::new());
        assert!(!b.has_predecessor());
        assert_eq!(lanes.busy_streams(), 2);
    }
}
