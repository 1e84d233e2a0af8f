//! Job lifecycle states and the submitter's handle.

use murmur_core::{JobId, StreamId};
use serde::Serialize;
use tokio::sync::watch;

/// Lifecycle of one submission.
///
/// `Queued → Generating → Publishing → Completed`, or `Failed` from any
/// non-terminal state.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum JobState {
    /// Accepted, waiting for earlier jobs on the same stream.
    Queued,
    /// Waiting on the generator.
    Generating,
    /// Broadcasting reply fragments.
    Publishing,
    /// Reply published and recorded.
    Completed,
    /// Aborted; the stream's window was discarded.
    Failed {
        /// Human-readable cause.
        reason: String,
    },
}

impl JobState {
    /// Whether no further transitions will happen.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed { .. })
    }

    /// Short label for logs.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Generating => "generating",
            Self::Publishing => "publishing",
            Self::Completed => "completed",
            Self::Failed { .. } => "failed",
        }
    }
}

/// Returned by `submit`. Dropping it does not affect the job.
#[derive(Debug)]
pub struct JobHandle {
    job_id: JobId,
    stream_id: StreamId,
    state: watch::Receiver<JobState>,
}

impl JobHandle {
    pub(crate) fn new(job_id: JobId, stream_id: StreamId, state: watch::Receiver<JobState>) -> Self {
        Self {
            job_id,
            stream_id,
            state,
        }
    }

    /// Job identity.
    pub fn job_id(&self) -> &JobId {
        &self.job_id
    }

    /// Stream the job belongs to.
    pub fn stream_id(&self) -> &StreamId {
        &self.stream_id
    }

    /// Current state.
    pub fn state(&self) -> JobState {
        self.state.borrow().clone()
    }

    /// Wait for a terminal state.
    pub async fn wait(mut self) -> JobState {
        let terminal = self
            .state
            .wait_for(JobState::is_terminal)
            .await
            .map(|s| s.clone());
        terminal.unwrap_or_else(|_| self.state.borrow().clone())
    }
}
