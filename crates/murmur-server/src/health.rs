//! `/health` endpoint.

use std::time::Instant;

use serde::{Deserialize, Serialize};

/// Health check response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// `"ok"` while accepting submissions, `"draining"` during shutdown.
    pub status: String,
    /// Seconds since the server started.
    pub uptime_secs: u64,
    /// Connected subscribers.
    pub subscribers: usize,
    /// Live session windows.
    pub sessions: usize,
    /// Jobs queued or running.
    pub active_jobs: usize,
    /// Streams with a queued or running job.
    pub busy_streams: usize,
}

/// Live counters reported by `/health`.
#[derive(Clone, Copy, Debug, Default)]
pub struct HealthCounters {
    /// Connected subscribers.
    pub subscribers: usize,
    /// Live session windows.
    pub sessions: usize,
    /// Jobs queued or running.
    pub active_jobs: usize,
    /// Streams with a queued or running job.
    pub busy_streams: usize,
    /// Whether shutdown has begun.
    pub draining: bool,
}

/// Build a health response from live counters.
pub fn health_check(start_time: Instant, counters: HealthCounters) -> HealthResponse {
    HealthResponse {
        status: if counters.draining { "draining" } else { "ok" }.into(),
        uptime_secs: start_time.elapsed().as_secs(),
        subscribers: counters.subscribers,
        sessions: counters.sessions,
        active_jobs: counters.active_jobs,
        busy_streams: counters.busy_streams,
    }
}
