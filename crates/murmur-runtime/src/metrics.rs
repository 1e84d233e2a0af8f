//! Metric names emitted by the runtime and the HTTP layer.

/// Jobs accepted by the coordinator.
pub const JOBS_SUBMITTED_TOTAL: &str = "jobs_submitted_total";
/// Jobs that reached `Completed`.
pub const JOBS_COMPLETED_TOTAL: &str = "jobs_completed_total";
/// Jobs that reached `Failed`.
pub const JOBS_FAILED_TOTAL: &str = "jobs_failed_total";
/// Jobs queued or running.
pub const JOBS_ACTIVE: &str = "jobs_active";
/// Wall time of one generation attempt.
pub const GENERATION_DURATION_SECONDS: &str = "generation_duration_seconds";
/// Connected subscribers.
pub const BUS_SUBSCRIBERS_ACTIVE: &str = "bus_subscribers_active";
/// Events dropped because a subscriber queue was full.
pub const BUS_BROADCAST_DROPS_TOTAL: &str = "bus_broadcast_drops_total";
/// Subscribers removed by the overflow policy.
pub const BUS_FORCED_DISCONNECTS_TOTAL: &str = "bus_forced_disconnects_total";
/// Live session windows.
pub const SESSIONS_ACTIVE: &str = "sessions_active";
/// HTTP requests served.
pub const HTTP_REQUESTS_TOTAL: &str = "http_requests_total";
