//! Route handlers: submit, subscribe, terminate, health, metrics.

use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::http::{StatusCode, header};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use futures::Stream;
use murmur_core::{JobId, RelayError, StreamId, SubmitRequest, SubscriberId, TerminateRequest};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use tracing::{info, instrument};

use crate::error::ApiError;
use crate::health::{HealthCounters, HealthResponse, health_check};
use crate::server::AppState;
use crate::sse::event_stream;

/// Body of a successful `POST /chats`.
#[derive(Debug, Serialize, Deserialize)]
pub struct SubmitAccepted {
    /// Always `"accepted"`.
    pub status: String,
    /// Job created for the submission.
    pub job_id: JobId,
    /// Stream the job belongs to.
    pub stream_id: StreamId,
}

/// Body of a successful `POST /chats/terminate`.
#[derive(Debug, Serialize, Deserialize)]
pub struct Terminated {
    /// Always `"terminated"`.
    pub status: String,
    /// Stream whose window was discarded.
    pub stream_id: StreamId,
}

/// Query of `GET /chats/stream`.
#[derive(Debug, Default, Deserialize)]
pub struct SubscribeParams {
    /// Subscriber identity; generated when absent.
    #[serde(default)]
    pub subscriber_id: Option<String>,
}

/// `POST /chats`: queue a job and acknowledge immediately.
#[instrument(skip_all)]
pub async fn submit(
    State(state): State<AppState>,
    body: Result<Json<SubmitRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<SubmitAccepted>), ApiError> {
    let Json(request) = body?;
    let handle = state.coordinator.submit(request)?;
    Ok((
        StatusCode::ACCEPTED,
        Json(SubmitAccepted {
            status: "accepted".into(),
            job_id: handle.job_id().clone(),
            stream_id: handle.stream_id().clone(),
        }),
    ))
}

/// `GET /chats/stream`: long-lived SSE subscription.
#[instrument(skip_all)]
pub async fn subscribe(
    State(state): State<AppState>,
    params: Result<Query<SubscribeParams>, QueryRejection>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    let Query(params) = params?;
    if state.shutdown.is_shutting_down() {
        return Err(RelayError::ShuttingDown.into());
    }
    let id = params
        .subscriber_id
        .filter(|s| !s.trim().is_empty())
        .map_or_else(SubscriberId::new, SubscriberId::from);

    let subscription = state.bus.connect(id.clone());
    info!(subscriber_id = %id, "subscriber attached");
    Ok(Sse::new(event_stream(subscription)).keep_alive(KeepAlive::new().interval(state.keep_alive)))
}

/// `POST /chats/terminate`: discard a stream's window.
#[instrument(skip_all)]
pub async fn terminate(
    State(state): State<AppState>,
    body: Result<Json<TerminateRequest>, JsonRejection>,
) -> Result<Json<Terminated>, ApiError> {
    let Json(request) = body?;
    request.validate().map_err(RelayError::from)?;
    let _ = state.coordinator.terminate(&request.stream_id);
    Ok(Json(Terminated {
        status: "terminated".into(),
        stream_id: request.stream_id,
    }))
}

/// `GET /health`.
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let counters = HealthCounters {
        subscribers: state.bus.subscriber_count(),
        sessions: state.coordinator.sessions().len(),
        active_jobs: state.coordinator.active_jobs(),
        busy_streams: state.coordinator.busy_streams(),
        draining: !state.coordinator.is_accepting(),
    };
    Json(health_check(state.start_time, counters))
}

/// `GET /metrics`: Prometheus text exposition.
pub async fn metrics(State(state): State<AppState>) -> Response {
    match &state.metrics {
        Some(handle) => (
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            crate::metrics::render(handle),
        )
            .into_response(),
        None => (StatusCode::NOT_FOUND, "metrics recorder not installed").into_response(),
    }
}
