//! `MurmurServer`: axum router and serve loop.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::Router;
use axum::http::{HeaderValue, Method, header};
use axum::middleware;
use axum::routing::{get, post};
use metrics_exporter_prometheus::PrometheusHandle;
use murmur_runtime::{EventBus, StreamCoordinator};
use murmur_settings::ServerSettings;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::{Level, info, warn};

use crate::handlers;
use crate::shutdown::ShutdownCoordinator;

/// Default SSE keep-alive interval.
pub const DEFAULT_KEEP_ALIVE: Duration = Duration::from_secs(15);

/// Shared state accessible from axum handlers.
#[derive(Clone)]
pub struct AppState {
    /// Job coordinator.
    pub coordinator: Arc<StreamCoordinator>,
    /// Event bus the coordinator publishes to.
    pub bus: Arc<EventBus>,
    /// Shutdown coordinator.
    pub shutdown: Arc<ShutdownCoordinator>,
    /// Prometheus handle, when a recorder is installed.
    pub metrics: Option<PrometheusHandle>,
    /// When the server started.
    pub start_time: Instant,
    /// SSE keep-alive interval.
    pub keep_alive: Duration,
}

/// The Murmur HTTP server.
pub struct MurmurServer {
    settings: ServerSettings,
    coordinator: Arc<StreamCoordinator>,
    shutdown: Arc<ShutdownCoordinator>,
    metrics: Option<PrometheusHandle>,
    keep_alive: Duration,
    start_time: Instant,
}

impl MurmurServer {
    /// Create a server around a coordinator.
    pub fn new(settings: ServerSettings, coordinator: Arc<StreamCoordinator>) -> Self {
        Self {
            settings,
            coordinator,
            shutdown: Arc::new(ShutdownCoordinator::new()),
            metrics: None,
            keep_alive: DEFAULT_KEEP_ALIVE,
            start_time: Instant::now(),
        }
    }

    /// Serve `/metrics` from `handle`.
    #[must_use]
    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }

    /// SSE keep-alive interval.
    #[must_use]
    pub fn with_keep_alive(mut self, interval: Duration) -> Self {
        self.keep_alive = interval;
        self
    }

    /// Server settings.
    pub fn settings(&self) -> &ServerSettings {
        &self.settings
    }

    /// Job coordinator.
    pub fn coordinator(&self) -> &Arc<StreamCoordinator> {
        &self.coordinator
    }

    /// Shutdown coordinator.
    pub fn shutdown(&self) -> &Arc<ShutdownCoordinator> {
        &self.shutdown
    }

    fn state(&self) -> AppState {
        AppState {
            coordinator: Arc::clone(&self.coordinator),
            bus: Arc::clone(self.coordinator.bus()),
            shutdown: Arc::clone(&self.shutdown),
            metrics: self.metrics.clone(),
            start_time: self.start_time,
            keep_alive: self.keep_alive,
        }
    }

    /// Build the axum router with all routes and layers.
    pub fn router(&self) -> Router {
        let trace_layer = TraceLayer::new_for_http()
            .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
            .on_response(DefaultOnResponse::new().level(Level::DEBUG));

        Router::new()
            .route("/chats", post(handlers::submit))
            .route("/chats/stream", get(handlers::subscribe))
            .route("/chats/terminate", post(handlers::terminate))
            .route("/health", get(handlers::health))
            .route("/metrics", get(handlers::metrics))
            .route_layer(middleware::from_fn(crate::metrics::track_requests))
            .with_state(self.state())
            .layer(RequestBodyLimitLayer::new(self.settings.max_body_bytes))
            .layer(build_cors_layer(&self.settings.cors_origins))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(trace_layer)
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
    }

    /// Bind the configured host and port.
    pub async fn bind(&self) -> std::io::Result<TcpListener> {
        TcpListener::bind((self.settings.host.as_str(), self.settings.port)).await
    }

    /// Serve until `signal` resolves, then drain jobs and close subscriber
    /// streams before returning.
    pub async fn serve<F>(self, listener: TcpListener, signal: F) -> std::io::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let router = self.router();
        let addr = listener.local_addr()?;
        info!(%addr, "murmur server listening");

        let coordinator = Arc::clone(&self.coordinator);
        let shutdown = Arc::clone(&self.shutdown);
        let grace = Duration::from_millis(self.settings.shutdown_timeout_ms);

        axum::serve(listener, router)
            .with_graceful_shutdown(async move {
                signal.await;
                let bus = Arc::clone(coordinator.bus());
                let _ = shutdown.drain(&coordinator, &bus, grace).await;
            })
            .await?;
        info!("murmur server stopped");
        Ok(())
    }
}

/// CORS for the configured origins; an empty list allows any origin.
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    if origins.is_empty() {
        return CorsLayer::permissive();
    }
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| {
            origin.parse::<HeaderValue>().ok().or_else(|| {
                warn!(%origin, "CORS: invalid origin in settings");
                None
            })
        })
        .collect();
    info!(origins = allowed.len(), "CORS: allowing configured origins");
    CorsLayer::new()
        .allow_origin(allowed)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            header::CONTENT_TYPE,
            header::ACCEPT,
            header::AUTHORIZATION,
            header::CACHE_CONTROL,
        ])
        .allow_credentials(true)
}
