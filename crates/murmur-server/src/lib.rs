//! # murmur-server
//!
//! Axum HTTP surface for the Murmur relay.
//!
//! - `POST /chats`: submit a message; acknowledged before generation runs
//! - `GET /chats/stream`: SSE subscription delivering `connect`, `stream`,
//!   `done`, and `error` events
//! - `POST /chats/terminate`: discard a stream's conversation window
//! - `GET /health`, `GET /metrics`: liveness counters and Prometheus text
//! - Graceful shutdown: drain in-flight jobs, then close subscriber streams

#![deny(unsafe_code)]

pub mod error;
pub mod handlers;
pub mod health;
pub mod metrics;
pub mod server;
pub mod shutdown;
pub mod sse;

pub use error::{ApiError, ErrorResponse};
pub use server::{AppState, MurmurServer};
pub use shutdown::ShutdownCoordinator;
