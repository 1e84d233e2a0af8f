//! # murmur-core
//!
//! Foundation types, errors, branded IDs, and utilities for the Murmur relay.
//!
//! This crate provides the shared vocabulary that all other Murmur crates depend on:
//!
//! - **Branded IDs**: [`ids::StreamId`], [`ids::SubscriberId`], [`ids::JobId`] as newtypes
//! - **Messages**: [`messages::Turn`] (one role-tagged entry of a session window) and
//!   [`messages::ChatMessage`] (the `{role, content}` shape sent to a generator)
//! - **Events**: [`events::StreamEvent`] broadcast to subscribers (`connect`, `stream`, `done`, `error`)
//! - **Requests**: [`requests::SubmitRequest`] / [`requests::TerminateRequest`] with validation
//! - **Errors**: [`errors::RelayError`] hierarchy via `thiserror`
//! - **Text**: reply segmentation and UTF-8–safe truncation
//! - **Logging**: [`logging::init_subscriber`] for the global `tracing` subscriber
//!
//! ## Crate Position
//!
//! Foundation crate. Depended on by all other murmur crates.

#![deny(unsafe_code)]

pub mod errors;
pub mod events;
pub mod ids;
pub mod logging;
pub mod messages;
pub mod requests;
pub mod text;

pub use errors::{RelayError, ValidationError};
pub use events::{EventKind, StreamEvent};
pub use ids::{JobId, StreamId, SubscriberId};
pub use logging::LogFormat;
pub use messages::{ChatMessage, Role, Turn, TurnRole};
pub use requests::{SubmitRequest, TerminateRequest};
