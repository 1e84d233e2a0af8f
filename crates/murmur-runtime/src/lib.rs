//! # murmur-runtime
//!
//! The relay's in-process core.
//!
//! - [`SessionStore`]: bounded per-stream conversation windows
//! - [`EventBus`]: fan-out of stream events to connected subscribers
//! - [`StreamCoordinator`]: turns each submission into a job that generates a
//!   reply and publishes it as ordered chunk events
//! - [`PromptProvider`] and [`GenerationObserver`]: seams for the prompt
//!   preamble and per-generation records

#![deny(unsafe_code)]

pub mod bus;
pub mod coordinator;
pub mod metrics;
pub mod observer;
pub mod prompt;
pub mod session;

pub use bus::{BroadcastReport, BusConfig, EventBus, OverflowPolicy, Subscription};
pub use coordinator::{CoordinatorConfig, JobHandle, JobState, StreamCoordinator};
pub use observer::{GenerationObserver, GenerationRecord, TracingObserver};
pub use prompt::{PromptProvider, StaticPromptProvider, load_preamble};
pub use session::SessionStore;
