//! Settings type definitions.
//!
//! All types use `#[serde(rename_all = "camelCase", default)]`: partial JSON is
//! accepted and missing fields keep their compiled default.

mod generator;
mod server;

pub use generator::*;
pub use server::*;

use serde::{Deserialize, Serialize};

use crate::errors::{Result, SettingsError};

/// Root settings for the relay.
///
/// ```json
/// {
///   "server": { "port": 9000 },
///   "generator": { "mode": "managed-api" },
///   "bus": { "overflow": "tolerate", "maxDrops": 20 }
/// }
/// ```
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MurmurSettings {
    /// HTTP server.
    pub server: ServerSettings,
    /// Session windows.
    pub session: SessionSettings,
    /// Event bus.
    pub bus: BusSettings,
    /// Job coordinator.
    pub coordinator: CoordinatorSettings,
    /// Generation backend.
    pub generator: GeneratorSettings,
    /// Prompt framing.
    pub prompt: PromptSettings,
    /// Logging.
    pub logging: LoggingSettings,
}

impl MurmurSettings {
    /// Reject values the runtime cannot operate with.
    pub fn validate(&self) -> Result<()> {
        let checks = [
            (self.session.capacity == 0, "session.capacity must be at least 1"),
            (self.bus.queue_capacity == 0, "bus.queueCapacity must be at least 1"),
            (
                self.coordinator.max_pending_jobs == 0,
                "coordinator.maxPendingJobs must be at least 1",
            ),
            (
                self.coordinator.generation_timeout_ms == 0,
                "coordinator.generationTimeoutMs must be positive",
            ),
            (
                self.coordinator.max_message_chars == 0,
                "coordinator.maxMessageChars must be at least 1",
            ),
        ];
        match checks.iter().find(|(bad, _)| *bad) {
            Some((_, msg)) => Err(SettingsError::InvalidValue((*msg).to_string())),
            None => Ok(()),
        }
    }
}
