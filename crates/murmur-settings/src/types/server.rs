//! Server, session, bus, coordinator, and logging settings.

use murmur_core::LogFormat;
use serde::{Deserialize, Serialize};

/// HTTP server settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerSettings {
    /// Bind address.
    pub host: String,
    /// Listen port.
    pub port: u16,
    /// Maximum request body size in bytes.
    pub max_body_bytes: usize,
    /// Origins allowed by CORS. Empty allows any origin.
    pub cors_origins: Vec<String>,
    /// Upper bound on graceful shutdown, in milliseconds.
    pub shutdown_timeout_ms: u64,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            max_body_bytes: 64 * 1024,
            cors_origins: vec![
                "http://www.kakaobase.com".to_string(),
                "https://www.kakaobase.com".to_string(),
                "http://localhost:8080".to_string(),
                "http://localhost:3000".to_string(),
            ],
            shutdown_timeout_ms: 10_000,
        }
    }
}

/// Session window settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SessionSettings {
    /// Number of raw turns (user and assistant each count one) kept per stream.
    pub capacity: usize,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self { capacity: 5 }
    }
}

/// What the bus does when a subscriber's queue is full.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverflowMode {
    /// Disconnect the subscriber on the first full-queue delivery.
    #[default]
    Disconnect,
    /// Drop the event; disconnect once `maxDrops` events have been dropped.
    Tolerate,
}

/// Event bus settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BusSettings {
    /// Per-subscriber queue capacity (events).
    pub queue_capacity: usize,
    /// Full-queue policy.
    pub overflow: OverflowMode,
    /// Drops tolerated before disconnect under [`OverflowMode::Tolerate`].
    pub max_drops: u64,
    /// SSE keep-alive comment interval in seconds.
    pub keep_alive_secs: u64,
}

impl Default for BusSettings {
    fn default() -> Self {
        Self {
            queue_capacity: 256,
            overflow: OverflowMode::Disconnect,
            max_drops: 100,
            keep_alive_secs: 15,
        }
    }
}

/// Job coordinator settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CoordinatorSettings {
    /// Upper bound on one generation call, in milliseconds.
    pub generation_timeout_ms: u64,
    /// Pause between published chunks, in milliseconds.
    pub chunk_delay_ms: u64,
    /// Maximum queued plus running jobs.
    pub max_pending_jobs: usize,
    /// Maximum submitted message length in characters.
    pub max_message_chars: usize,
}

impl Default for CoordinatorSettings {
    fn default() -> Self {
        Self {
            generation_timeout_ms: 60_000,
            chunk_delay_ms: 50,
            max_pending_jobs: 64,
            max_message_chars: murmur_core::requests::DEFAULT_MAX_MESSAGE_CHARS,
        }
    }
}

/// Logging settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingSettings {
    /// Default level filter (`RUST_LOG` overrides).
    pub level: String,
    /// Output format.
    pub format: LogFormat,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Compact,
        }
    }
}
