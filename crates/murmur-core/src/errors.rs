//! Error hierarchy for the relay.
//!
//! - [`ValidationError`]: malformed submission, rejected before a job exists
//! - [`RelayError`]: top-level enum covering validation, generation, delivery,
//!   and capacity failures
//!
//! A missing session is not an error: reading an unknown stream yields an
//! empty window.

use thiserror::Error;

/// A submission that failed validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required field was empty or whitespace-only.
    #[error("field '{field}' must not be empty")]
    EmptyField {
        /// Field name.
        field: &'static str,
    },

    /// A field exceeded its maximum length (in characters).
    #[error("field '{field}' is too long ({actual} > {max} characters)")]
    TooLong {
        /// Field name.
        field: &'static str,
        /// Maximum allowed characters.
        max: usize,
        /// Actual characters.
        actual: usize,
    },

    /// The submission timestamp could not be parsed.
    #[error("invalid timestamp '{value}': expected ISO 8601 / RFC 3339")]
    InvalidTimestamp {
        /// Offending value.
        value: String,
    },
}

/// Top-level error type for the relay.
#[derive(Debug, Error)]
pub enum RelayError {
    /// Submission rejected synchronously.
    #[error("{0}")]
    Validation(#[from] ValidationError),

    /// Backend failure or empty result inside a job.
    #[error("generation failed ({category}): {message}")]
    Generation {
        /// Error category (`network`, `api`, `timeout`, ...).
        category: String,
        /// Human-readable description.
        message: String,
    },

    /// A subscriber's channel is gone or full. Never aborts a broadcast.
    #[error("delivery to subscriber '{subscriber_id}' failed: {reason}")]
    Delivery {
        /// Target subscriber.
        subscriber_id: String,
        /// Why delivery failed.
        reason: String,
    },

    /// Too many jobs queued or running.
    #[error("server busy: {pending} jobs pending (max {max})")]
    ServerBusy {
        /// Jobs currently queued or running.
        pending: usize,
        /// Configured limit.
        max: usize,
    },

    /// The coordinator no longer accepts submissions.
    #[error("relay is shutting down")]
    ShuttingDown,

    /// Unexpected internal failure.
    #[error("internal error: {0}")]
    Internal(String),
}

impl RelayError {
    /// Stable machine-readable code for wire responses and logs.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation_error",
            Self::Generation { .. } => "generation_error",
            Self::Delivery { .. } => "delivery_error",
            Self::ServerBusy { .. } => "server_busy",
            Self::ShuttingDown => "shutting_down",
            Self::Internal(_) => "internal_error",
        }
    }

    /// Whether the error is the caller's fault.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}
