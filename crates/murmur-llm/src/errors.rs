//! Generation error types.

use murmur_core::RelayError;

/// Result type alias for generation operations.
pub type GenerationResult<T> = Result<T, GenerationError>;

/// Errors raised by a [`Generator`](crate::Generator).
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    /// HTTP request failed before a response arrived.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Response body was not the expected JSON.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Backend answered with a non-success status.
    #[error("API error ({status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Response body or extracted error message.
        message: String,
    },

    /// Backend answered but produced no usable text.
    #[error("empty response from backend")]
    EmptyResponse,

    /// No response within the allotted time.
    #[error("generation timed out after {after_ms}ms")]
    Timeout {
        /// Elapsed budget in milliseconds.
        after_ms: u64,
    },

    /// Backend could not be constructed or called as configured.
    #[error("configuration error: {0}")]
    Config(String),

    /// Backend panicked while producing a reply.
    #[error("generator panicked: {0}")]
    Panicked(String),
}

impl GenerationError {
    /// Error category string for logs and error events.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Http(_) => "network",
            Self::Json(_) => "parse",
            Self::Api { .. } => "api",
            Self::EmptyResponse => "empty_response",
            Self::Timeout { .. } => "timeout",
            Self::Config(_) => "config",
            Self::Panicked(_) => "panic",
        }
    }

    /// Whether a retry could plausibly succeed. The relay itself never retries.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Http(e) => e.is_timeout() || e.is_connect(),
            Self::Api { status, .. } => *status == 429 || *status >= 500,
            Self::Timeout { .. } => true,
            Self::Json(_) | Self::EmptyResponse | Self::Config(_) | Self::Panicked(_) => false,
        }
    }
}

impl From<GenerationError> for RelayError {
    fn from(err: GenerationError) -> Self {
        Self::Generation {
            category: err.category().to_string(),
            message: err.to_string(),
        }
    }
}
