//! HTTP error mapping with structured `{error, message}` bodies.

use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use murmur_core::RelayError;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

/// Error returned by HTTP handlers.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Relay-level failure.
    #[error(transparent)]
    Relay(#[from] RelayError),

    /// Body or query string could not be decoded.
    #[error("malformed request: {0}")]
    Malformed(String),

    /// Body exceeds the configured limit.
    #[error("request body too large: {0}")]
    TooLarge(String),
}

impl ApiError {
    /// HTTP status for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Malformed(_) | Self::Relay(RelayError::Validation(_)) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            Self::Relay(RelayError::ServerBusy { .. } | RelayError::ShuttingDown) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            Self::Relay(RelayError::Generation { .. }) => StatusCode::BAD_GATEWAY,
            Self::Relay(RelayError::Delivery { .. } | RelayError::Internal(_)) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            Self::TooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
        }
    }

    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Relay(err) => err.code(),
            Self::Malformed(_) => "validation_error",
            Self::TooLarge(_) => "payload_too_large",
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            Self::TooLarge(rejection.body_text())
        } else {
            Self::Malformed(rejection.body_text())
        }
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::Malformed(rejection.body_text())
    }
}

/// Error response body.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Machine-readable code.
    pub error: String,
    /// Human-readable description.
    pub message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.code();
        let message = self.to_string();

        if status.is_server_error() {
            if status == StatusCode::SERVICE_UNAVAILABLE {
                warn!(error_code = code, %message, "service unavailable");
            } else {
                error!(error_code = code, %message, "request failed");
            }
        } else {
            debug!(error_code = code, %message, "client error");
        }

        let body = ErrorResponse {
            error: code.to_owned(),
            message,
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use murmur_core::ValidationError;

    #[test]
    fn validation_maps_to_422() {
        let err = ApiError::from(RelayError::from(ValidationError::EmptyField {
            field: "message",
        }));
        assert_eq!(err.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(err.code(), "validation_error");
    }

    #[test]
    fn busy_and_shutdown_map_to_503() {
        let busy = ApiError::from(RelayError::ServerBusy { pending: 4, max: 4 });
        assert_eq!(busy.status_code(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(busy.code(), "server_busy");
        let closing = ApiError::from(RelayError::ShuttingDown);
        assert_eq!(closing.status_code(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn internal_maps_to_500() {
        let err = ApiError::from(RelayError::Internal("boom".into()));
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn body_has_error_and_message() {
        let resp = ApiError::Malformed("missing field `stream_id`".into()).into_response();
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let bytes = axum::body::to_bytes(resp.into_body(), 10_000).await.unwrap();
        let body: ErrorResponse = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body.error, "validation_error");
        assert!(body.message.contains("stream_id"));
    }
}
