//! Inbound request bodies and their validation.

use serde::{Deserialize, Serialize};

use crate::errors::ValidationError;
use crate::ids::StreamId;

/// Default maximum message length in characters.
pub const DEFAULT_MAX_MESSAGE_CHARS: usize = 4_000;

/// A message submitted to a stream.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitRequest {
    /// Target stream (chat room).
    pub stream_id: StreamId,
    /// Submitting user.
    pub user_id: String,
    /// Display name of the submitting user.
    pub display_name: String,
    /// Group / cohort label of the submitting user.
    #[serde(default)]
    pub group_label: String,
    /// Message text.
    pub message: String,
    /// Client-side creation time (ISO 8601).
    pub timestamp: String,
}

impl SubmitRequest {
    /// Check required fields, message length, and timestamp format.
    pub fn validate(&self, max_message_chars: usize) -> Result<(), ValidationError> {
        require_non_empty("stream_id", self.stream_id.as_str())?;
        require_non_empty("user_id", &self.user_id)?;
        require_non_empty("display_name", &self.display_name)?;
        require_non_empty("message", &self.message)?;
        require_non_empty("timestamp", &self.timestamp)?;

        let chars = self.message.chars().count();
        if chars > max_message_chars {
            return Err(ValidationError::TooLong {
                field: "message",
                max: max_message_chars,
                actual: chars,
            });
        }

        if !is_iso_timestamp(&self.timestamp) {
            return Err(ValidationError::InvalidTimestamp {
                value: self.timestamp.clone(),
            });
        }
        Ok(())
    }
}

/// Request to discard a stream's window.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerminateRequest {
    /// Stream to discard.
    pub stream_id: StreamId,
}

impl TerminateRequest {
    /// Check that the stream ID is present.
    pub fn validate(&self) -> Result<(), ValidationError> {
        require_non_empty("stream_id", self.stream_id.as_str())
    }
}

fn require_non_empty(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        Err(ValidationError::EmptyField { field })
    } else {
        Ok(())
    }
}

/// Accept RFC 3339 or a naive ISO 8601 date-time (`2025-05-01T12:00:00[.fff]`).
fn is_iso_timestamp(value: &str) -> bool {
    chrono::DateTime::parse_from_rfc3339(value).is_ok()
        || chrono::NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f").is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn request() -> SubmitRequest {
        SubmitRequest {
            stream_id: StreamId::from("room-1"),
            user_id: "u-7".into(),
            display_name: "mina".into(),
            group_label: "cohort-2".into(),
            message: "hi".into(),
            timestamp: "2025-05-01T12:00:00Z".into(),
        }
    }

    #[test]
    fn valid_request_passes() {
        assert!(request().validate(DEFAULT_MAX_MESSAGE_CHARS).is_ok());
    }

    #[test]
    fn naive_timestamp_passes() {
        let mut req = request();
        req.timestamp = "2025-05-01T12:00:00.123".into();
        assert!(req.validate(DEFAULT_MAX_MESSAGE_CHARS).is_ok());
    }

    #[test]
    fn blank_message_rejected() {
        let mut req = request();
        req.message = "   ".into();
        assert_matches!(
            req.validate(DEFAULT_MAX_MESSAGE_CHARS),
            Err(ValidationError::EmptyField { field: "message" })
        );
    }

    #[test]
    fn empty_stream_id_rejected() {
        let mut req = request();
        req.stream_id = StreamId::from("");
        assert_matches!(
            req.validate(DEFAULT_MAX_MESSAGE_CHARS),
            Err(ValidationError::EmptyField { field: "stream_id" })
        );
    }

    #[test]
    fn long_message_rejected_by_chars_not_bytes() {
        let mut req = request();
        // 3 chars, 9 bytes
        req.message = "안녕하".into();
        assert!(req.validate(3).is_ok());
        assert_matches!(
            req.validate(2),
            Err(ValidationError::TooLong {
                max: 2,
                actual: 3,
                ..
            })
        );
    }

    #[test]
    fn garbage_timestamp_rejected() {
        let mut req = request();
        req.timestamp = "yesterday".into();
        assert_matches!(
            req.validate(DEFAULT_MAX_MESSAGE_CHARS),
            Err(ValidationError::InvalidTimestamp { .. })
        );
    }

    #[test]
    fn group_label_defaults_when_missing() {
        let json = r#"{"stream_id":"s1","user_id":"u","display_name":"d","message":"m","timestamp":"2025-05-01T12:00:00Z"}"#;
        let req: SubmitRequest = serde_json::from_str(json).unwrap();
        assert!(req.group_label.is_empty());
        assert!(req.validate(DEFAULT_MAX_MESSAGE_CHARS).is_ok());
    }

    #[test]
    fn terminate_requires_stream_id() {
        let req = TerminateRequest {
            stream_id: StreamId::from(" "),
        };
        assert!(req.validate().is_err());
        let req = TerminateRequest {
            stream_id: StreamId::from("s1"),
        };
        assert!(req.validate().is_ok());
    }
}
