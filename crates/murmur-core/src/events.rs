//! Events fanned out to subscribers.
//!
//! A [`StreamEvent`] carries a kind and a flat payload
//! `{stream_id, message, timestamp}`. Every connected subscriber receives every
//! event; consumers filter on `stream_id`.
//!
//! On the wire (SSE) an event is framed as `event: <name>\ndata: <json>\n\n`
//! with `<name>` from [`EventKind::sse_name`].

use serde::{Deserialize, Serialize};

use crate::ids::StreamId;

/// Event kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    /// Connection confirmation, sent once to a new subscriber.
    Connect,
    /// One fragment of a generated reply.
    Chunk,
    /// A reply finished publishing.
    Done,
    /// A job failed.
    Error,
}

impl EventKind {
    /// SSE `event:` field value.
    pub fn sse_name(self) -> &'static str {
        match self {
            Self::Connect => "connect",
            Self::Chunk => "stream",
            Self::Done => "done",
            Self::Error => "error",
        }
    }
}

/// JSON body of an event.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventPayload {
    /// Stream the event belongs to (`null` for connection confirmations).
    pub stream_id: Option<StreamId>,
    /// Fragment text, error message, or `null`.
    pub message: Option<String>,
    /// RFC 3339 creation time.
    pub timestamp: String,
}

/// An event broadcast to every connected subscriber.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StreamEvent {
    /// Event kind.
    pub kind: EventKind,
    /// Event body.
    pub payload: EventPayload,
}

impl StreamEvent {
    fn now(kind: EventKind, stream_id: Option<StreamId>, message: Option<String>) -> Self {
        Self {
            kind,
            payload: EventPayload {
                stream_id,
                message,
                timestamp: chrono::Utc::now().to_rfc3339(),
            },
        }
    }

    /// Connection confirmation for a new subscriber.
    pub fn connect() -> Self {
        Self::now(EventKind::Connect, None, Some("connected".into()))
    }

    /// Reply fragment for a stream.
    pub fn chunk(stream_id: &StreamId, fragment: impl Into<String>) -> Self {
        Self::now(EventKind::Chunk, Some(stream_id.clone()), Some(fragment.into()))
    }

    /// End-of-reply marker for a stream.
    pub fn done(stream_id: &StreamId) -> Self {
        Self::now(EventKind::Done, Some(stream_id.clone()), None)
    }

    /// Failure notice for a stream.
    pub fn error(stream_id: &StreamId, message: impl Into<String>) -> Self {
        Self::now(EventKind::Error, Some(stream_id.clone()), Some(message.into()))
    }

    /// Stream this event belongs to, if any.
    pub fn stream_id(&self) -> Option<&StreamId> {
        self.payload.stream_id.as_ref()
    }

    /// Serialize the payload for the SSE `data:` field.
    pub fn data_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(&self.payload)
    }
}
