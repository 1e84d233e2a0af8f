//! Conversation message types.
//!
//! - [`Turn`]: one immutable, role-tagged entry of a session window
//! - [`ChatMessage`]: the `{role, content}` wire shape handed to a generator

use serde::{Deserialize, Serialize};

/// Author of a [`Turn`] inside a session window.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    /// Message submitted by a participant.
    User,
    /// Reply produced by the generator.
    Assistant,
}

impl TurnRole {
    /// Wire name of the role.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

/// Role of a [`ChatMessage`] sent to a generator.
///
/// Superset of [`TurnRole`]: preamble entries may also carry `system`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Instructions that frame the conversation.
    System,
    /// Participant message.
    User,
    /// Generator reply.
    Assistant,
}

impl Role {
    /// Wire name of the role.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

impl From<TurnRole> for Role {
    fn from(role: TurnRole) -> Self {
        match role {
            TurnRole::User => Self::User,
            TurnRole::Assistant => Self::Assistant,
        }
    }
}

/// One role-tagged message within a session. Immutable once created.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    /// Monotonic position within the owning session (starts at 0).
    pub seq: u64,
    /// Who produced the turn.
    pub role: TurnRole,
    /// Message text.
    pub text: String,
}

impl Turn {
    /// Convert to the generator wire shape.
    pub fn to_chat_message(&self) -> ChatMessage {
        ChatMessage {
            role: self.role.into(),
            content: self.text.clone(),
        }
    }
}

/// A `{role, content}` message as consumed by chat-completion backends.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Message role.
    pub role: Role,
    /// Message content.
    pub content: String,
}

impl ChatMessage {
    /// Create a system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    /// Create a user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    /// Create an assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn turn_role_serializes_lowercase() {
        assert_eq!(serde_json::to_value(TurnRole::User).unwrap(), json!("user"));
        assert_eq!(
            serde_json::to_value(TurnRole::Assistant).unwrap(),
            json!("assistant")
        );
    }

    #[test]
    fn role_from_turn_role() {
        assert_eq!(Role::from(TurnRole::User), Role::User);
        assert_eq!(Role::from(TurnRole::Assistant), Role::Assistant);
    }

    #[test]
    fn turn_to_chat_message() {
        let turn = Turn {
            seq: 3,
            role: TurnRole::Assistant,
            text: "hello there".into(),
        };
        let msg = turn.to_chat_message();
        assert_eq!(msg, ChatMessage::assistant("hello there"));
    }

    #[test]
    fn chat_message_wire_shape() {
        let msg = ChatMessage::system("be brief");
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value, json!({"role": "system", "content": "be brief"}));
    }

    #[test]
    fn role_as_str_matches_serde() {
        for role in [Role::System, Role::User, Role::Assistant] {
            let value = serde_json::to_value(role).unwrap();
            assert_eq!(value, json!(role.as_str()));
        }
    }
}
