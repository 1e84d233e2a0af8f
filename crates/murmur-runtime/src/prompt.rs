//! Prompt framing placed ahead of a session window.

use std::path::Path;

use murmur_core::{ChatMessage, Role};
use murmur_settings::{PromptSettings, SettingsError};
use serde::Deserialize;
use tracing::debug;

/// Supplies the ordered messages prepended to every generation.
pub trait PromptProvider: Send + Sync {
    /// Messages placed before the session window, in order.
    fn preamble(&self) -> Vec<ChatMessage>;
}

/// Fixed preamble: optional system instruction followed by example turns.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StaticPromptProvider {
    messages: Vec<ChatMessage>,
}

impl StaticPromptProvider {
    /// Build from an optional system prompt and preamble messages.
    pub fn new(system_prompt: Option<String>, preamble: Vec<ChatMessage>) -> Self {
        let messages = system_prompt
            .filter(|s| !s.trim().is_empty())
            .map(ChatMessage::system)
            .into_iter()
            .chain(preamble)
            .collect();
        Self { messages }
    }

    /// Provider with no preamble.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build from settings, reading the preamble file if one is configured.
    pub fn from_settings(settings: &PromptSettings) -> Result<Self, SettingsError> {
        let preamble = match settings.preamble_path.as_deref() {
            Some(path) => load_preamble(Path::new(path))?,
            None => Vec::new(),
        };
        Ok(Self::new(settings.system_prompt.clone(), preamble))
    }
}

impl PromptProvider for StaticPromptProvider {
    fn preamble(&self) -> Vec<ChatMessage> {
        self.messages.clone()
    }
}

#[derive(Deserialize)]
struct PreambleEntry {
    role: Role,
    text: String,
}

/// Read a JSON array of `{role, text}` entries.
pub fn load_preamble(path: &Path) -> Result<Vec<ChatMessage>, SettingsError> {
    let content = std::fs::read_to_string(path)?;
    let entries: Vec<PreambleEntry> = serde_json::from_str(&content)?;
    debug!(?path, entries = entries.len(), "loaded prompt preamble");
    Ok(entries
        .into_iter()
        .map(|e| ChatMessage {
            role: e.role,
            content: e.text,
        })
        .collect())
}
