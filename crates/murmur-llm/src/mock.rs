//! Scripted generator for deterministic tests without a backend.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use murmur_core::ChatMessage;
use parking_lot::Mutex;

use crate::errors::{GenerationError, GenerationResult};
use crate::generator::{Generation, Generator};

/// One pre-programmed outcome.
#[derive(Debug)]
pub enum ScriptedReply {
    /// Reply with this text.
    Text(String),
    /// Fail with this error.
    Fail(GenerationError),
    /// Wait, then resolve the inner reply.
    Delay(Duration, Box<ScriptedReply>),
}

impl ScriptedReply {
    /// Text reply.
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    /// Failing reply with an API error.
    pub fn api_error(status: u16, message: impl Into<String>) -> Self {
        Self::Fail(GenerationError::Api {
            status,
            message: message.into(),
        })
    }

    /// Wrap a reply with a delay.
    pub fn delayed(delay: Duration, inner: ScriptedReply) -> Self {
        Self::Delay(delay, Box::new(inner))
    }
}

/// Generator that returns pre-programmed replies in order and records prompts.
pub struct ScriptedGenerator {
    replies: Mutex<VecDeque<ScriptedReply>>,
    fallback: Option<String>,
    prompts: Mutex<Vec<Vec<ChatMessage>>>,
    call_count: AtomicUsize,
}

impl ScriptedGenerator {
    /// Generator that plays `replies` once each, then fails.
    pub fn new(replies: Vec<ScriptedReply>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            fallback: None,
            prompts: Mutex::new(Vec::new()),
            call_count: AtomicUsize::new(0),
        }
    }

    /// Generator that always answers `text`.
    pub fn repeating(text: impl Into<String>) -> Self {
        Self {
            fallback: Some(text.into()),
            ..Self::new(Vec::new())
        }
    }

    /// Number of `generate` calls so far.
    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::Relaxed)
    }

    /// Prompts received, in call order.
    pub fn prompts(&self) -> Vec<Vec<ChatMessage>> {
        self.prompts.lock().clone()
    }
}

#[async_trait]
impl Generator for ScriptedGenerator {
    fn backend(&self) -> &str {
        "scripted"
    }

    fn model(&self) -> &str {
        "scripted-model"
    }

    async fn generate(&self, messages: &[ChatMessage]) -> GenerationResult<Generation> {
        let idx = self.call_count.fetch_add(1, Ordering::Relaxed);
        self.prompts.lock().push(messages.to_vec());

        let next = self.replies.lock().pop_front();
        let mut current = match (next, &self.fallback) {
            (Some(reply), _) => reply,
            (None, Some(text)) => ScriptedReply::Text(text.clone()),
            (None, None) => {
                return Err(GenerationError::Config(format!(
                    "no scripted reply for call {idx}"
                )));
            }
        };

        loop {
            match current {
                ScriptedReply::Text(text) if text.trim().is_empty() => {
                    return Err(GenerationError::EmptyResponse);
                }
                ScriptedReply::Text(text) => return Ok(Generation::text(text)),
                ScriptedReply::Fail(err) => return Err(err),
                ScriptedReply::Delay(delay, inner) => {
                    tokio::time::sleep(delay).await;
                    current = *inner;
                }
            }
        }
    }
}
