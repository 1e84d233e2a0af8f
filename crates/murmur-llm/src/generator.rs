//! # Generator Trait
//!
//! Core abstraction for text generation. A [`Generator`] receives the fully
//! assembled prompt (system instruction, preamble, recent turns) and returns
//! the complete reply text. Implementations must be `Send + Sync`; one
//! instance is shared by every job.

use async_trait::async_trait;
use murmur_core::ChatMessage;
use serde::{Deserialize, Serialize};

use crate::errors::GenerationResult;

/// Token accounting reported by some backends.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    /// Tokens in the prompt.
    #[serde(default)]
    pub prompt_tokens: u64,
    /// Tokens in the reply.
    #[serde(default)]
    pub completion_tokens: u64,
    /// Sum reported by the backend.
    #[serde(default)]
    pub total_tokens: u64,
}

/// A completed generation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Generation {
    /// Full reply text.
    pub text: String,
    /// Token usage, when the backend reports it.
    pub usage: Option<TokenUsage>,
}

impl Generation {
    /// Generation without usage data.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            usage: None,
        }
    }
}

/// Text generation backend.
#[async_trait]
pub trait Generator: Send + Sync {
    /// Backend label for logs and observation records (e.g. `"remote-http"`).
    fn backend(&self) -> &str;

    /// Model identifier.
    fn model(&self) -> &str;

    /// Produce a complete reply for `messages`.
    ///
    /// Fails on transport errors, non-success responses, and empty output.
    async fn generate(&self, messages: &[ChatMessage]) -> GenerationResult<Generation>;
}
