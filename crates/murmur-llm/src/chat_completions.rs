//! OpenAI-compatible chat-completions client shared by every backend variant.
//!
//! Request: `POST {base_url}{path}` with
//! `{model, messages, temperature, top_p, max_tokens, stop}`.
//! Reply text is `choices[0].message.content`.

use std::time::Duration;

use async_trait::async_trait;
use murmur_core::ChatMessage;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, instrument};

use crate::errors::{GenerationError, GenerationResult};
use crate::generator::{Generation, Generator, TokenUsage};

/// Connection and sampling parameters for a chat-completions backend.
#[derive(Clone, Debug)]
pub struct ChatCompletionsConfig {
    /// Backend label (`remote-http`, `local-inference`, `managed-api`).
    pub backend: String,
    /// Base URL without trailing slash.
    pub base_url: String,
    /// Path appended to the base URL.
    pub path: String,
    /// Bearer token, if the backend requires one.
    pub api_key: Option<String>,
    /// Model identifier.
    pub model: String,
    /// Sampling temperature.
    pub temperature: f64,
    /// Nucleus sampling threshold.
    pub top_p: f64,
    /// Maximum generated tokens.
    pub max_tokens: u32,
    /// Stop sequences.
    pub stop: Vec<String>,
    /// Whole-request timeout.
    pub request_timeout: Duration,
}

impl ChatCompletionsConfig {
    /// Full endpoint URL.
    pub fn endpoint(&self) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), self.path)
    }
}

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f64,
    top_p: f64,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    stop: Option<&'a [String]>,
}

#[derive(Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<CompletionChoice>,
    #[serde(default)]
    usage: Option<TokenUsage>,
}

#[derive(Deserialize)]
struct CompletionChoice {
    #[serde(default)]
    message: Option<CompletionMessage>,
}

#[derive(Deserialize)]
struct CompletionMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Generator speaking the OpenAI chat-completions protocol.
pub struct ChatCompletionsGenerator {
    config: ChatCompletionsConfig,
    client: reqwest::Client,
}

impl ChatCompletionsGenerator {
    /// Create a generator with its own HTTP client.
    pub fn new(config: ChatCompletionsConfig) -> GenerationResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self { config, client })
    }

    /// Connection and sampling parameters.
    pub fn config(&self) -> &ChatCompletionsConfig {
        &self.config
    }

    fn build_headers(&self) -> GenerationResult<HeaderMap> {
        let mut headers = HeaderMap::new();
        let _ = headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Some(key) = &self.config.api_key {
            let value = HeaderValue::from_str(&format!("Bearer {key}"))
                .map_err(|e| GenerationError::Config(format!("invalid API key header: {e}")))?;
            let _ = headers.insert(AUTHORIZATION, value);
        }
        Ok(headers)
    }

    fn map_send_error(&self, err: reqwest::Error) -> GenerationError {
        if err.is_timeout() {
            GenerationError::Timeout {
                after_ms: self.config.request_timeout.as_millis() as u64,
            }
        } else {
            GenerationError::Http(err)
        }
    }
}

#[async_trait]
impl Generator for ChatCompletionsGenerator {
    fn backend(&self) -> &str {
        &self.config.backend
    }

    fn model(&self) -> &str {
        &self.config.model
    }

    #[instrument(skip_all, fields(backend = %self.config.backend, model = %self.config.model))]
    async fn generate(&self, messages: &[ChatMessage]) -> GenerationResult<Generation> {
        let body = CompletionRequest {
            model: &self.config.model,
            messages,
            temperature: self.config.temperature,
            top_p: self.config.top_p,
            max_tokens: self.config.max_tokens,
            stop: (!self.config.stop.is_empty()).then_some(self.config.stop.as_slice()),
        };
        debug!(message_count = messages.len(), "sending chat completion request");

        let response = self
            .client
            .post(self.config.endpoint())
            .headers(self.build_headers()?)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        let status = response.status();
        let text = response.text().await.map_err(|e| self.map_send_error(e))?;
        if !status.is_success() {
            error!(status = status.as_u16(), "chat completion API error");
            return Err(GenerationError::Api {
                status: status.as_u16(),
                message: text,
            });
        }

        let parsed: CompletionResponse = serde_json::from_str(&text)?;
        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message)
            .and_then(|m| m.content)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .ok_or(GenerationError::EmptyResponse)?;

        Ok(Generation {
            text: content,
            usage: parsed.usage,
        })
    }
}
