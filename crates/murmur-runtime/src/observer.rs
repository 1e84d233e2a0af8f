//! Per-generation observation records.
//!
//! The coordinator hands one [`GenerationRecord`] to the configured
//! [`GenerationObserver`] after every generation attempt, successful or not.
//! Observers run inline on the job task and must return promptly.

use std::time::Duration;

use chrono::{DateTime, Utc};
use metrics::histogram;
use murmur_core::{ChatMessage, JobId, StreamId};
use murmur_llm::TokenUsage;
use tracing::{info, warn};

use crate::metrics::GENERATION_DURATION_SECONDS;

/// What happened during one generation attempt.
#[derive(Clone, Debug)]
pub struct GenerationRecord {
    /// Job that made the attempt.
    pub job_id: JobId,
    /// Stream the job belongs to.
    pub stream_id: StreamId,
    /// Backend label.
    pub backend: String,
    /// Model identifier.
    pub model: String,
    /// Prompt sent to the backend.
    pub input: Vec<ChatMessage>,
    /// Reply text or error description.
    pub output: Result<String, String>,
    /// When the attempt started.
    pub started_at: DateTime<Utc>,
    /// Wall time of the attempt.
    pub duration: Duration,
    /// Token usage, if reported.
    pub usage: Option<TokenUsage>,
}

/// Sink for generation records. Must not block.
pub trait GenerationObserver: Send + Sync {
    /// Record one attempt.
    fn record(&self, record: &GenerationRecord);
}

/// Logs each attempt and records its duration histogram.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingObserver;

impl GenerationObserver for TracingObserver {
    fn record(&self, record: &GenerationRecord) {
        let secs = record.duration.as_secs_f64();
        histogram!(GENERATION_DURATION_SECONDS, "backend" => record.backend.clone()).record(secs);

        match &record.output {
            Ok(text) => info!(
                job_id = %record.job_id,
                stream_id = %record.stream_id,
                backend = %record.backend,
                model = %record.model,
                input_messages = record.input.len(),
                output_chars = text.chars().count(),
                prompt_tokens = record.usage.map(|u| u.prompt_tokens),
                completion_tokens = record.usage.map(|u| u.completion_tokens),
                duration_ms = record.duration.as_millis() as u64,
                "generation succeeded"
            ),
            Err(error) => warn!(
                job_id = %record.job_id,
                stream_id = %record.stream_id,
                backend = %record.backend,
                model = %record.model,
                input_messages = record.input.len(),
                duration_ms = record.duration.as_millis() as u64,
                error = %error,
                "generation failed"
            ),
        }
    }
}
