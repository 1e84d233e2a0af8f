//! Backend selection. The mode is resolved once at startup into a concrete
//! [`Generator`]; nothing re-checks it per request.

use std::sync::Arc;
use std::time::Duration;

use murmur_settings::GeneratorSettings;
use tracing::info;

pub use murmur_settings::GeneratorMode as GeneratorKind;

use crate::chat_completions::{ChatCompletionsConfig, ChatCompletionsGenerator};
use crate::errors::{GenerationError, GenerationResult};
use crate::generator::Generator;

/// Env var consulted for the tunnelled host when no base URL is configured.
pub const REMOTE_URL_ENV: &str = "MODEL_NGROK_URL";

/// Bearer token sent to remote hosts that ignore auth.
const REMOTE_PLACEHOLDER_KEY: &str = "dummy-key";

/// Build the generator selected by `settings.mode`, reading the process environment.
pub fn create_generator(settings: &GeneratorSettings) -> GenerationResult<Arc<dyn Generator>> {
    create_generator_with(settings, |name| std::env::var(name).ok())
}

/// Build the generator selected by `settings.mode`, reading env vars through `lookup`.
pub fn create_generator_with<F>(
    settings: &GeneratorSettings,
    lookup: F,
) -> GenerationResult<Arc<dyn Generator>>
where
    F: Fn(&str) -> Option<String>,
{
    let config = resolve_config(settings, lookup)?;
    info!(
        backend = %config.backend,
        model = %config.model,
        endpoint = %config.endpoint(),
        "generator configured"
    );
    Ok(Arc::new(ChatCompletionsGenerator::new(config)?))
}

/// Resolve connection parameters for the selected mode.
pub fn resolve_config<F>(
    settings: &GeneratorSettings,
    lookup: F,
) -> GenerationResult<ChatCompletionsConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let kind = settings.mode;
    let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

    let base_url = match kind {
        GeneratorKind::RemoteHttp => settings
            .base_url
            .clone()
            .or_else(|| non_empty(REMOTE_URL_ENV))
            .ok_or_else(|| {
                GenerationError::Config(format!(
                    "remote-http needs generator.baseUrl or {REMOTE_URL_ENV}"
                ))
            })?,
        GeneratorKind::LocalInference | GeneratorKind::ManagedApi => settings
            .base_url
            .clone()
            .or_else(|| kind.default_base_url().map(String::from))
            .ok_or_else(|| GenerationError::Config(format!("{kind} has no base URL")))?,
    };

    let (path, api_key) = match kind {
        GeneratorKind::RemoteHttp => (
            "/v1/chat/completions",
            Some(REMOTE_PLACEHOLDER_KEY.to_string()),
        ),
        GeneratorKind::LocalInference => ("/v1/chat/completions", None),
        GeneratorKind::ManagedApi => {
            let key = non_empty(&settings.api_key_env).ok_or_else(|| {
                GenerationError::Config(format!(
                    "managed-api needs an API key in ${}",
                    settings.api_key_env
                ))
            })?;
            ("/chat/completions", Some(key))
        }
    };

    Ok(ChatCompletionsConfig {
        backend: kind.as_str().to_string(),
        base_url,
        path: path.to_string(),
        api_key,
        model: settings.resolved_model(),
        temperature: settings.temperature,
        top_p: settings.top_p,
        max_tokens: settings.max_tokens,
        stop: settings.resolved_stop(),
        request_timeout: Duration::from_millis(settings.request_timeout_ms),
    })
}
