//! Generator backend and prompt settings.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::SettingsError;

/// Which generation backend to use. Chosen once at startup.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GeneratorMode {
    /// Tunnelled OpenAI-compatible inference host.
    #[default]
    RemoteHttp,
    /// Co-located inference server.
    LocalInference,
    /// Hosted managed API.
    ManagedApi,
}

impl GeneratorMode {
    /// Canonical name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::RemoteHttp => "remote-http",
            Self::LocalInference => "local-inference",
            Self::ManagedApi => "managed-api",
        }
    }

    /// Default model identifier for the mode.
    pub fn default_model(self) -> &'static str {
        match self {
            Self::RemoteHttp | Self::LocalInference => "allganize/Llama-3-Alpha-Ko-8B-Instruct",
            Self::ManagedApi => "models/gemini-2.0-flash",
        }
    }

    /// Default base URL for the mode (remote hosts have none).
    pub fn default_base_url(self) -> Option<&'static str> {
        match self {
            Self::RemoteHttp => None,
            Self::LocalInference => Some("http://127.0.0.1:8001"),
            Self::ManagedApi => Some("https://generativelanguage.googleapis.com/v1beta/openai"),
        }
    }

    /// Default stop sequences for the mode.
    pub fn default_stop(self) -> Vec<String> {
        match self {
            Self::RemoteHttp | Self::LocalInference => vec!["\n\n".into(), "</s>".into()],
            Self::ManagedApi => vec!["\n".into()],
        }
    }
}

impl fmt::Display for GeneratorMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GeneratorMode {
    type Err = SettingsError;

    /// Accepts canonical names plus the deployment aliases
    /// `colab`, `gcp[-dev|-prod]`, `api[-dev|-prod]`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "remote-http" | "colab" => Ok(Self::RemoteHttp),
            "local-inference" | "gcp" | "gcp-dev" | "gcp-prod" => Ok(Self::LocalInference),
            "managed-api" | "api" | "api-dev" | "api-prod" => Ok(Self::ManagedApi),
            other => Err(SettingsError::InvalidValue(format!(
                "unknown generator mode '{other}'"
            ))),
        }
    }
}

/// Generator settings. `None` fields fall back to the mode's defaults.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GeneratorSettings {
    /// Backend selection.
    pub mode: GeneratorMode,
    /// Model identifier override.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// Base URL override (without the `/v1/chat/completions` suffix).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// Name of the env var holding the API key.
    pub api_key_env: String,
    /// Sampling temperature.
    pub temperature: f64,
    /// Nucleus sampling threshold.
    pub top_p: f64,
    /// Maximum generated tokens.
    pub max_tokens: u32,
    /// Stop sequences override.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop: Option<Vec<String>>,
    /// HTTP request timeout in milliseconds.
    pub request_timeout_ms: u64,
}

impl Default for GeneratorSettings {
    fn default() -> Self {
        Self {
            mode: GeneratorMode::RemoteHttp,
            model: None,
            base_url: None,
            api_key_env: "GEMINI_API_KEY".to_string(),
            temperature: 0.5,
            top_p: 0.5,
            max_tokens: 256,
            stop: None,
            request_timeout_ms: 60_000,
        }
    }
}

impl GeneratorSettings {
    /// Effective model identifier.
    pub fn resolved_model(&self) -> String {
        self.model
            .clone()
            .unwrap_or_else(|| self.mode.default_model().to_string())
    }

    /// Effective stop sequences.
    pub fn resolved_stop(&self) -> Vec<String> {
        self.stop.clone().unwrap_or_else(|| self.mode.default_stop())
    }
}

/// Prompt framing settings.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PromptSettings {
    /// System instruction prepended to every generation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
    /// JSON file of ordered `{role, text}` entries placed after the system prompt.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preamble_path: Option<String>,
}
