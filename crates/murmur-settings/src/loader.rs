//! Settings loading with deep merge and environment variable overrides.
//!
//! Loading flow:
//! 1. Start with compiled [`MurmurSettings::default()`]
//! 2. If the settings file exists, deep-merge its values over defaults
//! 3. Apply `MURMUR_*` environment overrides (highest priority)
//! 4. Validate the result
//!
//! Deep merge rules:
//! - Objects are merged recursively (source overrides target per-key)
//! - Arrays and primitives are replaced entirely by source
//! - Null values in source are skipped (preserving target)

use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::debug;

use crate::errors::Result;
use crate::types::{GeneratorMode, MurmurSettings, OverflowMode};

/// Resolve the default settings file path (`~/.murmur/settings.json`).
pub fn settings_path() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(home).join(".murmur").join("settings.json")
}

/// Load settings from a specific path with env var overrides.
///
/// A missing file yields defaults. Invalid JSON or out-of-range values are errors.
pub fn load_settings_from_path(path: &Path) -> Result<MurmurSettings> {
    let mut settings = load_file_layer(path)?;
    apply_env_overrides(&mut settings);
    settings.validate()?;
    Ok(settings)
}

/// Defaults merged with the file at `path`, without env overrides.
pub fn load_file_layer(path: &Path) -> Result<MurmurSettings> {
    let defaults = serde_json::to_value(MurmurSettings::default())?;

    let merged = if path.exists() {
        debug!(?path, "loading settings from file");
        let content = std::fs::read_to_string(path)?;
        let user: Value = serde_json::from_str(&content)?;
        deep_merge(defaults, user)
    } else {
        debug!(?path, "settings file not found, using defaults");
        defaults
    };

    Ok(serde_json::from_value(merged)?)
}

/// Recursive deep merge of two JSON values.
pub fn deep_merge(target: Value, source: Value) -> Value {
    match (target, source) {
        (Value::Object(mut target_map), Value::Object(source_map)) => {
            for (key, source_val) in source_map {
                if source_val.is_null() {
                    continue;
                }
                let merged = match target_map.remove(&key) {
                    Some(target_val) => deep_merge(target_val, source_val),
                    None => source_val,
                };
                let _ = target_map.insert(key, merged);
            }
            Value::Object(target_map)
        }
        (_, source) => source,
    }
}

/// Apply `MURMUR_*` environment overrides from the process environment.
pub fn apply_env_overrides(settings: &mut MurmurSettings) {
    apply_overrides(settings, |name| std::env::var(name).ok());
}

/// Apply overrides read through `lookup`.
///
/// Invalid values are ignored with a warning and the file/default value kept.
pub fn apply_overrides<F>(settings: &mut MurmurSettings, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let env = EnvReader { lookup };

    // ── Server ──────────────────────────────────────────────────────
    if let Some(v) = env.string("MURMUR_HOST") {
        settings.server.host = v;
    }
    if let Some(v) = env.parsed("MURMUR_PORT", |s| parse_range::<u16>(s, 1, 65_535)) {
        settings.server.port = v;
    }

    // ── Session / bus ───────────────────────────────────────────────
    if let Some(v) = env.parsed("MURMUR_SESSION_CAPACITY", |s| parse_range(s, 1, 1_000)) {
        settings.session.capacity = v;
    }
    if let Some(v) = env.parsed("MURMUR_QUEUE_CAPACITY", |s| parse_range(s, 1, 65_536)) {
        settings.bus.queue_capacity = v;
    }
    if let Some(v) = env.parsed("MURMUR_OVERFLOW", parse_overflow) {
        settings.bus.overflow = v;
    }

    // ── Coordinator ─────────────────────────────────────────────────
    if let Some(v) = env.parsed("MURMUR_GENERATION_TIMEOUT_MS", |s| {
        parse_range(s, 100, 600_000)
    }) {
        settings.coordinator.generation_timeout_ms = v;
    }
    if let Some(v) = env.parsed("MURMUR_CHUNK_DELAY_MS", |s| parse_range(s, 0, 10_000)) {
        settings.coordinator.chunk_delay_ms = v;
    }
    if let Some(v) = env.parsed("MURMUR_MAX_PENDING_JOBS", |s| parse_range(s, 1, 100_000)) {
        settings.coordinator.max_pending_jobs = v;
    }

    // ── Generator ───────────────────────────────────────────────────
    if let Some(v) = env.parsed("MURMUR_MODE", |s| s.parse::<GeneratorMode>().ok()) {
        settings.generator.mode = v;
    }
    if let Some(v) = env.string("MURMUR_MODEL") {
        settings.generator.model = Some(v);
    }
    if let Some(v) = env.string("MURMUR_BASE_URL") {
        settings.generator.base_url = Some(v);
    }

    // ── Logging ─────────────────────────────────────────────────────
    if let Some(v) = env.string("MURMUR_LOG_LEVEL") {
        settings.logging.level = v;
    }
    if let Some(v) = env.parsed("MURMUR_LOG_FORMAT", |s| {
        serde_json::from_value(Value::String(s.to_lowercase())).ok()
    }) {
        settings.logging.format = v;
    }
}

// ── Pure parsing functions ──────────────────────────────────────────────────

/// Parse an integer within an inclusive range.
pub fn parse_range<T>(val: &str, min: T, max: T) -> Option<T>
where
    T: std::str::FromStr + PartialOrd,
{
    let n: T = val.trim().parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

/// Parse an overflow policy name.
pub fn parse_overflow(val: &str) -> Option<OverflowMode> {
    match val.to_lowercase().as_str() {
        "disconnect" => Some(OverflowMode::Disconnect),
        "tolerate" => Some(OverflowMode::Tolerate),
        _ => None,
    }
}

struct EnvReader<F> {
    lookup: F,
}

impl<F> EnvReader<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn string(&self, name: &str) -> Option<String> {
        (self.lookup)(name).filter(|v| !v.is_empty())
    }

    fn parsed<T>(&self, name: &str, parse: impl FnOnce(&str) -> Option<T>) -> Option<T> {
        let val = self.string(name)?;
        let result = parse(&val);
        if result.is_none() {
            tracing::warn!(key = name, value = %val, "invalid env var, ignoring");
        }
        result
    }
}
