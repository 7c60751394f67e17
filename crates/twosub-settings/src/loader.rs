//! Settings loading with deep merge and environment variable overrides.
//!
//! Loading flow:
//! 1. Start with compiled [`AsrSettings::default()`]
//! 2. If `~/.twosub/settings.json` exists, deep-merge user values over defaults
//! 3. Apply `TWOSUB_*` environment variable overrides (highest priority)
//! 4. Reject values that would make the workflows unusable
//!
//! Objects merge recursively; arrays and primitives are replaced; nulls in
//! the user file are skipped.

use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{debug, warn};

use crate::errors::{Result, SettingsError};
use crate::types::AsrSettings;

/// Resolve the path to the settings file (`~/.twosub/settings.json`).
pub fn settings_path() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(home).join(".twosub").join("settings.json")
}

/// Load settings from the default path with env var overrides.
pub fn load_settings() -> Result<AsrSettings> {
    load_settings_from_path(&settings_path())
}

/// Load settings from a specific path with env var overrides.
///
/// A missing file yields defaults. Invalid JSON or out-of-range values are
/// errors.
pub fn load_settings_from_path(path: &Path) -> Result<AsrSettings> {
    let mut settings = read_file_layer(path)?;
    apply_env_overrides(&mut settings);
    validate(&mut settings)?;
    Ok(settings)
}

fn read_file_layer(path: &Path) -> Result<AsrSettings> {
    let defaults = serde_json::to_value(AsrSettings::default())?;

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
                let merged = if let Some(target_val) = target_map.remove(&key) {
                    deep_merge(target_val, source_val)
                } else {
                    source_val
                };
                let _ = target_map.insert(key, merged);
            }
            Value::Object(target_map)
        }
        (_, source) => source,
    }
}

/// Apply `TWOSUB_*` environment variable overrides.
///
/// Invalid values are logged and ignored.
pub fn apply_env_overrides(settings: &mut AsrSettings) {
    // ── Polling ─────────────────────────────────────────────────────
    if let Some(v) = read_env_u64("TWOSUB_POLL_INTERVAL_MS", 0, 600_000) {
        settings.polling.interval_ms = v;
    }
    if let Some(v) = read_env_u32("TWOSUB_POLL_MAX_ATTEMPTS", 1, 100_000) {
        settings.polling.max_attempts = v;
    }

    // ── HTTP ────────────────────────────────────────────────────────
    if let Some(v) = read_env_u64("TWOSUB_REQUEST_TIMEOUT_MS", 1000, 86_400_000) {
        settings.http.request_timeout_ms = v;
    }

    // ── Endpoints ───────────────────────────────────────────────────
    if let Some(v) = read_env_url("TWOSUB_ELEVENLABS_URL") {
        settings.providers.elevenlabs.base_url = v;
    }
    if let Some(v) = read_env_url("TWOSUB_BIJIAN_URL") {
        settings.providers.bijian.base_url = v;
    }
    if let Some(v) = read_env_url("TWOSUB_JIANYING_URL") {
        settings.providers.jianying.base_url = v;
    }
    if let Some(v) = read_env_url("TWOSUB_JIANYING_VOD_URL") {
        settings.providers.jianying.vod_url = v;
    }
}

/// Reject settings the acquisition workflows cannot run with.
///
/// Endpoint URLs are stored in their normalized form, without surrounding
/// whitespace or a trailing slash.
pub fn validate(settings: &mut AsrSettings) -> Result<()> {
    if settings.polling.max_attempts == 0 {
        return Err(SettingsError::InvalidValue(
            "polling.maxAttempts must be at least 1".into(),
        ));
    }
    if settings.http.request_timeout_ms == 0 {
        return Err(SettingsError::InvalidValue(
            "http.requestTimeoutMs must be at least 1".into(),
        ));
    }
    let providers = &mut settings.providers;
    let endpoints = [
        ("providers.elevenlabs.baseUrl", &mut providers.elevenlabs.base_url),
        ("providers.bijian.baseUrl", &mut providers.bijian.base_url),
        ("providers.jianying.baseUrl", &mut providers.jianying.base_url),
        ("providers.jianying.vodUrl", &mut providers.jianying.vod_url),
    ];
    for (key, url) in endpoints {
        *url = parse_url(url).ok_or_else(|| {
            SettingsError::InvalidValue(format!("{key} is not an http(s) URL: {url}"))
        })?;
    }
    let scheme = settings.providers.jianying.upload_scheme.as_str();
    if scheme != "http" && scheme != "https" {
        return Err(SettingsError::InvalidValue(format!(
            "providers.jianying.uploadScheme must be http or https, got {scheme}"
        )));
    }
    Ok(())
}

// ── Pure parsing functions (testable without env vars) ──────────────────────

/// Parse a string as a `u32` within a range.
pub fn parse_u32_range(val: &str, min: u32, max: u32) -> Option<u32> {
    let n: u32 = val.parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

/// Parse a string as a `u64` within a range.
pub fn parse_u64_range(val: &str, min: u64, max: u64) -> Option<u64> {
    let n: u64 = val.parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

/// Accept an `http://` or `https://` URL, dropping any trailing slash.
pub fn parse_url(val: &str) -> Option<String> {
    let trimmed = val.trim().trim_end_matches('/');
    let rest = trimmed
        .strip_prefix("https://")
        .or_else(|| trimmed.strip_prefix("http://"))?;
    (!rest.is_empty()).then(|| trimmed.to_string())
}

// ── Env var readers (thin wrappers) ─────────────────────────────────────────

fn read_env_url(name: &str) -> Option<String> {
    let val = std::env::var(name).ok().filter(|v| !v.is_empty())?;
    let result = parse_url(&val);
    if result.is_none() {
        warn!(key = name, value = %val, "invalid URL env var, ignoring");
    }
    result
}

fn read_env_u32(name: &str, min: u32, max: u32) -> Option<u32> {
    let val = std::env::var(name).ok()?;
    let result = parse_u32_range(&val, min, max);
    if result.is_none() {
        warn!(key = name, value = %val, "invalid u32 env var, ignoring");
    }
    result
}

fn read_env_u64(name: &str, min: u64, max: u64) -> Option<u64> {
    let val = std::env::var(name).ok()?;
    let result = parse_u64_range(&val, min, max);
    if result.is_none() {
        warn!(key = name, value = %val, "invalid u64 env var, ignoring");
    }
    result
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
