//! Settings loading with deep merge and environment variable overrides.
//!
//! Loading flow:
//! 1. Start with compiled [`WslineSettings::default()`]
//! 2. If the settings file exists, deep-merge user values over defaults
//! 3. Apply environment variable overrides
//!
//! Deep merge rules:
//! - Objects are merged recursively (source overrides target per-key)
//! - Arrays and primitives are replaced entirely by source
//! - Null values in source are skipped (preserving target)

use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{debug, warn};

use crate::errors::Result;
use crate::types::WslineSettings;

/// Resolve the path to the settings file (`~/.wsline/settings.json`).
pub fn settings_path() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(home).join(".wsline").join("settings.json")
}

/// Load settings from the default path with env var overrides.
pub fn load_settings() -> Result<WslineSettings> {
    load_settings_from_path(&settings_path())
}

/// Load settings from a specific path with env var overrides.
///
/// If the file does not exist, returns defaults. If the file contains
/// invalid JSON, returns an error.
pub fn load_settings_from_path(path: &Path) -> Result<WslineSettings> {
    let mut settings = load_file_layer(path)?;
    apply_env_overrides(&mut settings);
    Ok(settings)
}

fn load_file_layer(path: &Path) -> Result<WslineSettings> {
    let defaults = serde_json::to_value(WslineSettings::default())?;

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

/// Apply overrides from the process environment.
pub fn apply_env_overrides(settings: &mut WslineSettings) {
    apply_env_overrides_with(settings, |name| std::env::var(name).ok());
}

/// Apply overrides using `lookup` to read variables.
///
/// Booleans accept `true`/`1`/`yes`/`on` or `false`/`0`/`no`/`off`.
/// Invalid values are ignored with a warning. `NO_COLOR` follows the
/// no-color.org convention: any non-empty value disables color.
pub fn apply_env_overrides_with<F>(settings: &mut WslineSettings, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let env = EnvReader { lookup };

    // ── Client ──────────────────────────────────────────────────────
    if let Some(v) = env.u64_range("WSLINE_WAIT", 0, 86_400) {
        settings.client.wait_secs = v;
    }
    if let Some(v) = env.string("WSLINE_SUBPROTOCOL") {
        settings.client.subprotocol = Some(v.clone());
        settings.server.subprotocol = Some(v);
    }
    if let Some(v) = env.string("WSLINE_ORIGIN") {
        settings.client.origin = Some(v);
    }
    if let Some(v) = env.bool("WSLINE_SHOW_CONTROL_FRAMES") {
        settings.client.show_control_frames = v;
        settings.server.show_control_frames = v;
    }

    // ── Server ──────────────────────────────────────────────────────
    if let Some(v) = env.string("WSLINE_LISTEN_HOST") {
        settings.server.host = v;
    }

    // ── Output ──────────────────────────────────────────────────────
    if env.string("NO_COLOR").is_some() {
        settings.output.color = false;
    }
    if let Some(v) = env.bool("WSLINE_NO_COLOR") {
        settings.output.color = !v;
    }
    if let Some(v) = env.bool("WSLINE_DEBUG") {
        settings.output.debug = v;
    }
}

// ── Pure parsing functions ──────────────────────────────────────────────────

/// Parse a string as a boolean.
///
/// Accepts (case-insensitive): `true`/`1`/`yes`/`on` or `false`/`0`/`no`/`off`.
pub fn parse_bool(val: &str) -> Option<bool> {
    match val.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Parse a string as a `u64` within a range.
pub fn parse_u64_range(val: &str, min: u64, max: u64) -> Option<u64> {
    let n: u64 = val.parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

// ── Env readers ─────────────────────────────────────────────────────────────

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

    fn bool(&self, name: &str) -> Option<bool> {
        let val = (self.lookup)(name)?;
        let result = parse_bool(&val);
        if result.is_none() {
            warn!(key = name, value = %val, "invalid boolean env var, ignoring");
        }
        result
    }

    fn u64_range(&self, name: &str, min: u64, max: u64) -> Option<u64> {
        let val = (self.lookup)(name)?;
        let result = parse_u64_range(&val, min, max);
        if result.is_none() {
            warn!(key = name, value = %val, "invalid integer env var, ignoring");
        }
        result
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
