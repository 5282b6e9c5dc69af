//! Settings loading with deep merge and environment variable overrides.
//!
//! Deep merge rules:
//! - Objects are merged recursively (source overrides target per-key)
//! - Arrays and primitives are replaced entirely by source
//! - Null values in source are skipped (preserving target)

use std::path::{Path, PathBuf};

use lettera_core::Language;
use serde_json::Value;
use tracing::debug;

use crate::errors::Result;
use crate::types::LetteraSettings;

/// `~/.lettera`, falling back to `/tmp/.lettera` without a home directory.
pub fn lettera_home() -> PathBuf {
    std::env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/tmp"))
        .join(".lettera")
}

pub fn settings_path() -> PathBuf {
    lettera_home().join("settings.json")
}

/// Load settings from the default path with env var overrides.
pub fn load_settings() -> Result<LetteraSettings> {
    load_settings_from_path(&settings_path())
}

/// Load settings from a specific path with env var overrides.
///
/// A missing file yields defaults; a malformed one is an error.
pub fn load_settings_from_path(path: &Path) -> Result<LetteraSettings> {
    let defaults = serde_json::to_value(LetteraSettings::default())?;

    let merged = if path.exists() {
        debug!(?path, "loading settings from file");
        let content = std::fs::read_to_string(path)?;
        let user: Value = serde_json::from_str(&content)?;
        deep_merge(defaults, user)
    } else {
        debug!(?path, "settings file not found, using defaults");
        defaults
    };

    let mut settings: LetteraSettings = serde_json::from_value(merged)?;
    apply_env_overrides(&mut settings);
    settings.validate()?;
    Ok(settings)
}

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

/// Apply `LETTERA_*` overrides. Invalid values are ignored with a warning.
pub fn apply_env_overrides(settings: &mut LetteraSettings) {
    if let Some(v) = read_env_string("LETTERA_LANGUAGE") {
        match v.parse::<Language>() {
            Ok(lang) => settings.language = lang,
            Err(e) => tracing::warn!(key = "LETTERA_LANGUAGE", error = %e, "ignoring"),
        }
    }
    if let Some(v) = read_env_u64("LETTERA_DAILY_CEILING", 1, 10_000) {
        settings.rate_limit.daily_ceiling = v as u32;
    }
    if let Some(v) = read_env_string("LETTERA_SERVICE_URL") {
        settings.service.base_url = v;
    }
    if let Some(v) = read_env_u64("LETTERA_REQUEST_TIMEOUT_MS", 1_000, 600_000) {
        settings.service.request_timeout_ms = v;
    }
    if let Some(v) = read_env_bool("LETTERA_SEARCH_ENABLED") {
        settings.search.enabled = v;
    }
    if let Some(v) = read_env_u64("LETTERA_SEARCH_TIMEOUT_MS", 100, 120_000) {
        settings.search.timeout_ms = v;
    }
    if let Some(v) = read_env_u64("LETTERA_IDLE_TIMEOUT_SECS", 60, 7 * 24 * 3600) {
        settings.session.idle_timeout_secs = v;
    }
    if let Some(v) = read_env_string("LETTERA_DB_PATH") {
        settings.storage.db_path = v;
    }
    if let Some(v) = read_env_string("LETTERA_LOG_LEVEL") {
        settings.logging.level = v;
    }
    if let Some(v) = read_env_bool("LETTERA_LOG_JSON") {
        settings.logging.json = v;
    }
}

// ── Pure parsing functions (testable without env vars) ──────────────────────

/// Accepts (case-insensitive): `true`/`1`/`yes`/`on` or `false`/`0`/`no`/`off`.
pub fn parse_bool(val: &str) -> Option<bool> {
    match val.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

pub fn parse_u64_range(val: &str, min: u64, max: u64) -> Option<u64> {
    let n: u64 = val.trim().parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

fn read_env_string(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

fn read_env_bool(name: &str) -> Option<bool> {
    let val = std::env::var(name).ok()?;
    let result = parse_bool(&val);
    if result.is_none() {
        tracing::warn!(key = name, value = %val, "invalid boolean env var, ignoring");
    }
    result
}

fn read_env_u64(name: &str, min: u64, max: u64) -> Option<u64> {
    let val = std::env::var(name).ok()?;
    let result = parse_u64_range(&val, min, max);
    if result.is_none() {
        tracing::warn!(key = name, value = %val, "invalid integer env var, ignoring");
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::SettingsError;

    fn temp_file(contents: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("lettera-settings-{}", uuid::Uuid::now_v7()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("settings.json");
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn merge_nested_override() {
        let target = serde_json::json!({"search": {"timeoutMs": 8000, "enabled": true}});
        let source = serde_json::json!({"search": {"timeoutMs": 3000}});
        let merged = deep_merge(target, source);
        assert_eq!(merged["search"]["timeoutMs"], 3000);
        assert_eq!(merged["search"]["enabled"], true);
    }

    #[test]
    fn merge_null_preserves_target() {
        let merged = deep_merge(serde_json::json!({"a": 1}), serde_json::json!({"a": null}));
        assert_eq!(merged["a"], 1);
    }

    #[test]
    fn merge_array_replace() {
        let merged = deep_merge(
            serde_json::json!({"items": [1, 2, 3]}),
            serde_json::json!({"items": [4]}),
        );
        assert_eq!(merged["items"], serde_json::json!([4]));
    }

    #[test]
    fn missing_file_gives_defaults() {
        let path = std::env::temp_dir().join("lettera-definitely-missing/settings.json");
        let settings = load_settings_from_path(&path).unwrap();
        assert_eq!(settings.export.mailto_max_url_len, 1_800);
    }

    #[test]
    fn file_values_override_defaults() {
        let path = temp_file(r#"{"rateLimit":{"dailyCeiling":7},"export":{"mailtoMaxUrlLen":900}}"#);
        let settings = load_settings_from_path(&path).unwrap();
        assert_eq!(settings.rate_limit.daily_ceiling, 7);
        assert_eq!(settings.export.mailto_max_url_len, 900);
        assert_eq!(settings.detector.min_letter_chars, 250);
    }

    #[test]
    fn invalid_json_is_an_error() {
        let path = temp_file("{not json");
        assert!(matches!(load_settings_from_path(&path), Err(SettingsError::Json(_))));
    }

    #[test]
    fn invalid_values_are_rejected() {
        let path = temp_file(r#"{"rateLimit":{"dailyCeiling":0}}"#);
        assert!(matches!(
            load_settings_from_path(&path),
            Err(SettingsError::InvalidValue(_))
        ));
    }

    #[test]
    fn parse_bool_variants() {
        assert_eq!(parse_bool("YES"), Some(true));
        assert_eq!(parse_bool("off"), Some(false));
        assert_eq!(parse_bool("maybe"), None);
    }

    #[test]
    fn parse_u64_range_bounds() {
        assert_eq!(parse_u64_range("20", 1, 100), Some(20));
        assert_eq!(parse_u64_range("0", 1, 100), None);
        assert_eq!(parse_u64_range("101", 1, 100), None);
        assert_eq!(parse_u64_range("abc", 1, 100), None);
    }
}
