//! Settings loading with deep merge and environment variable overrides.
//!
//! Loading flow:
//! 1. Start with compiled [`LipiSettings::default()`]
//! 2. If `~/.lipi/settings.json` exists, deep-merge user values over defaults
//! 3. Apply `LIPI_*` environment variable overrides (highest priority)
//! 4. Validate the result
//!
//! Deep merge rules:
//! - Objects are merged recursively (source overrides target per-key)
//! - Arrays and primitives are replaced entirely by source
//! - Null values in source are skipped (preserving target)

use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{debug, warn};

use crate::errors::Result;
use crate::types::{LipiSettings, StrategySettings};

/// The user's home directory, falling back to `/tmp`.
pub fn home_dir() -> PathBuf {
    PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string()))
}

/// Resolve the path to the settings file (`~/.lipi/settings.json`).
pub fn settings_path() -> PathBuf {
    home_dir().join(".lipi").join("settings.json")
}

/// Load settings from the default path with env var overrides.
pub fn load_settings() -> Result<LipiSettings> {
    load_settings_from_path(&settings_path())
}

/// Load settings from a specific path with env var overrides.
///
/// If the file does not exist, returns defaults. Invalid JSON or values that
/// fail [`LipiSettings::validate`] are errors.
pub fn load_settings_from_path(path: &Path) -> Result<LipiSettings> {
    let defaults = serde_json::to_value(LipiSettings::default())?;

    let merged = if path.exists() {
        debug!(?path, "loading settings from file");
        let content = std::fs::read_to_string(path)?;
        let user: Value = serde_json::from_str(&content)?;
        deep_merge(defaults, user)
    } else {
        debug!(?path, "settings file not found, using defaults");
        defaults
    };

    let mut settings: LipiSettings = serde_json::from_value(merged)?;
    apply_env_overrides(&mut settings);
    settings.validate()?;
    Ok(settings)
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

/// Apply `LIPI_*` environment variable overrides to loaded settings.
///
/// Numbers must parse and fall within the accepted range; anything else is
/// ignored with a warning.
pub fn apply_env_overrides(settings: &mut LipiSettings) {
    // ── Model ───────────────────────────────────────────────────────
    if let Some(v) = read_env_string("LIPI_MODEL_DIR") {
        settings.model.model_dir = v;
    }
    if let Some(v) = read_env_u64("LIPI_LOAD_TIMEOUT_MS", 100, 600_000) {
        settings.model.load_timeout_ms = v;
    }
    if let Some(v) = read_env_u64("LIPI_INFERENCE_TIMEOUT_MS", 10, 600_000) {
        settings.model.inference_timeout_ms = v;
    }
    if let Some(v) = read_env_usize("LIPI_INTRA_THREADS", 1, 256) {
        settings.model.intra_threads = v;
    }

    // ── Processing ──────────────────────────────────────────────────
    if let Some(v) = read_env_usize("LIPI_MAX_SEQ_LENGTH", 1, 65_536) {
        settings.processing.max_seq_length = v;
    }
    if let Some(v) = read_env_f64("LIPI_RESAMPLE_DISTANCE", f64::MIN_POSITIVE, 1_000.0) {
        settings.processing.resample_distance = v;
    }

    // ── Decoding ────────────────────────────────────────────────────
    if let Some(v) = read_env_f64("LIPI_CONFIDENCE_THRESHOLD", 0.0, 1.0) {
        settings.decoding.confidence_threshold = v;
    }
    if let Some(v) = read_env_usize("LIPI_BEAM_WIDTH", 1, 1_000) {
        for strategy in &mut settings.decoding.strategies {
            if let StrategySettings::BeamSearch { beam_width } = strategy {
                *beam_width = v;
            }
        }
    }

    // ── Logging ─────────────────────────────────────────────────────
    if let Some(v) = read_env_string("LIPI_LOG_LEVEL") {
        match serde_json::from_value(Value::String(v.to_lowercase())) {
            Ok(level) => settings.logging.level = level,
            Err(_) => warn!(key = "LIPI_LOG_LEVEL", value = %v, "invalid log level, ignoring"),
        }
    }
}

// ── Pure parsing functions (testable without env vars) ──────────────────────

/// Parse a string as a `u64` within a range.
pub fn parse_u64_range(val: &str, min: u64, max: u64) -> Option<u64> {
    let n: u64 = val.trim().parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

/// Parse a string as a `usize` within a range.
pub fn parse_usize_range(val: &str, min: usize, max: usize) -> Option<usize> {
    let n: usize = val.trim().parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

/// Parse a string as a finite `f64` within a range.
pub fn parse_f64_range(val: &str, min: f64, max: f64) -> Option<f64> {
    let n: f64 = val.trim().parse().ok()?;
    (n.is_finite() && n >= min && n <= max).then_some(n)
}

// ── Env var readers (thin wrappers) ─────────────────────────────────────────

fn read_env_string(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

fn read_env_u64(name: &str, min: u64, max: u64) -> Option<u64> {
    let val = std::env::var(name).ok()?;
    let result = parse_u64_range(&val, min, max);
    if result.is_none() {
        warn!(key = name, value = %val, "invalid u64 env var, ignoring");
    }
    result
}

fn read_env_usize(name: &str, min: usize, max: usize) -> Option<usize> {
    let val = std::env::var(name).ok()?;
    let result = parse_usize_range(&val, min, max);
    if result.is_none() {
        warn!(key = name, value = %val, "invalid usize env var, ignoring");
    }
    result
}

fn read_env_f64(name: &str, min: f64, max: f64) -> Option<f64> {
    let val = std::env::var(name).ok()?;
    let result = parse_f64_range(&val, min, max);
    if result.is_none() {
        warn!(key = name, value = %val, "invalid f64 env var, ignoring");
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::SettingsError;
    use assert_matches::assert_matches;

    // ── deep_merge ──────────────────────────────────────────────────

    #[test]
    fn merge_nested_override() {
        let target = serde_json::json!({"model": {"loadTimeoutMs": 30000, "intraThreads": 2}});
        let source = serde_json::json!({"model": {"intraThreads": 4}});
        let merged = deep_merge(target, source);
        assert_eq!(merged["model"]["intraThreads"], 4);
        assert_eq!(merged["model"]["loadTimeoutMs"], 30000);
    }

    #[test]
    fn merge_array_replace() {
        let target = serde_json::json!({"items": [1, 2, 3]});
        let source = serde_json::json!({"items": [4]});
        assert_eq!(deep_merge(target, source)["items"], serde_json::json!([4]));
    }

    #[test]
    fn merge_null_preserves_target() {
        let target = serde_json::json!({"a": 1, "b": 2});
        let source = serde_json::json!({"a": null});
        let merged = deep_merge(target, source);
        assert_eq!(merged["a"], 1);
        assert_eq!(merged["b"], 2);
    }

    #[test]
    fn merge_new_keys_and_type_changes() {
        let target = serde_json::json!({"a": {"nested": true}});
        let source = serde_json::json!({"a": 42, "b": "x"});
        let merged = deep_merge(target, source);
        assert_eq!(merged["a"], 42);
        assert_eq!(merged["b"], "x");
    }

    #[test]
    fn merge_empty_source() {
        let target = serde_json::json!({"a": 1, "b": {"c": 2}});
        let merged = deep_merge(target.clone(), serde_json::json!({}));
        assert_eq!(merged, target);
    }

    // ── load_settings_from_path ─────────────────────────────────────

    #[test]
    fn load_missing_file_returns_defaults() {
        let settings = load_settings_from_path(Path::new("/nonexistent/settings.json")).unwrap();
        assert_eq!(settings.name, "lipi");
        assert_eq!(settings.decoding.strategies.len(), 2);
    }

    #[test]
    fn load_partial_json_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(
            &path,
            r#"{"processing": {"resampleDistance": 5.5}, "model": {"intraThreads": 4}}"#,
        )
        .unwrap();

        let settings = load_settings_from_path(&path).unwrap();
        assert!((settings.processing.resample_distance - 5.5).abs() < f64::EPSILON);
        assert_eq!(settings.model.intra_threads, 4);
        assert_eq!(settings.model.load_timeout_ms, 30_000);
    }

    #[test]
    fn load_strategy_list_replaces_not_merges() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{"decoding": {"strategies": [{"kind": "greedy"}]}}"#).unwrap();

        let settings = load_settings_from_path(&path).unwrap();
        assert_eq!(settings.decoding.strategies, vec![StrategySettings::Greedy]);
        assert_eq!(settings.decoding.target_scripts.len(), 1);
    }

    #[test]
    fn load_invalid_json_returns_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "not valid json").unwrap();
        assert_matches!(load_settings_from_path(&path), Err(SettingsError::Json(_)));
    }

    #[test]
    fn load_invalid_value_returns_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{"decoding": {"strategies": []}}"#).unwrap();
        assert_matches!(
            load_settings_from_path(&path),
            Err(SettingsError::InvalidValue(_))
        );
    }

    // ── parsers ─────────────────────────────────────────────────────

    #[test]
    fn parse_u64_bounds() {
        assert_eq!(parse_u64_range("30000", 100, 600_000), Some(30_000));
        assert_eq!(parse_u64_range("50", 100, 600_000), None);
        assert_eq!(parse_u64_range("700000", 100, 600_000), None);
        assert_eq!(parse_u64_range("abc", 100, 600_000), None);
    }

    #[test]
    fn parse_usize_bounds() {
        assert_eq!(parse_usize_range("128", 1, 65_536), Some(128));
        assert_eq!(parse_usize_range("0", 1, 65_536), None);
        assert_eq!(parse_usize_range(" 12 ", 1, 65_536), Some(12));
    }

    #[test]
    fn parse_f64_bounds() {
        assert_eq!(parse_f64_range("0.75", 0.0, 1.0), Some(0.75));
        assert_eq!(parse_f64_range("1.5", 0.0, 1.0), None);
        assert_eq!(parse_f64_range("NaN", 0.0, 1.0), None);
        assert_eq!(parse_f64_range("inf", 0.0, f64::MAX), None);
        assert_eq!(parse_f64_range("", 0.0, 1.0), None);
    }
}
