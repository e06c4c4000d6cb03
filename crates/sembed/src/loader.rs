//! Config loading with deep merge and environment variable overrides.
//!
//! Loading flow:
//! 1. Start with compiled [`EmbeddingConfig::default()`]
//! 2. If a config file exists, deep-merge its values over defaults
//! 3. Apply `SEMBED_*` environment variable overrides (highest priority)

use std::path::Path;

use serde_json::Value;
use tracing::debug;

use crate::config::{EmbeddingConfig, InferenceBackend};
use crate::errors::{EmbeddingError, Result};

/// Load config from a specific path with env var overrides.
///
/// A missing file yields defaults. Unreadable files and invalid JSON are
/// [`EmbeddingError::Config`] errors.
pub fn load_config_from_path(path: &Path) -> Result<EmbeddingConfig> {
    let defaults = serde_json::to_value(EmbeddingConfig::default())
        .map_err(|e| EmbeddingError::Internal(format!("serialize defaults: {e}")))?;

    let merged = if path.exists() {
        debug!(?path, "loading embedding config from file");
        let content = std::fs::read_to_string(path)
            .map_err(|e| EmbeddingError::Config(format!("read {}: {e}", path.display())))?;
        let user: Value = serde_json::from_str(&content)
            .map_err(|e| EmbeddingError::Config(format!("parse {}: {e}", path.display())))?;
        deep_merge(defaults, user)
    } else {
        debug!(?path, "config file not found, using defaults");
        defaults
    };

    let mut config: EmbeddingConfig = serde_json::from_value(merged)
        .map_err(|e| EmbeddingError::Config(format!("invalid config: {e}")))?;
    apply_env_overrides(&mut config);
    Ok(config)
}

/// Recursive deep merge of two JSON values.
///
/// - Objects are merged recursively (source overrides target per-key)
/// - Arrays and primitives are replaced entirely by source
/// - Null values in source are skipped (preserving target)
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

/// Apply environment variable overrides to a loaded config.
///
/// Invalid values are ignored (with a warning) and the file/default value stays.
pub fn apply_env_overrides(config: &mut EmbeddingConfig) {
    if let Some(v) = read_env_string("SEMBED_MODEL_DIR") {
        config.model_dir = v;
    }
    if let Some(v) = read_env_string("SEMBED_BACKEND") {
        match InferenceBackend::from_tag(&v) {
            Some(backend) => config.backend = backend,
            None => tracing::warn!(key = "SEMBED_BACKEND", value = %v, "unknown backend, ignoring"),
        }
    }
    if let Some(v) = read_env_usize("SEMBED_INTRA_THREADS", 1, 256) {
        config.intra_threads = Some(v);
    }
    if let Some(v) = read_env_bool("SEMBED_NORMALIZE") {
        config.normalize = v;
    }
    if let Some(v) = read_env_u64("SEMBED_EMBED_TIMEOUT_MS", 1, 3_600_000) {
        config.embed_timeout_ms = Some(v);
    }
}

// ── Pure parsing functions (testable without env vars) ──────────────────────

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

/// Parse a string as a `usize` within a range.
pub fn parse_usize_range(val: &str, min: usize, max: usize) -> Option<usize> {
    let n: usize = val.parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

// ── Env var readers (thin wrappers) ─────────────────────────────────────────

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
        tracing::warn!(key = name, value = %val, "invalid u64 env var, ignoring");
    }
    result
}

fn read_env_usize(name: &str, min: usize, max: usize) -> Option<usize> {
    let val = std::env::var(name).ok()?;
    let result = parse_usize_range(&val, min, max);
    if result.is_none() {
        tracing::warn!(key = name, value = %val, "invalid usize env var, ignoring");
    }
    result
}
