// src/normalize/mod.rs

//! Canonicalizes field values of a parsed (still untyped) model response.

use crate::config::RecoveryConfig;
use regex::Regex;
use serde_json::{Map, Value};
use std::sync::LazyLock;

pub const ACTION_FIELD: &str = "action";

static UNDERSCORES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"_+").unwrap());

/// Returns a normalized copy of `value`. Total over any JSON shape: keys are
/// never added or removed, non-string scalars are left alone.
pub fn normalize(value: &Value, config: &RecoveryConfig) -> Value {
    match value {
        Value::Object(map) => Value::Object(normalize_map(map, config)),
        Value::Array(items) => Value::Array(items.iter().map(|v| normalize(v, config)).collect()),
        Value::String(s) => Value::String(normalize_text(s)),
        other => other.clone(),
    }
}

fn normalize_map(map: &Map<String, Value>, config: &RecoveryConfig) -> Map<String, Value> {
    map.iter()
        .map(|(key, value)| {
            let value = match value {
                Value::String(s) if key == ACTION_FIELD => {
                    Value::String(config.canonical_action(&normalize_text(s)))
                }
                other => normalize(other, config),
            };
            (key.clone(), value)
        })
        .collect()
}

/// Underscore runs become one space; surrounding whitespace is trimmed.
pub fn normalize_text(text: &str) -> String {
    UNDERSCORES.replace_all(text, " ").trim().to_string()
}
