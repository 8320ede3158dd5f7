// src/validation/shape.rs

use serde_json::{Map, Value};
use thiserror::Error;

pub const SEQUENCE_FIELD: &str = "sequence";
pub const STEP_FIELDS: [&str; 3] = ["object", "action", "target_position"];

pub type StepMapping = Map<String, Value>;

/// Ordered step mappings, never empty.
#[derive(Debug, Clone, PartialEq)]
pub struct StepList(Vec<StepMapping>);

impl StepList {
    pub fn new(steps: Vec<StepMapping>) -> Option<Self> {
        (!steps.is_empty()).then_some(Self(steps))
    }

    pub fn as_slice(&self) -> &[StepMapping] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        false
    }
}

/// Parsed value is neither a sequence nor a single step.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unrecognized plan shape (top-level keys: [{}])", .keys.join(", "))]
pub struct ShapeError {
    pub keys: Vec<String>,
}

/// Reduces a normalized value to an ordered list of step mappings.
///
/// A `sequence` wrapper (or a bare list) is checked first; a flat step is
/// lifted into a one-element list so callers only ever see sequences.
pub fn resolve_shape(value: &Value) -> Result<StepList, ShapeError> {
    if let Some(steps) = as_sequence(value) {
        return Ok(steps);
    }

    match value {
        Value::Object(map) if STEP_FIELDS.iter().any(|f| map.contains_key(*f)) => {
            Ok(StepList(vec![map.clone()]))
        }
        Value::Object(map) => Err(ShapeError {
            keys: map.keys().cloned().collect(),
        }),
        _ => Err(ShapeError { keys: Vec::new() }),
    }
}

fn as_sequence(value: &Value) -> Option<StepList> {
    let items = match value {
        Value::Array(items) => items,
        Value::Object(map) => map.get(SEQUENCE_FIELD)?.as_array()?,
        _ => return None,
    };

    items
        .iter()
        .map(|item| item.as_object().cloned())
        .collect::<Option<Vec<_>>>()
        .and_then(StepList::new)
}
