// src/protocol/mod.rs

use serde::{Deserialize, Serialize};

/// One manipulation of one object.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionStep {
    pub object: String,
    pub action: String,
    pub target_position: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_position: Option<String>,
}

/// Ordered, non-empty sequence of steps. Single-step instructions are
/// represented as a one-element sequence.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ActionPlan {
    sequence: Vec<ActionStep>,
}

impl ActionPlan {
    /// Returns `None` for an empty step list.
    pub fn new(steps: Vec<ActionStep>) -> Option<Self> {
        if steps.is_empty() {
            None
        } else {
            Some(Self { sequence: steps })
        }
    }

    /// Steps that came from a non-empty `StepList`, one per mapping.
    pub(crate) fn from_validated(steps: Vec<ActionStep>) -> Self {
        debug_assert!(!steps.is_empty());
        Self { sequence: steps }
    }

    pub fn steps(&self) -> &[ActionStep] {
        &self.sequence
    }

    pub fn len(&self) -> usize {
        self.sequence.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sequence.is_empty()
    }

    /// Canonical wire form: `{"sequence": [...]}`.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({ "sequence": self.sequence })
    }
}
