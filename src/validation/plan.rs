// src/validation/plan.rs

use crate::config::RecoveryConfig;
use crate::protocol::{ActionPlan, ActionStep};
use crate::validation::shape::{StepList, StepMapping};
use serde_json::{Value, json};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StepErrorKind {
    #[error("missing field '{0}'")]
    MissingField(&'static str),
    #[error("unknown action '{0}'")]
    UnknownAction(String),
    #[error("field '{0}' must be a string")]
    InvalidFieldType(&'static str),
}

/// A step-level failure, tagged with the step's position in the sequence.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("step {step_index}: {kind}")]
pub struct PlanValidationError {
    pub step_index: usize,
    pub kind: StepErrorKind,
}

impl PlanValidationError {
    pub fn hint(&self, config: &RecoveryConfig) -> (String, Option<Value>) {
        match &self.kind {
            StepErrorKind::MissingField(field) => (
                "Missing required field.".to_string(),
                Some(json!({ field.to_string(): "<required>" })),
            ),
            StepErrorKind::UnknownAction(action) => (
                "Unknown action verb. Use one of the configured actions.".to_string(),
                Some(json!({ "action": action, "allowed": config.vocabulary })),
            ),
            StepErrorKind::InvalidFieldType(field) => (
                "Field must be a plain string, not an object or list.".to_string(),
                Some(json!({ field.to_string(): "<text>" })),
            ),
        }
    }
}

/// Validates every step, failing on the first bad one. Steps keep their order.
pub fn validate_plan(
    steps: &StepList,
    config: &RecoveryConfig,
) -> Result<ActionPlan, PlanValidationError> {
    let steps = steps
        .as_slice()
        .iter()
        .enumerate()
        .map(|(index, step)| validate_step(index, step, config))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(ActionPlan::from_validated(steps))
}

/// Every violation across all steps, for diagnostics.
pub fn find_violations(steps: &StepList, config: &RecoveryConfig) -> Vec<PlanValidationError> {
    steps
        .as_slice()
        .iter()
        .enumerate()
        .filter_map(|(index, step)| validate_step(index, step, config).err())
        .collect()
}

pub fn validate_step(
    index: usize,
    step: &StepMapping,
    config: &RecoveryConfig,
) -> Result<ActionStep, PlanValidationError> {
    let fail = |kind| PlanValidationError {
        step_index: index,
        kind,
    };

    let object = required_text(step, "object").map_err(fail)?;
    let action = required_text(step, "action").map_err(fail)?;
    let target_position = required_text(step, "target_position").map_err(fail)?;
    let initial_position = optional_text(step, "initial_position").map_err(fail)?;

    if !config.is_canonical(&action) {
        return Err(fail(StepErrorKind::UnknownAction(action)));
    }

    Ok(ActionStep {
        object,
        action,
        target_position,
        initial_position,
    })
}

fn required_text(step: &StepMapping, field: &'static str) -> Result<String, StepErrorKind> {
    optional_text(step, field)?.ok_or(StepErrorKind::MissingField(field))
}

/// Absent, null and blank all read as `None`. Numbers and booleans are
/// accepted in their textual form.
fn optional_text(step: &StepMapping, field: &'static str) -> Result<Option<String>, StepErrorKind> {
    let text = match step.get(field) {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        Some(Value::Array(_) | Value::Object(_)) => {
            return Err(StepErrorKind::InvalidFieldType(field));
        }
    };
    Ok((!text.is_empty()).then_some(text))
}
