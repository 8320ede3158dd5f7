// src/pipeline/mod.rs

//! Raw model output in, validated [`ActionPlan`] or classified error out.
//!
//! Stages run strictly in order (extract, parse, normalize, resolve shape,
//! validate) and the first failure is returned as-is. The pipeline holds no
//! state of its own, so any number of callers may run it concurrently
//! against a shared [`RecoveryConfig`].

use crate::config::RecoveryConfig;
use crate::extraction::extract_candidate;
use crate::normalize::normalize;
use crate::protocol::ActionPlan;
use crate::validation::{
    PlanValidationError, StepList, find_violations, resolve_shape, validate_plan,
};
use serde_json::Value;
use std::fmt;
use thiserror::Error;
use tracing::{debug, warn};

const EXCERPT_CHARS: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Extract,
    Parse,
    ResolveShape,
    Validate,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Extract => "extract",
            Stage::Parse => "parse",
            Stage::ResolveShape => "resolve_shape",
            Stage::Validate => "validate",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecoveryErrorKind {
    #[error("could not interpret model output: no JSON object found")]
    ExtractionFailed,
    #[error("malformed JSON at line {line}, column {column}: {cause}")]
    MalformedJson {
        line: usize,
        column: usize,
        cause: String,
    },
    #[error("unrecognized plan shape (top-level keys: [{}])", .keys.join(", "))]
    ShapeUnrecognized { keys: Vec<String> },
    #[error(transparent)]
    Step(#[from] PlanValidationError),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{stage} stage failed: {kind}")]
pub struct RecoveryError {
    pub stage: Stage,
    pub kind: RecoveryErrorKind,
    /// Raw model output, truncated for logs.
    pub raw_excerpt: String,
}

impl RecoveryError {
    fn new(stage: Stage, kind: RecoveryErrorKind, raw: &str) -> Self {
        Self {
            stage,
            kind,
            raw_excerpt: excerpt(raw),
        }
    }

    /// Step position for step-level failures.
    pub fn step_index(&self) -> Option<usize> {
        match &self.kind {
            RecoveryErrorKind::Step(e) => Some(e.step_index),
            _ => None,
        }
    }

    /// Every recovery failure is a problem with the model output, never a
    /// fault in the service itself.
    pub fn status_code(&self) -> u16 {
        422
    }
}

/// Runs the full recovery pipeline over `raw`.
pub fn validate(raw: &str, config: &RecoveryConfig) -> Result<ActionPlan, RecoveryError> {
    resolve_steps(raw, config)
        .and_then(|steps| {
            validate_plan(&steps, config)
                .map_err(|e| RecoveryError::new(Stage::Validate, RecoveryErrorKind::Step(e), raw))
        })
        .inspect_err(|err| {
            warn!(stage = %err.stage, error = %err.kind, raw = %err.raw_excerpt, "plan recovery failed");
        })
}

/// Every step-level violation in `raw`, not just the first. Empty when an
/// earlier stage fails or every step is valid.
pub fn diagnose(raw: &str, config: &RecoveryConfig) -> Vec<PlanValidationError> {
    resolve_steps(raw, config)
        .map(|steps| find_violations(&steps, config))
        .unwrap_or_default()
}

/// Extract, parse, normalize and resolve shape.
fn resolve_steps(raw: &str, config: &RecoveryConfig) -> Result<StepList, RecoveryError> {
    let candidate = extract_candidate(raw, config)
        .ok_or_else(|| RecoveryError::new(Stage::Extract, RecoveryErrorKind::ExtractionFailed, raw))?;
    debug!(candidate = %candidate, "extracted JSON candidate");

    let parsed: Value = serde_json::from_str(&candidate).map_err(|e| {
        RecoveryError::new(
            Stage::Parse,
            RecoveryErrorKind::MalformedJson {
                line: e.line(),
                column: e.column(),
                cause: e.to_string(),
            },
            raw,
        )
    })?;

    let normalized = normalize(&parsed, config);

    let steps = resolve_shape(&normalized).map_err(|e| {
        RecoveryError::new(
            Stage::ResolveShape,
            RecoveryErrorKind::ShapeUnrecognized { keys: e.keys },
            raw,
        )
    })?;
    debug!(steps = steps.len(), "resolved plan shape");

    Ok(steps)
}

/// First `EXCERPT_CHARS` characters of `raw`, marked with `…` when cut.
pub fn excerpt(raw: &str) -> String {
    match raw.char_indices().nth(EXCERPT_CHARS) {
        Some((cut, _)) => format!("{}…", &raw[..cut]),
        None => raw.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::StepErrorKind;
    use pretty_assertions::assert_eq;

    fn run(raw: &str) -> Result<ActionPlan, RecoveryError> {
        validate(raw, &RecoveryConfig::default())
    }

    #[test]
    fn noisy_single_step_recovers() {
        let plan = run("### Response:\n{\"object\":\"ball\",\"action\":\"Spin\",\"target_position\":\"top_shelf\"}<|eot_id|>")
            .unwrap();
        assert_eq!(plan.len(), 1);
        assert_eq!(plan.steps()[0].action, "rotate");
        assert_eq!(plan.steps()[0].target_position, "top shelf");
    }

    #[test]
    fn extraction_failure_is_tagged_with_stage() {
        let err = run("I am not sure what you mean.").unwrap_err();
        assert_eq!(err.stage, Stage::Extract);
        assert_eq!(err.kind, RecoveryErrorKind::ExtractionFailed);
        assert_eq!(err.raw_excerpt, "I am not sure what you mean.");
        assert_eq!(err.step_index(), None);
    }

    #[test]
    fn malformed_json_reports_position() {
        let err = run("{\"object\": \"ball\", \"action\": move}").unwrap_err();
        assert_eq!(err.stage, Stage::Parse);
        match err.kind {
            RecoveryErrorKind::MalformedJson { line, column, .. } => {
                assert_eq!(line, 1);
                assert!(column > 0);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn unknown_shape_carries_keys() {
        let err = run("Response: {\"plan\": [{\"type\": \"tool\"}]}").unwrap_err();
        assert_eq!(err.stage, Stage::ResolveShape);
        assert_eq!(
            err.kind,
            RecoveryErrorKind::ShapeUnrecognized {
                keys: vec!["plan".into()]
            }
        );
    }

    #[test]
    fn step_failure_carries_index() {
        let err = run(r#"{"sequence": [{"object":"a","action":"move","target_position":"b"},{"object":"a","action":"dance","target_position":"c"}]}"#)
            .unwrap_err();
        assert_eq!(err.stage, Stage::Validate);
        assert_eq!(err.step_index(), Some(1));
        assert_eq!(
            err.kind,
            RecoveryErrorKind::Step(PlanValidationError {
                step_index: 1,
                kind: StepErrorKind::UnknownAction("dance".into()),
            })
        );
        assert_eq!(err.status_code(), 422);
    }

    #[test]
    fn diagnose_lists_every_bad_step() {
        let raw = r#"{"sequence": [
            {"object":"a","action":"dance","target_position":"b"},
            {"object":"a","action":"move","target_position":"c"},
            {"object":"a","action":"move"}
        ]}"#;
        let violations = diagnose(raw, &RecoveryConfig::default());
        let indices: Vec<usize> = violations.iter().map(|v| v.step_index).collect();
        assert_eq!(indices, vec![0, 2]);
        assert_eq!(violations[1].kind, StepErrorKind::MissingField("target_position"));

        assert!(diagnose("no json here", &RecoveryConfig::default()).is_empty());
    }

    #[test]
    fn excerpt_truncates_on_char_boundary() {
        let long = "é".repeat(250);
        let cut = excerpt(&long);
        assert_eq!(cut.chars().count(), EXCERPT_CHARS + 1);
        assert!(cut.ends_with('…'));
        assert_eq!(excerpt("short"), "short");
    }
}
