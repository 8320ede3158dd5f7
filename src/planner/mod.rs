// src/planner/mod.rs

use crate::config::SharedConfig;
use crate::pipeline::{self, RecoveryError};
use crate::prompt::format_prompt;
use crate::protocol::ActionPlan;
use crate::tools::{GenerationError, Generator};
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

pub const MAX_INSTRUCTION_CHARS: usize = 500;

#[derive(Debug, Error)]
pub enum PlannerError {
    #[error("invalid instruction: {0}")]
    InvalidInstruction(String),
    #[error("generation failed: {0}")]
    Generation(#[from] GenerationError),
    #[error(transparent)]
    Recovery(#[from] RecoveryError),
}

impl PlannerError {
    /// HTTP-style status: 422 for bad input or unusable model output, 500
    /// when the backend itself failed.
    pub fn status_code(&self) -> u16 {
        match self {
            PlannerError::InvalidInstruction(_) => 422,
            PlannerError::Generation(_) => 500,
            PlannerError::Recovery(e) => e.status_code(),
        }
    }
}

/// A trimmed, non-empty instruction of at most [`MAX_INSTRUCTION_CHARS`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instruction(String);

impl Instruction {
    pub fn parse(text: &str) -> Result<Self, PlannerError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(PlannerError::InvalidInstruction(
                "instruction must not be empty".into(),
            ));
        }
        let len = text.chars().count();
        if len > MAX_INSTRUCTION_CHARS {
            return Err(PlannerError::InvalidInstruction(format!(
                "instruction is {len} characters, limit is {MAX_INSTRUCTION_CHARS}"
            )));
        }
        Ok(Self(text.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Trait for turning a natural-language instruction into an [`ActionPlan`].
pub trait Planner: Send + Sync {
    fn generate_plan(&self, instruction: &str) -> Result<ActionPlan, PlannerError>;
}

/// Prompt, generate once, recover. No retries.
pub struct ActionPlanner {
    generator: Box<dyn Generator>,
    config: Arc<SharedConfig>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum BatchOutcome {
    Planned {
        instruction: String,
        #[serde(flatten)]
        plan: ActionPlan,
    },
    Failed {
        instruction: String,
        error: String,
        status: u16,
    },
}

impl BatchOutcome {
    pub fn is_planned(&self) -> bool {
        matches!(self, BatchOutcome::Planned { .. })
    }
}

impl ActionPlanner {
    pub fn new(generator: Box<dyn Generator>, config: Arc<SharedConfig>) -> Self {
        Self { generator, config }
    }

    pub fn backend_name(&self) -> &str {
        self.generator.name()
    }

    /// Readiness of the generation backend; no plan is produced.
    pub fn ready(&self) -> Result<(), PlannerError> {
        self.generator.ready().map_err(PlannerError::from)
    }

    pub fn plan(&self, instruction: &Instruction) -> Result<ActionPlan, PlannerError> {
        let config = self.config.current();
        let prompt = format_prompt(instruction.as_str(), &config.vocabulary);

        let raw = self.generator.generate(&prompt)?;
        let plan = pipeline::validate(&raw, &config)?;

        info!(
            backend = self.generator.name(),
            steps = plan.len(),
            instruction = instruction.as_str(),
            "generated action plan"
        );
        Ok(plan)
    }

    /// Each instruction runs independently; one failure never affects the others.
    pub fn plan_batch<S: AsRef<str>>(&self, instructions: &[S]) -> Vec<BatchOutcome> {
        instructions
            .iter()
            .map(|text| {
                let text = text.as_ref();
                match self.generate_plan(text) {
                    Ok(plan) => BatchOutcome::Planned {
                        instruction: text.to_string(),
                        plan,
                    },
                    Err(e) => {
                        warn!(instruction = text, error = %e, "batch item failed");
                        BatchOutcome::Failed {
                            instruction: text.to_string(),
                            error: e.to_string(),
                            status: e.status_code(),
                        }
                    }
                }
            })
            .collect()
    }
}

impl Planner for ActionPlanner {
    fn generate_plan(&self, instruction: &str) -> Result<ActionPlan, PlannerError> {
        self.plan(&Instruction::parse(instruction)?)
    }
}
