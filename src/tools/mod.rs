// src/tools/mod.rs

//! Generation backends that turn a prompt into raw model text.

use crate::config::{BackendConfig, BackendKind};
use thiserror::Error;

pub mod llm;
pub mod mock;

pub use llm::OllamaGenerator;
pub use mock::MockGenerator;

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("backend returned an error: {0}")]
    Backend(String),
    #[error("backend response missing 'response' field")]
    MissingResponse,
    #[error("backend not ready: {0}")]
    NotReady(String),
}

/// A pluggable text generator. Implementations only produce raw text;
/// recovering a plan from it is the pipeline's job.
pub trait Generator: Send + Sync {
    fn name(&self) -> &str;
    fn generate(&self, prompt: &str) -> Result<String, GenerationError>;
    /// Whether the backend can serve requests right now.
    fn ready(&self) -> Result<(), GenerationError>;
}

pub fn build_generator(config: &BackendConfig) -> Box<dyn Generator> {
    match config.kind {
        BackendKind::Ollama => Box::new(OllamaGenerator::from_config(config)),
        BackendKind::Mock => Box::new(MockGenerator),
    }
}
