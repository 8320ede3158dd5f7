// src/tools/llm.rs

use crate::config::BackendConfig;
use crate::tools::{GenerationError, Generator};
use serde_json::{Value, json};
use tracing::debug;

/// Sends prompts to a local Ollama server via `/api/generate`.
pub struct OllamaGenerator {
    pub url: String,
    pub model: String,
    pub max_new_tokens: u32,
    pub temperature: f32,
    client: reqwest::blocking::Client,
}

impl OllamaGenerator {
    pub fn new(url: &str, model: &str) -> Self {
        let defaults = BackendConfig::default();
        Self {
            url: url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            max_new_tokens: defaults.max_new_tokens,
            temperature: defaults.temperature,
            client: reqwest::blocking::Client::new(),
        }
    }

    pub fn from_config(config: &BackendConfig) -> Self {
        Self {
            max_new_tokens: config.max_new_tokens,
            temperature: config.temperature,
            ..Self::new(&config.url, &config.model)
        }
    }

    fn payload(&self, prompt: &str) -> Value {
        json!({
            "model": self.model,
            "prompt": prompt,
            "stream": false,
            "options": {
                "temperature": self.temperature,
                "num_predict": self.max_new_tokens,
            }
        })
    }
}

impl Generator for OllamaGenerator {
    fn name(&self) -> &str {
        "ollama"
    }

    fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        let url = format!("{}/api/generate", self.url);
        debug!(%url, model = %self.model, "sending generation request");

        let body: Value = self
            .client
            .post(&url)
            .json(&self.payload(prompt))
            .send()?
            .json()?;

        read_response(&body)
    }

    /// Lists local models; the server must answer and know `self.model`.
    fn ready(&self) -> Result<(), GenerationError> {
        let url = format!("{}/api/tags", self.url);
        debug!(%url, "checking backend readiness");

        let body: Value = self.client.get(&url).send()?.error_for_status()?.json()?;
        check_model_listed(&body, &self.model)
    }
}

/// Ollama tags may carry an implicit `:latest` suffix.
fn check_model_listed(tags: &Value, model: &str) -> Result<(), GenerationError> {
    let listed = tags
        .get("models")
        .and_then(|v| v.as_array())
        .into_iter()
        .flatten()
        .filter_map(|m| m.get("name").and_then(|n| n.as_str()))
        .any(|name| name == model || name.strip_suffix(":latest") == Some(model));

    if listed {
        Ok(())
    } else {
        Err(GenerationError::NotReady(format!(
            "model '{model}' is not available on the server"
        )))
    }
}

/// Pulls the generated text out of an Ollama response body.
fn read_response(body: &Value) -> Result<String, GenerationError> {
    if let Some(err) = body.get("error") {
        let message = err.as_str().map_or_else(|| err.to_string(), str::to_string);
        return Err(GenerationError::Backend(message));
    }
    body.get("response")
        .and_then(|v| v.as_str())
        .map(|text| text.trim().to_string())
        .ok_or(GenerationError::MissingResponse)
}
