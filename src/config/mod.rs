// src/config/mod.rs

//! Process-wide configuration: the recovery vocabulary, the generation
//! backend and logging level.

use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;
use std::sync::{Arc, RwLock};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Invalid config: {0}")]
    Invalid(String),
}

const BASE_VOCABULARY: &[&str] = &["move", "rotate", "scale"];
const EXTENDED_VOCABULARY: &[&str] = &["jump", "grow", "shrink", "fade", "bounce"];

const DEFAULT_SYNONYMS: &[(&str, &str)] = &[
    ("spin", "rotate"),
    ("turn", "rotate"),
    ("twist", "rotate"),
    ("revolve", "rotate"),
    ("slide", "move"),
    ("push", "move"),
    ("shift", "move"),
    ("place", "move"),
    ("put", "move"),
    ("drag", "move"),
    ("carry", "move"),
    ("bring", "move"),
    ("send", "move"),
    ("relocate", "move"),
    ("resize", "scale"),
    ("enlarge", "scale"),
    ("shrink", "scale"),
    ("grow", "scale"),
    ("expand", "scale"),
];

const DEFAULT_SENTINELS: &[&str] = &[
    "<|eot_id|>",
    "<|end_of_text|>",
    "<|endoftext|>",
    "<|im_end|>",
    "</s>",
    "<eos>",
];

const DEFAULT_RESPONSE_MARKERS: &[&str] = &["### Response:", "Response:", "Output:"];

/// Everything the recovery pipeline reads besides its input text.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RecoveryConfig {
    pub vocabulary: BTreeSet<String>,
    pub synonyms: BTreeMap<String, String>,
    pub sentinels: Vec<String>,
    pub response_markers: Vec<String>,
}

impl Default for RecoveryConfig {
    fn default() -> Self {
        Self {
            vocabulary: BASE_VOCABULARY.iter().map(|v| v.to_string()).collect(),
            synonyms: DEFAULT_SYNONYMS
                .iter()
                .map(|(from, to)| (from.to_string(), to.to_string()))
                .collect(),
            sentinels: DEFAULT_SENTINELS.iter().map(|s| s.to_string()).collect(),
            response_markers: DEFAULT_RESPONSE_MARKERS
                .iter()
                .map(|m| m.to_string())
                .collect(),
        }
    }
}

impl RecoveryConfig {
    /// Base vocabulary plus the animation verbs used by the chained-instruction prompt.
    pub fn extended_vocabulary() -> Self {
        let mut config = Self::default();
        config
            .vocabulary
            .extend(EXTENDED_VOCABULARY.iter().map(|v| v.to_string()));
        config
    }

    pub fn with_vocabulary<I, S>(mut self, verbs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.vocabulary = verbs.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_synonym(mut self, from: &str, to: &str) -> Self {
        self.synonyms.insert(from.to_lowercase(), to.to_lowercase());
        self
    }

    pub fn is_canonical(&self, verb: &str) -> bool {
        self.vocabulary.contains(verb)
    }

    /// Lower-cases and trims `raw`, then maps it through the synonym table.
    /// Canonical verbs are returned as-is even when the table lists them.
    /// Unknown verbs pass through unchanged.
    pub fn canonical_action(&self, raw: &str) -> String {
        let verb = raw.trim().to_lowercase();
        if self.is_canonical(&verb) {
            return verb;
        }
        match self.synonyms.get(&verb) {
            Some(canonical) => canonical.clone(),
            None => verb,
        }
    }

    /// Lower-cases vocabulary and synonym keys, then checks internal consistency.
    pub fn validated(mut self) -> Result<Self, ConfigError> {
        self.vocabulary = self
            .vocabulary
            .into_iter()
            .map(|v| v.trim().to_lowercase())
            .collect();
        self.synonyms = self
            .synonyms
            .into_iter()
            .map(|(k, v)| (k.trim().to_lowercase(), v.trim().to_lowercase()))
            .collect();

        if self.vocabulary.is_empty() || self.vocabulary.iter().any(|v| v.is_empty()) {
            return Err(ConfigError::Invalid(
                "recovery.vocabulary must contain at least one non-empty verb".to_string(),
            ));
        }
        for (from, to) in &self.synonyms {
            if !self.vocabulary.contains(to) {
                return Err(ConfigError::Invalid(format!(
                    "recovery.synonyms maps '{from}' to '{to}', which is not in the vocabulary"
                )));
            }
        }
        if self.sentinels.iter().any(|s| s.is_empty()) {
            return Err(ConfigError::Invalid(
                "recovery.sentinels must not contain empty strings".to_string(),
            ));
        }
        if self.response_markers.iter().any(|m| m.is_empty()) {
            return Err(ConfigError::Invalid(
                "recovery.response_markers must not contain empty strings".to_string(),
            ));
        }
        Ok(self)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    Ollama,
    Mock,
}

impl std::str::FromStr for BackendKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ollama" => Ok(Self::Ollama),
            "mock" => Ok(Self::Mock),
            other => Err(ConfigError::Invalid(format!("unknown backend: {other}"))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    pub kind: BackendKind,
    pub url: String,
    pub model: String,
    pub max_new_tokens: u32,
    pub temperature: f32,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            kind: BackendKind::Mock,
            url: "http://localhost:11434".into(),
            model: "llama3.1".into(),
            max_new_tokens: 128,
            temperature: 0.1,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub log_level: String,
    pub recovery: RecoveryConfig,
    pub backend: BackendConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_level: "info".into(),
            recovery: RecoveryConfig::default(),
            backend: BackendConfig::default(),
        }
    }
}

impl Settings {
    /// Reads `path` when given (defaults otherwise), then applies env overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let settings = match path {
            Some(path) => Self::from_toml(&fs::read_to_string(path)?)?,
            None => Self::default(),
        };
        settings.with_env_overrides(|key| std::env::var(key).ok())
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let mut settings: Settings = toml::from_str(content)?;
        settings.recovery = settings.recovery.validated()?;
        Ok(settings)
    }

    /// `lookup` stands in for the process environment so tests stay hermetic.
    pub fn with_env_overrides<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(kind) = lookup("LLM_BACKEND") {
            self.backend.kind = kind.parse()?;
        }
        if let Some(url) = lookup("OLLAMA_URL") {
            self.backend.url = url;
        }
        if let Some(model) = lookup("OLLAMA_MODEL") {
            self.backend.model = model;
        }
        if let Some(tokens) = lookup("MAX_NEW_TOKENS") {
            self.backend.max_new_tokens = tokens.trim().parse().map_err(|_| {
                ConfigError::Invalid(format!("MAX_NEW_TOKENS is not an integer: {tokens}"))
            })?;
        }
        if let Some(temperature) = lookup("TEMPERATURE") {
            self.backend.temperature = temperature.trim().parse().map_err(|_| {
                ConfigError::Invalid(format!("TEMPERATURE is not a number: {temperature}"))
            })?;
        }
        if let Some(level) = lookup("LOG_LEVEL") {
            self.log_level = level;
        }
        Ok(self)
    }
}

/// Read-mostly handle to the active [`RecoveryConfig`].
///
/// Readers take a cheap `Arc` snapshot and run the pipeline against it
/// without holding the lock; `replace` swaps the whole value so no reader
/// ever observes a half-updated table.
#[derive(Debug)]
pub struct SharedConfig {
    inner: RwLock<Arc<RecoveryConfig>>,
}

impl SharedConfig {
    pub fn new(config: RecoveryConfig) -> Self {
        Self {
            inner: RwLock::new(Arc::new(config)),
        }
    }

    pub fn current(&self) -> Arc<RecoveryConfig> {
        match self.inner.read() {
            Ok(guard) => Arc::clone(&*guard),
            Err(poisoned) => Arc::clone(&*poisoned.into_inner()),
        }
    }

    pub fn replace(&self, config: RecoveryConfig) {
        let next = Arc::new(config);
        match self.inner.write() {
            Ok(mut guard) => *guard = next,
            Err(poisoned) => *poisoned.into_inner() = next,
        }
    }
}

impl Default for SharedConfig {
    fn default() -> Self {
        Self::new(RecoveryConfig::default())
    }
}
