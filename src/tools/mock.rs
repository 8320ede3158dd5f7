// src/tools/mock.rs

use crate::prompt::RESPONSE_MARKER;
use crate::tools::{GenerationError, Generator};
use serde_json::json;

const ARTICLES: [&str; 3] = ["the", "a", "an"];

/// Offline backend for development and tests.
///
/// Reads the instruction back out of the prompt and answers the way a
/// chatty model would: marker, one JSON step, end-of-turn token.
pub struct MockGenerator;

impl MockGenerator {
    pub fn respond(instruction: &str) -> String {
        let words: Vec<String> = instruction
            .split_whitespace()
            .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()).to_lowercase())
            .filter(|w| !w.is_empty())
            .collect();

        let action = words.first().cloned().unwrap_or_else(|| "move".into());

        let object = words
            .iter()
            .position(|w| ARTICLES.contains(&w.as_str()))
            .filter(|&i| i + 2 < words.len())
            .map(|i| format!("{} {}", words[i + 1], words[i + 2]))
            .unwrap_or_else(|| "object from instruction".into());

        let target = words
            .iter()
            .rposition(|w| w == "to")
            .map(|i| {
                words[i + 1..]
                    .iter()
                    .filter(|w| !ARTICLES.contains(&w.as_str()))
                    .cloned()
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| "center".into());

        let step = json!({
            "object": object,
            "initial_position": "floor",
            "action": action,
            "target_position": target,
        });
        format!("{RESPONSE_MARKER}\n{step}<|eot_id|>")
    }
}

impl Generator for MockGenerator {
    fn name(&self) -> &str {
        "mock"
    }

    fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        Ok(Self::respond(instruction_from_prompt(prompt)))
    }

    fn ready(&self) -> Result<(), GenerationError> {
        Ok(())
    }
}

/// The text between `### Input:` and the response marker, or the whole prompt.
fn instruction_from_prompt(prompt: &str) -> &str {
    prompt
        .rsplit_once("### Input:")
        .map(|(_, rest)| rest.split(RESPONSE_MARKER).next().unwrap_or(rest))
        .unwrap_or(prompt)
        .trim()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prompt::format_prompt;
    use crate::config::RecoveryConfig;

    #[test]
    fn recovers_instruction_from_prompt() {
        let prompt = format_prompt("Spin the green sphere", &RecoveryConfig::default().vocabulary);
        assert_eq!(instruction_from_prompt(&prompt), "Spin the green sphere");
        assert_eq!(instruction_from_prompt("bare text"), "bare text");
    }

    #[test]
    fn response_is_noisy_but_recoverable_json() {
        let out = MockGenerator::respond("Move the red box to the blue platform.");
        assert!(out.starts_with(RESPONSE_MARKER));
        assert!(out.ends_with("<|eot_id|>"));

        let body = out
            .trim_start_matches(RESPONSE_MARKER)
            .trim_end_matches("<|eot_id|>")
            .trim();
        let value: serde_json::Value = serde_json::from_str(body).unwrap();
        assert_eq!(value["object"], "red box");
        assert_eq!(value["action"], "move");
        assert_eq!(value["target_position"], "blue platform");
    }

    #[test]
    fn falls_back_when_instruction_has_no_article() {
        let out = MockGenerator::respond("jump");
        assert!(out.contains("\"object\":\"object from instruction\""));
        assert!(out.contains("\"target_position\":\"center\""));
    }
}
