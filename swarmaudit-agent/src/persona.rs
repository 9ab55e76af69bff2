//! Persona analyzers backed by a language model

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};
use swarmaudit_core::RawAnalysisResult;
use tracing::debug;

use crate::analyzer::{Analyzer, AnalyzerError};
use crate::backend::{GenerateRequest, LlmBackend};
use crate::config::PersonaConfig;

/// Longest slice of a bad answer quoted back in errors
const ERROR_EXCERPT_CHARS: usize = 120;

/// An analyzer that asks a model, in character, to review a file
///
/// The persona's system prompt is expected to ask for a single JSON object
/// shaped like [`RawAnalysisResult`]; this type only interprets the answer.
pub struct PersonaAnalyzer {
    /// Persona settings
    config: PersonaConfig,
    /// Model backend
    backend: Arc<dyn LlmBackend>,
}

impl std::fmt::Debug for PersonaAnalyzer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PersonaAnalyzer")
            .field("name", &self.config.name)
            .field("model", &self.backend.model())
            .finish()
    }
}

impl PersonaAnalyzer {
    /// Create a persona analyzer
    pub fn new(config: PersonaConfig, backend: Arc<dyn LlmBackend>) -> Self {
        Self { config, backend }
    }

    /// Persona settings
    pub fn config(&self) -> &PersonaConfig {
        &self.config
    }

    /// Build the user message for one file
    pub fn build_prompt(&self, source_code: &str, filename: &str) -> String {
        format!(
            "Analyze this code from file '{}'. Respond with a single JSON object.\n\n```\n{}\n```",
            filename, source_code
        )
    }
}

#[async_trait]
impl Analyzer for PersonaAnalyzer {
    fn name(&self) -> &str {
        &self.config.name
    }

    async fn hunt(
        &self,
        source_code: &str,
        filename: &str,
    ) -> Result<RawAnalysisResult, AnalyzerError> {
        let request = GenerateRequest::new(self.build_prompt(source_code, filename))
            .with_system(&self.config.system_prompt)
            .with_temperature(self.config.temperature)
            .with_max_tokens(self.config.max_tokens);

        let response = self.backend.generate(request).await?;
        debug!(
            "{} answered for {} in {:?}",
            self.config.name, filename, response.latency
        );

        parse_analysis(&response.content)
    }
}

/// Interpret a model answer as a structured result
///
/// Accepts a bare JSON object, one wrapped in a Markdown code fence, or one
/// embedded in surrounding prose, even prose that quotes braces. When several
/// objects are present, the first one carrying a verdict flag wins, with
/// fenced objects ahead of the rest.
pub fn parse_analysis(answer: &str) -> Result<RawAnalysisResult, AnalyzerError> {
    let mut objects: Vec<Map<String, Value>> = fenced_blocks(answer)
        .into_iter()
        .flat_map(json_objects)
        .collect();
    objects.extend(json_objects(answer));

    let chosen = objects
        .iter()
        .position(has_verdict)
        .or_else(|| (!objects.is_empty()).then_some(0));
    let Some(chosen) = chosen else {
        return Err(AnalyzerError::InvalidResponse(format!(
            "no JSON object in {:?}",
            excerpt(answer)
        )));
    };

    let object = objects.swap_remove(chosen);
    serde_json::from_value(Value::Object(object))
        .map_err(|e| AnalyzerError::InvalidResponse(format!("{e} in {:?}", excerpt(answer))))
}

/// Every top-level JSON object in `text`, in order
///
/// Tries each `{` as a start; a start that does not begin valid JSON is
/// skipped, and a parsed object is not searched again for nested ones.
fn json_objects(text: &str) -> Vec<Map<String, Value>> {
    let mut objects = Vec::new();
    let mut cursor = 0;

    while let Some(found) = text[cursor..].find('{') {
        let start = cursor + found;
        let mut stream = serde_json::Deserializer::from_str(&text[start..]).into_iter::<Value>();
        match stream.next() {
            Some(Ok(Value::Object(map))) => {
                objects.push(map);
                cursor = start + stream.byte_offset();
            }
            _ => cursor = start + 1,
        }
    }

    objects
}

fn has_verdict(object: &Map<String, Value>) -> bool {
    object.contains_key("found_vulnerability") || object.contains_key("optimization_opportunity")
}

/// Contents of every fenced block
fn fenced_blocks(text: &str) -> Vec<&str> {
    let mut blocks = Vec::new();
    let mut rest = text;

    while let Some(open) = rest.find("```") {
        let after_open = &rest[open + 3..];
        // Skip the info string ("json") up to the end of the line
        let Some(newline) = after_open.find('\n') else {
            break;
        };
        let content = &after_open[newline + 1..];
        let Some(close) = content.find("```") else {
            break;
        };
        blocks.push(&content[..close]);
        rest = &content[close + 3..];
    }

    blocks
}

fn excerpt(text: &str) -> String {
    text.chars().take(ERROR_EXCERPT_CHARS).collect()
}
