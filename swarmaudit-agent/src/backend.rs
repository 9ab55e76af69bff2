//! Model backend seam used by persona analyzers
//!
//! Provider clients (hosted APIs, local runtimes) live in the embedding
//! application and plug in through [`LlmBackend`].

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Sampling temperature for audit prompts; verdicts should be repeatable
const AUDIT_TEMPERATURE: f32 = 0.2;

/// Answer budget for one verdict object
const AUDIT_MAX_TOKENS: u32 = 1024;

/// Ways a backend call can fail
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LlmError {
    #[error("Backend unreachable: {0}")]
    ConnectionFailed(String),

    #[error("Backend rejected request: {0}")]
    RequestFailed(String),

    #[error("Rate limited, retry after {0:?}")]
    RateLimited(Duration),

    #[error("Backend credentials rejected")]
    AuthFailed,

    #[error("Backend gave no answer within {0:?}")]
    Timeout(Duration),

    #[error("Backend answer unusable: {0}")]
    InvalidResponse(String),
}

/// One prompt sent to a backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerateRequest {
    /// User message
    pub prompt: String,
    /// Persona instructions
    pub system: Option<String>,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl GenerateRequest {
    /// Request with audit defaults (low temperature, one verdict's worth of tokens)
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            system: None,
            temperature: AUDIT_TEMPERATURE,
            max_tokens: AUDIT_MAX_TOKENS,
        }
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature.clamp(0.0, 2.0);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }
}

/// A backend's answer
#[derive(Debug, Clone, PartialEq)]
pub struct GenerateResponse {
    /// Answer text
    pub content: String,
    /// Model that produced the answer
    pub model: String,
    pub latency: Duration,
    /// Token usage, when the provider reports it
    pub input_tokens: Option<u32>,
    pub output_tokens: Option<u32>,
}

impl GenerateResponse {
    /// Prompt plus answer tokens, when both are known
    pub fn total_tokens(&self) -> Option<u32> {
        self.input_tokens?.checked_add(self.output_tokens?)
    }
}

/// A language model that answers prompts
#[async_trait]
pub trait LlmBackend: Send + Sync {
    /// Model identifier, for logs
    fn model(&self) -> &str;

    async fn generate(&self, request: GenerateRequest) -> Result<GenerateResponse, LlmError>;

    /// Ask once with persona instructions and return only the text
    async fn generate_with_system(&self, prompt: &str, system: &str) -> Result<String, LlmError> {
        let response = self
            .generate(GenerateRequest::new(prompt).with_system(system))
            .await?;
        Ok(response.content)
    }
}
