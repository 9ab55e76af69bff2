//! In-memory backend that replies from a script
//!
//! Useful for tests and dry runs: replies are chosen by substring match on the
//! request's prompt or system message, falling back to a default reply.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Instant;

use async_trait::async_trait;

use crate::backend::{GenerateRequest, GenerateResponse, LlmBackend, LlmError};

/// Reply used when nothing in the script matches
const CLEAR_REPLY: &str = r#"{"found_vulnerability": false}"#;

/// Backend with canned replies
#[derive(Debug)]
pub struct ScriptedBackend {
    model: String,
    responses: Vec<(String, String)>,
    default_reply: String,
    failure: Option<LlmError>,
    call_count: AtomicUsize,
    requests: Mutex<Vec<GenerateRequest>>,
}

impl Default for ScriptedBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedBackend {
    /// Backend that reports nothing for every request
    pub fn new() -> Self {
        Self::replying(CLEAR_REPLY)
    }

    /// Backend that answers every request with `reply`
    pub fn replying(reply: impl Into<String>) -> Self {
        Self {
            model: "scripted".to_string(),
            responses: Vec::new(),
            default_reply: reply.into(),
            failure: None,
            call_count: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Backend that fails every request with `error`
    pub fn failing(error: LlmError) -> Self {
        let mut backend = Self::new();
        backend.failure = Some(error);
        backend
    }

    /// Reply with `reply` when the prompt or system message contains `pattern`
    pub fn with_response(mut self, pattern: impl Into<String>, reply: impl Into<String>) -> Self {
        self.responses.push((pattern.into(), reply.into()));
        self
    }

    /// Report a different model name
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Number of requests received
    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }

    /// Copies of the requests received so far
    pub fn requests(&self) -> Vec<GenerateRequest> {
        self.requests
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn pick_reply(&self, request: &GenerateRequest) -> &str {
        let system = request.system.as_deref().unwrap_or_default();
        self.responses
            .iter()
            .find(|(pattern, _)| request.prompt.contains(pattern) || system.contains(pattern))
            .map(|(_, reply)| reply.as_str())
            .unwrap_or(&self.default_reply)
    }
}

#[async_trait]
impl LlmBackend for ScriptedBackend {
    fn model(&self) -> &str {
        &self.model
    }

    async fn generate(&self, request: GenerateRequest) -> Result<GenerateResponse, LlmError> {
        let start = Instant::now();
        self.call_count.fetch_add(1, Ordering::SeqCst);
        self.requests
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(request.clone());

        if let Some(error) = &self.failure {
            return Err(error.clone());
        }

        let content = self.pick_reply(&request).to_string();
        Ok(GenerateResponse {
            output_tokens: Some((content.len() / 4) as u32),
            input_tokens: Some((request.prompt.len() / 4) as u32),
            content,
            model: self.model.clone(),
            latency: start.elapsed(),
        })
    }
}
