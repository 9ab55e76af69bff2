//! The analyzer capability

use std::time::Duration;

use async_trait::async_trait;
use swarmaudit_core::RawAnalysisResult;
use thiserror::Error;

use crate::backend::LlmError;

/// Why an analyzer produced no result
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnalyzerError {
    /// The model backend failed
    #[error("Backend error: {0}")]
    Backend(#[from] LlmError),

    /// The answer could not be interpreted as a structured result
    #[error("Invalid analyzer response: {0}")]
    InvalidResponse(String),

    /// The analyzer did not answer in time
    #[error("Analyzer timed out after {0:?}")]
    Timeout(Duration),

    /// The analyzer panicked while running
    #[error("Analyzer panicked: {0}")]
    Panicked(String),

    /// Another analyzer with this name is already registered
    #[error("Analyzer already registered: {0}")]
    DuplicateName(String),
}

/// One independent detection heuristic
///
/// Implementations must not share mutable state with each other; the swarm
/// runs them concurrently over the same input.
#[async_trait]
pub trait Analyzer: Send + Sync {
    /// Identity reported in `Finding::detected_by`
    fn name(&self) -> &str;

    /// Inspect one source file
    async fn hunt(
        &self,
        source_code: &str,
        filename: &str,
    ) -> Result<RawAnalysisResult, AnalyzerError>;
}

/// Analyzer that always returns the same result
///
/// Handy for wiring tests and for static rule stubs.
#[derive(Debug, Clone)]
pub struct FixedAnalyzer {
    name: String,
    result: Result<RawAnalysisResult, AnalyzerError>,
}

impl FixedAnalyzer {
    /// Always answer with `result`
    pub fn new(name: impl Into<String>, result: RawAnalysisResult) -> Self {
        Self {
            name: name.into(),
            result: Ok(result),
        }
    }

    /// Always fail with `error`
    pub fn failing(name: impl Into<String>, error: AnalyzerError) -> Self {
        Self {
            name: name.into(),
            result: Err(error),
        }
    }
}

#[async_trait]
impl Analyzer for FixedAnalyzer {
    fn name(&self) -> &str {
        &self.name
    }

    async fn hunt(
        &self,
        _source_code: &str,
        _filename: &str,
    ) -> Result<RawAnalysisResult, AnalyzerError> {
        self.result.clone()
    }
}
