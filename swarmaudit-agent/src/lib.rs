//! # SwarmAudit Agent
//!
//! Analyzer swarm orchestration for SwarmAudit.
//!
//! Provides:
//! - The `Analyzer` capability and an ordered registry of analyzers
//! - Persona analyzers that ask a language model backend for a verdict
//! - Concurrent fan-out with isolation, bounded concurrency and timeouts
//! - An audit pipeline that merges findings and records a benchmark per run
//!
//! Concrete network clients are not included; plug one in through
//! [`LlmBackend`]. [`ScriptedBackend`] answers from memory.

pub mod analyzer;
pub mod backend;
pub mod config;
pub mod persona;
pub mod pipeline;
pub mod registry;
pub mod scripted;
pub mod swarm;

// Analyzer capability
pub use analyzer::{Analyzer, AnalyzerError, FixedAnalyzer};

// Model backends
pub use backend::{GenerateRequest, GenerateResponse, LlmBackend, LlmError};
pub use scripted::ScriptedBackend;

// Personas and configuration
pub use config::{PersonaConfig, SwarmConfig};
pub use persona::{parse_analysis, PersonaAnalyzer};
pub use registry::{AnalyzerRegistry, BackendFactory};

// Orchestration
pub use pipeline::{AuditOutcome, AuditPipeline, SourceFile};
pub use swarm::{normalize, AnalyzerOutcome, AnalyzerReport, Swarm, SwarmRun};

// Data model
pub use swarmaudit_core::{
    BenchmarkRecorder, DedupStrategy, Finding, RawAnalysisResult, Severity,
};
