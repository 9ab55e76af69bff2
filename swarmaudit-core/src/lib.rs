//! # SwarmAudit Core
//!
//! Data model and batch transforms for the SwarmAudit analyzer swarm.
//!
//! Many independent analyzers look at the same source file. Their answers are
//! normalized into [`Finding`]s, duplicates are collapsed, and each run is
//! appended to a numbered benchmark ledger.
//!
//! ## Core Concepts
//!
//! - **Finding**: Canonical record of a vulnerability or optimization
//! - **Severity**: Critical > High > Medium > Low > Informational
//! - **Deduplication**: Merge findings that name the same issue
//! - **Benchmark ledger**: Append-only `run_NNN.json` records per run
//!
//! ## Example
//!
//! ```rust
//! use swarmaudit_core::{dedupe, Finding, Severity};
//!
//! let findings = vec![
//!     Finding::new("Reentrancy Bug", Severity::High, "A.sol", "Thief"),
//!     Finding::new("reentrancy bug", Severity::Critical, "B.sol", "Reentrancy Expert"),
//! ];
//!
//! let merged = dedupe(findings);
//! assert_eq!(merged.len(), 1);
//! assert_eq!(merged[0].severity, Severity::Critical);
//! assert_eq!(merged[0].file_paths.len(), 2);
//! ```

pub mod benchmark;
pub mod dedup;
pub mod error;
pub mod finding;
pub mod severity;

pub use benchmark::{
    BenchmarkDelta, BenchmarkRecord, BenchmarkRecorder, SeverityCounts, SeverityLabel,
};
pub use dedup::{dedupe, dedupe_per_location, DedupStrategy};
pub use error::{Result, SwarmAuditError};
pub use finding::{
    normalize_title, Finding, FindingKind, RawAnalysisResult, OPTIMIZATION_CONFIDENCE,
    VULNERABILITY_CONFIDENCE,
};
pub use severity::Severity;

/// Default directory for benchmark records
pub const DEFAULT_BENCHMARK_DIR: &str = "benchmarks";
