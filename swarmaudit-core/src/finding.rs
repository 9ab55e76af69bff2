//! Findings and raw analyzer results

use std::collections::BTreeSet;

use serde::{Deserialize, Deserializer, Serialize};

use crate::Severity;

/// Confidence label attached to vulnerability findings
pub const VULNERABILITY_CONFIDENCE: &str = "Verified by Swarm Reasoning";

/// Confidence label attached to optimization findings
pub const OPTIMIZATION_CONFIDENCE: &str = "Optimization recommendation";

/// What a finding describes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FindingKind {
    Vulnerability,
    Optimization,
}

impl FindingKind {
    /// Confidence label stamped on findings of this kind
    pub fn confidence(&self) -> &'static str {
        match self {
            FindingKind::Vulnerability => VULNERABILITY_CONFIDENCE,
            FindingKind::Optimization => OPTIMIZATION_CONFIDENCE,
        }
    }
}

/// Structured answer produced by one analyzer for one file
///
/// Every field is optional on the wire; the swarm fills in defaults when it
/// normalizes the result into a [`Finding`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawAnalysisResult {
    /// Analyzer believes the code is vulnerable
    #[serde(default)]
    pub found_vulnerability: bool,

    /// Analyzer found a gas/efficiency improvement
    #[serde(default)]
    pub optimization_opportunity: bool,

    /// Short name of the issue
    #[serde(default)]
    pub title: Option<String>,

    /// Reported severity
    #[serde(default)]
    pub severity: Option<Severity>,

    /// Step-by-step exploitation path
    #[serde(default)]
    pub kill_chain: Option<String>,

    /// Free-form description (optimizations)
    #[serde(default)]
    pub description: Option<String>,

    /// Reasoning behind an optimization
    #[serde(default)]
    pub attack_logic: Option<String>,

    /// Line the issue was spotted on
    #[serde(default, deserialize_with = "lenient_line_number")]
    pub line_number: Option<u32>,

    /// Proof-of-concept or test demonstrating the issue
    #[serde(default)]
    pub verification_proof: Option<String>,

    /// Estimated savings for optimizations
    #[serde(default)]
    pub gas_savings_estimate: Option<String>,
}

impl RawAnalysisResult {
    /// A result that reports nothing
    pub fn clear() -> Self {
        Self::default()
    }

    /// True when the result would produce a finding
    pub fn is_actionable(&self) -> bool {
        self.kind().is_some()
    }

    /// Kind of finding this result produces, vulnerability first
    pub fn kind(&self) -> Option<FindingKind> {
        if self.found_vulnerability {
            Some(FindingKind::Vulnerability)
        } else if self.optimization_opportunity {
            Some(FindingKind::Optimization)
        } else {
            None
        }
    }
}

/// Accept line numbers as JSON numbers or numeric strings
fn lenient_line_number<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum LineRepr {
        Number(u64),
        Float(f64),
        Text(String),
    }

    Ok(match Option::<LineRepr>::deserialize(deserializer)? {
        Some(LineRepr::Number(n)) => u32::try_from(n).ok(),
        Some(LineRepr::Float(f)) if f >= 0.0 && f <= u32::MAX as f64 => Some(f as u32),
        Some(LineRepr::Text(s)) => s.trim().parse().ok(),
        _ => None,
    })
}

/// Canonical, mergeable record of a detected issue
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    /// Issue title
    pub title: String,

    /// Human-readable description
    pub description: String,

    /// Severity level
    pub severity: Severity,

    /// Files the issue was reported in (never empty)
    pub file_paths: BTreeSet<String>,

    /// Line number, 0 when unknown
    pub line_number: u32,

    /// Confidence label
    pub confidence: String,

    /// Name of the analyzer that reported it
    pub detected_by: String,

    /// Attack or optimization reasoning
    pub attack_logic: String,

    /// Optional proof supplied by the analyzer
    pub verification_proof: Option<String>,
}

impl Finding {
    /// Create a finding located in a single file
    pub fn new(
        title: impl Into<String>,
        severity: Severity,
        file_path: impl Into<String>,
        detected_by: impl Into<String>,
    ) -> Self {
        let mut file_paths = BTreeSet::new();
        file_paths.insert(file_path.into());

        Self {
            title: title.into(),
            description: String::new(),
            severity,
            file_paths,
            line_number: 0,
            confidence: VULNERABILITY_CONFIDENCE.to_string(),
            detected_by: detected_by.into(),
            attack_logic: String::new(),
            verification_proof: None,
        }
    }

    /// Set description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Set line number
    pub fn with_line(mut self, line: u32) -> Self {
        self.line_number = line;
        self
    }

    /// Set confidence label
    pub fn with_confidence(mut self, confidence: impl Into<String>) -> Self {
        self.confidence = confidence.into();
        self
    }

    /// Set attack logic
    pub fn with_attack_logic(mut self, attack_logic: impl Into<String>) -> Self {
        self.attack_logic = attack_logic.into();
        self
    }

    /// Set verification proof
    pub fn with_verification_proof(mut self, proof: Option<String>) -> Self {
        self.verification_proof = proof;
        self
    }

    /// Add another file path
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.file_paths.insert(path.into());
        self
    }

    /// Title trimmed and case-folded, used as the merge key
    pub fn normalized_title(&self) -> String {
        normalize_title(&self.title)
    }

    /// Kind derived from the confidence label
    pub fn kind(&self) -> FindingKind {
        if self.confidence == OPTIMIZATION_CONFIDENCE {
            FindingKind::Optimization
        } else {
            FindingKind::Vulnerability
        }
    }

    /// Whether this finding is an optimization hint rather than a vulnerability
    pub fn is_optimization(&self) -> bool {
        self.kind() == FindingKind::Optimization
    }
}

/// Normalize a title for comparison
pub fn normalize_title(title: &str) -> String {
    title.trim().to_lowercase()
}
