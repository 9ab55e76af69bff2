//! Severity levels and ranking

use serde::{Deserialize, Serialize};

/// Severity levels for findings
///
/// Analyzers report severity as free text. The five canonical labels map onto
/// their variants; anything else is kept verbatim in `Unrecognized` so that it
/// survives normalization, ranks lowest during merges and stays out of the
/// benchmark histogram.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Severity {
    /// Severe impact, immediate action required
    Critical,
    /// Significant impact
    High,
    /// Moderate impact
    Medium,
    /// Minimal impact
    Low,
    /// Informational finding or optimization hint
    Informational,
    /// Label outside the known set, carried as reported
    Unrecognized(String),
}

impl Severity {
    /// The known severities, highest first
    pub const KNOWN: [Severity; 5] = [
        Severity::Critical,
        Severity::High,
        Severity::Medium,
        Severity::Low,
        Severity::Informational,
    ];

    /// Parse one of the canonical labels (exact match)
    pub fn parse(label: &str) -> Option<Self> {
        match label {
            "Critical" => Some(Severity::Critical),
            "High" => Some(Severity::High),
            "Medium" => Some(Severity::Medium),
            "Low" => Some(Severity::Low),
            "Informational" => Some(Severity::Informational),
            _ => None,
        }
    }

    /// Canonical label, or the carried label for unrecognized severities
    pub fn as_str(&self) -> &str {
        match self {
            Severity::Critical => "Critical",
            Severity::High => "High",
            Severity::Medium => "Medium",
            Severity::Low => "Low",
            Severity::Informational => "Informational",
            Severity::Unrecognized(label) => label,
        }
    }

    /// Merge rank: Critical=4 down to Informational=0; unrecognized ranks 0
    pub fn rank(&self) -> u8 {
        match self {
            Severity::Critical => 4,
            Severity::High => 3,
            Severity::Medium => 2,
            Severity::Low => 1,
            Severity::Informational | Severity::Unrecognized(_) => 0,
        }
    }

    /// Whether this is one of the five canonical severities
    pub fn is_known(&self) -> bool {
        !matches!(self, Severity::Unrecognized(_))
    }

    /// True if `self` outranks `other` strictly
    pub fn outranks(&self, other: &Severity) -> bool {
        self.rank() > other.rank()
    }
}

impl From<&str> for Severity {
    fn from(label: &str) -> Self {
        Severity::parse(label).unwrap_or_else(|| Severity::Unrecognized(label.to_string()))
    }
}

impl From<String> for Severity {
    fn from(label: String) -> Self {
        match Severity::parse(&label) {
            Some(known) => known,
            None => Severity::Unrecognized(label),
        }
    }
}

impl From<Severity> for String {
    fn from(severity: Severity) -> Self {
        match severity {
            Severity::Unrecognized(label) => label,
            known => known.as_str().to_string(),
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
