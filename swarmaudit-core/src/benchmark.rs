//! Benchmark ledger
//!
//! Every analysis run appends one immutable JSON record (`run_001.json`,
//! `run_002.json`, ...) to a benchmark directory. Records carry the run
//! duration and a histogram of finding severities so runs can be compared.
//!
//! The three-digit index keeps lexicographic and chronological order aligned
//! up to `run_999`; past that, names still sort but no longer chronologically.

use std::collections::HashMap;
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{Result, SwarmAuditError};
use crate::{Finding, Severity};

/// Prefix of benchmark record file names
const RECORD_PREFIX: &str = "run_";

/// Extension of benchmark record files
const RECORD_EXTENSION: &str = "json";

/// Timestamp format written to records
const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Attempts made when other writers keep claiming the next index
const MAX_CLAIM_ATTEMPTS: u32 = 64;

/// Anything that can report a severity label for the histogram
///
/// Implemented for typed findings and for plain key-valued records so that
/// results from other producers can be recorded too.
pub trait SeverityLabel {
    /// The severity label, if any
    fn severity_label(&self) -> Option<&str>;
}

impl SeverityLabel for Finding {
    fn severity_label(&self) -> Option<&str> {
        Some(self.severity.as_str())
    }
}

impl SeverityLabel for Severity {
    fn severity_label(&self) -> Option<&str> {
        Some(self.as_str())
    }
}

impl SeverityLabel for serde_json::Map<String, serde_json::Value> {
    fn severity_label(&self) -> Option<&str> {
        self.get("severity").and_then(serde_json::Value::as_str)
    }
}

impl SeverityLabel for serde_json::Value {
    fn severity_label(&self) -> Option<&str> {
        self.as_object().and_then(|map| map.severity_label())
    }
}

impl SeverityLabel for HashMap<String, String> {
    fn severity_label(&self) -> Option<&str> {
        self.get("severity").map(String::as_str)
    }
}

impl<T: SeverityLabel + ?Sized> SeverityLabel for &T {
    fn severity_label(&self) -> Option<&str> {
        (**self).severity_label()
    }
}

/// Finding counts per known severity
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeverityCounts {
    #[serde(rename = "Critical")]
    pub critical: usize,
    #[serde(rename = "High")]
    pub high: usize,
    #[serde(rename = "Medium")]
    pub medium: usize,
    #[serde(rename = "Low")]
    pub low: usize,
    #[serde(rename = "Informational")]
    pub informational: usize,
}

impl SeverityCounts {
    /// Count findings per severity; unknown or missing labels are skipped
    pub fn tally<T: SeverityLabel>(findings: &[T]) -> Self {
        let mut counts = Self::default();
        for finding in findings {
            let Some(severity) = finding.severity_label().and_then(Severity::parse) else {
                continue;
            };
            if let Some(slot) = counts.slot_mut(&severity) {
                *slot += 1;
            }
        }
        counts
    }

    /// Count for one severity (0 for unrecognized)
    pub fn get(&self, severity: &Severity) -> usize {
        match severity {
            Severity::Critical => self.critical,
            Severity::High => self.high,
            Severity::Medium => self.medium,
            Severity::Low => self.low,
            Severity::Informational => self.informational,
            Severity::Unrecognized(_) => 0,
        }
    }

    /// Sum over all buckets
    pub fn total(&self) -> usize {
        self.critical + self.high + self.medium + self.low + self.informational
    }

    fn slot_mut(&mut self, severity: &Severity) -> Option<&mut usize> {
        match severity {
            Severity::Critical => Some(&mut self.critical),
            Severity::High => Some(&mut self.high),
            Severity::Medium => Some(&mut self.medium),
            Severity::Low => Some(&mut self.low),
            Severity::Informational => Some(&mut self.informational),
            Severity::Unrecognized(_) => None,
        }
    }
}

/// One persisted benchmark entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkRecord {
    /// Repository or artifact identifier
    pub repo: String,
    /// Wall-clock duration, rounded to 2 decimals
    pub duration_seconds: f64,
    /// Findings per severity
    pub counts: SeverityCounts,
    /// Number of findings, including those with unknown severity
    pub total_findings: usize,
    /// UTC time the record was written
    pub timestamp: String,
}

impl BenchmarkRecord {
    /// Build a record stamped with the current time
    pub fn new<T: SeverityLabel>(
        repo: impl Into<String>,
        findings: &[T],
        duration_seconds: f64,
    ) -> Self {
        Self {
            repo: repo.into(),
            duration_seconds: round_to_hundredths(duration_seconds),
            counts: SeverityCounts::tally(findings),
            total_findings: findings.len(),
            timestamp: Utc::now().format(TIMESTAMP_FORMAT).to_string(),
        }
    }

    /// Difference from an earlier run to this one
    pub fn compare(&self, baseline: &BenchmarkRecord) -> BenchmarkDelta {
        let delta = |severity: &Severity| {
            self.counts.get(severity) as i64 - baseline.counts.get(severity) as i64
        };

        BenchmarkDelta {
            duration_seconds: round_to_hundredths(
                self.duration_seconds - baseline.duration_seconds,
            ),
            critical: delta(&Severity::Critical),
            high: delta(&Severity::High),
            medium: delta(&Severity::Medium),
            low: delta(&Severity::Low),
            informational: delta(&Severity::Informational),
            total_findings: self.total_findings as i64 - baseline.total_findings as i64,
        }
    }
}

/// Change between two benchmark records
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkDelta {
    pub duration_seconds: f64,
    pub critical: i64,
    pub high: i64,
    pub medium: i64,
    pub low: i64,
    pub informational: i64,
    pub total_findings: i64,
}

impl BenchmarkDelta {
    /// Whether the newer run found more Critical or High issues
    pub fn is_regression(&self) -> bool {
        self.critical > 0 || self.high > 0
    }
}

/// Appends benchmark records to one output directory
#[derive(Debug)]
pub struct BenchmarkRecorder {
    /// Directory holding `run_NNN.json` files
    output_dir: PathBuf,
    /// Serializes index allocation for writers sharing this recorder
    allocation: Mutex<()>,
}

impl BenchmarkRecorder {
    /// Create a recorder for a directory (created lazily on first write)
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            allocation: Mutex::new(()),
        }
    }

    /// The directory records are written to
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Record a run and return the path of the written file
    pub fn record<T: SeverityLabel>(
        &self,
        repo: &str,
        findings: &[T],
        duration_seconds: f64,
    ) -> Result<PathBuf> {
        let record = BenchmarkRecord::new(repo, findings, duration_seconds);
        self.append(&record)
    }

    /// Append an already-built record
    pub fn append(&self, record: &BenchmarkRecord) -> Result<PathBuf> {
        if !record.duration_seconds.is_finite() {
            return Err(SwarmAuditError::InvalidDuration(record.duration_seconds));
        }

        fs::create_dir_all(&self.output_dir).map_err(|source| SwarmAuditError::CreateDir {
            path: self.output_dir.clone(),
            source,
        })?;

        let payload = serde_json::to_string_pretty(record)?;

        // A poisoned lock only means another writer panicked; the guard protects no data
        let _guard = self
            .allocation
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let mut index = self.next_index()?;
        for _ in 0..MAX_CLAIM_ATTEMPTS {
            let path = self.record_path(index);
            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(mut file) => {
                    file.write_all(payload.as_bytes())
                        .map_err(|source| SwarmAuditError::WriteRecord {
                            path: path.clone(),
                            source,
                        })?;
                    info!(
                        "Recorded benchmark {} ({} findings, {:.2}s)",
                        path.display(),
                        record.total_findings,
                        record.duration_seconds
                    );
                    return Ok(path);
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    debug!("Benchmark index {} already taken, trying next", index);
                    index = index.checked_add(1).ok_or_else(|| self.exhausted())?;
                }
                Err(source) => return Err(SwarmAuditError::WriteRecord { path, source }),
            }
        }

        let path = self.record_path(index);
        Err(SwarmAuditError::WriteRecord {
            path,
            source: std::io::Error::new(
                ErrorKind::AlreadyExists,
                "benchmark index kept being claimed by other writers",
            ),
        })
    }

    /// Index the next record will get
    ///
    /// One past the highest numeric suffix in the store. Starts at 1 for an
    /// empty store. If no suffix parses, falls back to the number of existing
    /// records plus one.
    pub fn next_index(&self) -> Result<u32> {
        let names = self.record_names()?;
        if names.is_empty() {
            return Ok(1);
        }

        match names.iter().filter_map(|name| parse_index(name)).max() {
            Some(highest) => highest.checked_add(1).ok_or_else(|| self.exhausted()),
            None => {
                let fallback = u32::try_from(names.len())
                    .ok()
                    .and_then(|count| count.checked_add(1))
                    .ok_or_else(|| self.exhausted())?;
                warn!(
                    "No benchmark index parsed from {} records in {}, using {}",
                    names.len(),
                    self.output_dir.display(),
                    fallback
                );
                Ok(fallback)
            }
        }
    }

    /// All readable records, ordered by index
    ///
    /// Files that fail to parse are skipped with a warning.
    pub fn history(&self) -> Result<Vec<(u32, BenchmarkRecord)>> {
        let mut records = Vec::new();

        for name in self.record_names()? {
            let Some(index) = parse_index(&name) else {
                continue;
            };
            let path = self.output_dir.join(&name);
            let contents = fs::read_to_string(&path).map_err(|source| {
                SwarmAuditError::ReadRecord {
                    path: path.clone(),
                    source,
                }
            })?;
            match serde_json::from_str::<BenchmarkRecord>(&contents) {
                Ok(record) => records.push((index, record)),
                Err(e) => warn!("Skipping unreadable benchmark {}: {}", path.display(), e),
            }
        }

        records.sort_by_key(|(index, _)| *index);
        Ok(records)
    }

    /// The most recent readable record
    pub fn latest(&self) -> Result<Option<(u32, BenchmarkRecord)>> {
        Ok(self.history()?.pop())
    }

    fn exhausted(&self) -> SwarmAuditError {
        SwarmAuditError::IndexExhausted {
            path: self.output_dir.clone(),
        }
    }

    fn record_path(&self, index: u32) -> PathBuf {
        self.output_dir
            .join(format!("{RECORD_PREFIX}{index:03}.{RECORD_EXTENSION}"))
    }

    /// Names of `run_*.json` files, sorted lexicographically
    fn record_names(&self) -> Result<Vec<String>> {
        let entries = match fs::read_dir(&self.output_dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => {
                return Err(SwarmAuditError::ReadRecord {
                    path: self.output_dir.clone(),
                    source,
                })
            }
        };

        let mut names: Vec<String> = entries
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.path().is_file())
            .filter_map(|entry| entry.file_name().into_string().ok())
            .filter(|name| is_record_name(name))
            .collect();

        names.sort();
        Ok(names)
    }
}

fn is_record_name(name: &str) -> bool {
    name.starts_with(RECORD_PREFIX)
        && Path::new(name)
            .extension()
            .is_some_and(|ext| ext == RECORD_EXTENSION)
}

/// Numeric suffix after the last underscore of the file stem
fn parse_index(name: &str) -> Option<u32> {
    let stem = Path::new(name).file_stem()?.to_str()?;
    stem.rsplit('_').next()?.parse().ok()
}

/// Round to 2 decimals, ties to even
fn round_to_hundredths(value: f64) -> f64 {
    let scaled = value * 100.0;
    let mut rounded = scaled.round();
    if (scaled - scaled.trunc()).abs() == 0.5 && rounded % 2.0 != 0.0 {
        rounded -= scaled.signum();
    }
    rounded / 100.0
}
