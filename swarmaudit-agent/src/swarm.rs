//! Swarm - fans one source file out to every registered analyzer

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::join_all;
use futures::FutureExt;
use swarmaudit_core::{Finding, FindingKind, RawAnalysisResult, Severity};
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use crate::analyzer::{Analyzer, AnalyzerError};
use crate::config::SwarmConfig;
use crate::registry::AnalyzerRegistry;

/// Title used when a vulnerability report has none
pub const DEFAULT_VULNERABILITY_TITLE: &str = "Unknown Vuln";

/// Title used when an optimization report has none
pub const DEFAULT_OPTIMIZATION_TITLE: &str = "Gas Optimization Opportunity";

const DEFAULT_VULNERABILITY_DESCRIPTION: &str = "No details";
const DEFAULT_VULNERABILITY_ATTACK_LOGIC: &str = "See description";
const DEFAULT_OPTIMIZATION_DESCRIPTION: &str = "Gas optimization opportunity identified.";
const DEFAULT_OPTIMIZATION_ATTACK_LOGIC: &str = "Gas optimization reasoning";
const DEFAULT_GAS_SAVINGS: &str = "N/A";

/// How one analyzer invocation ended
#[derive(Debug, Clone, PartialEq)]
pub enum AnalyzerOutcome {
    /// Produced a finding
    Flagged,
    /// Answered but reported nothing
    Clear,
    /// Errored or timed out; contributed nothing
    Failed(String),
}

/// Per-analyzer account of a run
#[derive(Debug, Clone)]
pub struct AnalyzerReport {
    pub name: String,
    pub outcome: AnalyzerOutcome,
    pub elapsed: Duration,
}

/// Result of running the swarm over one file
#[derive(Debug, Clone, Default)]
pub struct SwarmRun {
    /// Normalized findings in registration order
    pub findings: Vec<Finding>,
    /// One report per analyzer in registration order
    pub reports: Vec<AnalyzerReport>,
}

impl SwarmRun {
    /// Reports of analyzers that failed
    pub fn failures(&self) -> impl Iterator<Item = &AnalyzerReport> {
        self.reports
            .iter()
            .filter(|r| matches!(r.outcome, AnalyzerOutcome::Failed(_)))
    }

    pub fn failure_count(&self) -> usize {
        self.failures().count()
    }
}

/// Runs every registered analyzer against the same input
///
/// Analyzers are dispatched concurrently, bounded by a semaphore, and joined
/// before normalization. A failing analyzer never aborts the batch.
pub struct Swarm {
    /// Registered analyzers
    registry: AnalyzerRegistry,
    /// Bounds simultaneous invocations
    limiter: Arc<Semaphore>,
    /// Permits in `limiter`
    max_concurrency: usize,
    /// Per-invocation time limit
    timeout: Option<Duration>,
}

impl std::fmt::Debug for Swarm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Swarm")
            .field("registry", &self.registry)
            .field("max_concurrency", &self.max_concurrency)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl Swarm {
    /// Create a swarm with default limits
    pub fn new(registry: AnalyzerRegistry) -> Self {
        Self::from_config(registry, &SwarmConfig::default())
    }

    /// Create a swarm with the limits from `config`
    pub fn from_config(registry: AnalyzerRegistry, config: &SwarmConfig) -> Self {
        let max_concurrency = config.max_concurrent_analyzers.max(1);
        Self {
            registry,
            limiter: Arc::new(Semaphore::new(max_concurrency)),
            max_concurrency,
            timeout: config.analyzer_timeout(),
        }
    }

    /// Set the per-analyzer time limit
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set how many analyzers may run at once
    pub fn with_max_concurrency(mut self, max: usize) -> Self {
        self.max_concurrency = max.max(1);
        self.limiter = Arc::new(Semaphore::new(self.max_concurrency));
        self
    }

    pub fn registry(&self) -> &AnalyzerRegistry {
        &self.registry
    }

    pub fn max_concurrency(&self) -> usize {
        self.max_concurrency
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Analyze one file and return normalized findings
    pub async fn analyze(&self, source_code: &str, filename: &str) -> Vec<Finding> {
        self.analyze_detailed(source_code, filename).await.findings
    }

    /// Analyze one file and report how each analyzer fared
    pub async fn analyze_detailed(&self, source_code: &str, filename: &str) -> SwarmRun {
        if self.registry.is_empty() {
            debug!("No analyzers registered, skipping {}", filename);
            return SwarmRun::default();
        }

        let start = Instant::now();
        info!(
            "Swarm analyzing {} with {} analyzers",
            filename,
            self.registry.len()
        );

        let invocations = self
            .registry
            .iter()
            .map(|analyzer| self.invoke(analyzer.as_ref(), source_code, filename));

        // join_all keeps registration order
        let results = join_all(invocations).await;

        let mut run = SwarmRun::default();
        for (name, result, elapsed) in results {
            let outcome = match result {
                Ok(raw) => match normalize(raw, filename, &name) {
                    Some(finding) => {
                        debug!("{} flagged '{}' in {}", name, finding.title, filename);
                        run.findings.push(finding);
                        AnalyzerOutcome::Flagged
                    }
                    None => AnalyzerOutcome::Clear,
                },
                Err(e) => {
                    warn!("Analyzer {} failed on {}: {}", name, filename, e);
                    AnalyzerOutcome::Failed(e.to_string())
                }
            };
            run.reports.push(AnalyzerReport {
                name,
                outcome,
                elapsed,
            });
        }

        info!(
            "Swarm finished {} in {:?}: {} findings, {} failed analyzers",
            filename,
            start.elapsed(),
            run.findings.len(),
            run.failure_count()
        );

        run
    }

    async fn invoke(
        &self,
        analyzer: &dyn Analyzer,
        source_code: &str,
        filename: &str,
    ) -> (String, Result<RawAnalysisResult, AnalyzerError>, Duration) {
        let name = analyzer.name().to_string();

        // never closed
        let _permit = self.limiter.acquire().await.ok();
        let start = Instant::now();

        // A panic stays inside this invocation
        let call = AssertUnwindSafe(analyzer.hunt(source_code, filename)).catch_unwind();
        let outcome = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, call).await {
                Ok(outcome) => outcome,
                Err(_) => Ok(Err(AnalyzerError::Timeout(limit))),
            },
            None => call.await,
        };

        let result = outcome
            .unwrap_or_else(|payload| Err(AnalyzerError::Panicked(panic_message(payload.as_ref()))));

        (name, result, start.elapsed())
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

/// Turn a raw result into a finding, filling defaults
///
/// Returns `None` when the result reports neither a vulnerability nor an
/// optimization. A vulnerability takes precedence when both are set.
pub fn normalize(raw: RawAnalysisResult, filename: &str, detected_by: &str) -> Option<Finding> {
    let kind = raw.kind()?;

    let finding = match kind {
        FindingKind::Vulnerability => {
            let attack_logic = raw
                .kill_chain
                .clone()
                .unwrap_or_else(|| DEFAULT_VULNERABILITY_ATTACK_LOGIC.to_string());
            let description = raw
                .kill_chain
                .unwrap_or_else(|| DEFAULT_VULNERABILITY_DESCRIPTION.to_string());

            Finding::new(
                raw.title
                    .unwrap_or_else(|| DEFAULT_VULNERABILITY_TITLE.to_string()),
                raw.severity.unwrap_or(Severity::High),
                filename,
                detected_by,
            )
            .with_description(description)
            .with_attack_logic(attack_logic)
        }
        FindingKind::Optimization => {
            let description = format!(
                "{}\n\nEstimated gas savings: {}",
                raw.description
                    .as_deref()
                    .unwrap_or(DEFAULT_OPTIMIZATION_DESCRIPTION),
                raw.gas_savings_estimate
                    .as_deref()
                    .unwrap_or(DEFAULT_GAS_SAVINGS)
            );

            Finding::new(
                raw.title
                    .unwrap_or_else(|| DEFAULT_OPTIMIZATION_TITLE.to_string()),
                raw.severity.unwrap_or(Severity::Informational),
                filename,
                detected_by,
            )
            .with_description(description)
            .with_attack_logic(
                raw.attack_logic
                    .unwrap_or_else(|| DEFAULT_OPTIMIZATION_ATTACK_LOGIC.to_string()),
            )
        }
    };

    Some(
        finding
            .with_line(raw.line_number.unwrap_or(0))
            .with_confidence(kind.confidence())
            .with_verification_proof(raw.verification_proof),
    )
}
