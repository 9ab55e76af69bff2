//! Audit pipeline: analyze files, merge findings, record the run

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::Context;
use swarmaudit_core::{BenchmarkRecorder, DedupStrategy, Finding};
use tracing::info;

use crate::config::SwarmConfig;
use crate::registry::AnalyzerRegistry;
use crate::swarm::Swarm;

/// One file to audit
#[derive(Debug, Clone, PartialEq)]
pub struct SourceFile {
    /// Identifier reported in `Finding::file_paths`
    pub filename: String,
    /// File contents
    pub source: String,
}

impl SourceFile {
    pub fn new(filename: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            source: source.into(),
        }
    }

    /// Load a file from disk, using its path as the filename
    pub fn read(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read source file {}", path.display()))?;
        Ok(Self::new(path.display().to_string(), source))
    }
}

/// Result of one audit
#[derive(Debug, Clone)]
pub struct AuditOutcome {
    /// Deduplicated findings across all files
    pub findings: Vec<Finding>,
    /// Findings before deduplication
    pub raw_count: usize,
    /// Where the benchmark record was written
    pub benchmark_path: PathBuf,
    /// Wall-clock time of analysis and deduplication
    pub duration: Duration,
    /// Analyzer invocations that failed, across all files
    pub failed_analyzers: usize,
}

/// Swarm, deduplicator and benchmark ledger wired together
#[derive(Debug)]
pub struct AuditPipeline {
    swarm: Swarm,
    recorder: BenchmarkRecorder,
    strategy: DedupStrategy,
}

impl AuditPipeline {
    pub fn new(swarm: Swarm, recorder: BenchmarkRecorder) -> Self {
        Self {
            swarm,
            recorder,
            strategy: DedupStrategy::default(),
        }
    }

    /// Build a pipeline whose limits, ledger and strategy come from `config`
    pub fn from_config(registry: AnalyzerRegistry, config: &SwarmConfig) -> Self {
        Self::new(
            Swarm::from_config(registry, config),
            BenchmarkRecorder::new(&config.benchmark_dir),
        )
        .with_strategy(config.dedup_strategy)
    }

    /// Choose how findings are merged
    pub fn with_strategy(mut self, strategy: DedupStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn swarm(&self) -> &Swarm {
        &self.swarm
    }

    pub fn recorder(&self) -> &BenchmarkRecorder {
        &self.recorder
    }

    pub fn strategy(&self) -> DedupStrategy {
        self.strategy
    }

    /// Audit `sources` and append one benchmark record for `repo`
    ///
    /// Analyzer failures are absorbed by the swarm; a record that cannot be
    /// written is an error.
    pub async fn run(&self, repo: &str, sources: &[SourceFile]) -> anyhow::Result<AuditOutcome> {
        let start = Instant::now();
        info!("Auditing {} ({} files)", repo, sources.len());

        let mut raw = Vec::new();
        let mut failed_analyzers = 0;
        for file in sources {
            let run = self
                .swarm
                .analyze_detailed(&file.source, &file.filename)
                .await;
            failed_analyzers += run.failure_count();
            raw.extend(run.findings);
        }

        let raw_count = raw.len();
        let findings = self.strategy.apply(raw);
        let duration = start.elapsed();

        let benchmark_path = self
            .recorder
            .record(repo, &findings, duration.as_secs_f64())
            .with_context(|| format!("Failed to record benchmark for {repo}"))?;

        info!(
            "Audit of {} complete: {} findings ({} before merging) in {:?}",
            repo,
            findings.len(),
            raw_count,
            duration
        );

        Ok(AuditOutcome {
            findings,
            raw_count,
            benchmark_path,
            duration,
            failed_analyzers,
        })
    }
}
