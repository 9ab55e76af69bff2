//! Configuration for the analyzer swarm

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use swarmaudit_core::{DedupStrategy, DEFAULT_BENCHMARK_DIR};
use tracing::warn;

/// Environment variable overriding `max_concurrent_analyzers`
pub const ENV_MAX_CONCURRENCY: &str = "SWARMAUDIT_MAX_CONCURRENCY";

/// Environment variable overriding `analyzer_timeout_secs` (0 disables)
pub const ENV_TIMEOUT_SECS: &str = "SWARMAUDIT_TIMEOUT_SECS";

/// Environment variable overriding `benchmark_dir`
pub const ENV_BENCHMARK_DIR: &str = "SWARMAUDIT_BENCHMARK_DIR";

/// Environment variable overriding `dedup_strategy` (`by_title` or `per_location`)
pub const ENV_DEDUP_STRATEGY: &str = "SWARMAUDIT_DEDUP_STRATEGY";

fn default_temperature() -> f32 {
    0.3
}

fn default_max_tokens() -> u32 {
    1024
}

/// One configured analyzer identity backed by a language model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonaConfig {
    /// Display name, reported as `detected_by`
    pub name: String,

    /// Instructions given to the model as system message
    pub system_prompt: String,

    /// Model override for this persona (backend default when absent)
    #[serde(default)]
    pub model: Option<String>,

    /// Sampling temperature (default: 0.3)
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Maximum tokens in the answer (default: 1024)
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

impl PersonaConfig {
    /// Create a persona with default model parameters
    pub fn new(name: impl Into<String>, system_prompt: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            system_prompt: system_prompt.into(),
            model: None,
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
        }
    }

    /// Set the model
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Set the temperature
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Set the answer token limit
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }
}

/// Configuration for an analysis session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SwarmConfig {
    /// Personas to build analyzers from, in registration order
    pub personas: Vec<PersonaConfig>,

    /// Maximum analyzers running at once (default: 8)
    pub max_concurrent_analyzers: usize,

    /// Per-analyzer time limit in seconds (default: 120, None disables)
    pub analyzer_timeout_secs: Option<u64>,

    /// Where benchmark records go (default: "benchmarks")
    pub benchmark_dir: PathBuf,

    /// How findings are merged
    pub dedup_strategy: DedupStrategy,
}

impl Default for SwarmConfig {
    fn default() -> Self {
        Self {
            personas: Vec::new(),
            max_concurrent_analyzers: 8,
            analyzer_timeout_secs: Some(120),
            benchmark_dir: PathBuf::from(DEFAULT_BENCHMARK_DIR),
            dedup_strategy: DedupStrategy::ByTitle,
        }
    }
}

impl SwarmConfig {
    /// Defaults overlaid with `SWARMAUDIT_*` environment variables
    pub fn from_env() -> Self {
        Self::default().with_env_overrides(|key| std::env::var(key).ok())
    }

    /// Overlay settings from a variable lookup
    ///
    /// Values that fail to parse are ignored with a warning.
    pub fn with_env_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(raw) = lookup(ENV_MAX_CONCURRENCY) {
            match raw.trim().parse::<usize>() {
                Ok(n) if n > 0 => self.max_concurrent_analyzers = n,
                _ => warn!("Ignoring invalid {}={:?}", ENV_MAX_CONCURRENCY, raw),
            }
        }

        if let Some(raw) = lookup(ENV_TIMEOUT_SECS) {
            match raw.trim().parse::<u64>() {
                Ok(0) => self.analyzer_timeout_secs = None,
                Ok(secs) => self.analyzer_timeout_secs = Some(secs),
                Err(_) => warn!("Ignoring invalid {}={:?}", ENV_TIMEOUT_SECS, raw),
            }
        }

        if let Some(raw) = lookup(ENV_BENCHMARK_DIR) {
            if raw.trim().is_empty() {
                warn!("Ignoring empty {}", ENV_BENCHMARK_DIR);
            } else {
                self.benchmark_dir = PathBuf::from(raw);
            }
        }

        if let Some(raw) = lookup(ENV_DEDUP_STRATEGY) {
            match raw.trim().to_lowercase().as_str() {
                "by_title" | "title" => self.dedup_strategy = DedupStrategy::ByTitle,
                "per_location" | "location" => self.dedup_strategy = DedupStrategy::PerLocation,
                _ => warn!("Ignoring invalid {}={:?}", ENV_DEDUP_STRATEGY, raw),
            }
        }

        self
    }

    /// Add a persona
    pub fn with_persona(mut self, persona: PersonaConfig) -> Self {
        self.personas.push(persona);
        self
    }

    /// Set the concurrency limit
    pub fn with_max_concurrent_analyzers(mut self, max: usize) -> Self {
        self.max_concurrent_analyzers = max;
        self
    }

    /// Set the per-analyzer timeout
    ///
    /// Stored in whole seconds, rounded up: 500 ms becomes 1 s, 1.5 s becomes
    /// 2 s. Use `Swarm::with_timeout` for sub-second limits.
    pub fn with_analyzer_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.analyzer_timeout_secs = timeout.map(|t| {
            let secs = t.as_secs().saturating_add(u64::from(t.subsec_nanos() > 0));
            secs.max(1)
        });
        self
    }

    /// Set the benchmark directory
    pub fn with_benchmark_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.benchmark_dir = dir.into();
        self
    }

    /// Set the deduplication strategy
    pub fn with_dedup_strategy(mut self, strategy: DedupStrategy) -> Self {
        self.dedup_strategy = strategy;
        self
    }

    /// Per-analyzer timeout as a duration
    pub fn analyzer_timeout(&self) -> Option<Duration> {
        self.analyzer_timeout_secs.map(Duration::from_secs)
    }
}
