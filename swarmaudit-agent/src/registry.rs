//! Ordered registry of analyzers

use std::collections::HashSet;
use std::sync::Arc;

use tracing::info;

use crate::analyzer::{Analyzer, AnalyzerError};
use crate::backend::LlmBackend;
use crate::config::{PersonaConfig, SwarmConfig};
use crate::persona::PersonaAnalyzer;

/// Factory function type for creating a backend per persona
pub type BackendFactory = Box<dyn Fn(&PersonaConfig) -> Arc<dyn LlmBackend> + Send + Sync>;

/// Analyzers in registration order
///
/// Adding an analyzer is a registration, never a new type. Names are unique
/// because they label findings.
#[derive(Default, Clone)]
pub struct AnalyzerRegistry {
    analyzers: Vec<Arc<dyn Analyzer>>,
    names: HashSet<String>,
}

impl std::fmt::Debug for AnalyzerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnalyzerRegistry")
            .field("analyzers", &self.names())
            .finish()
    }
}

impl AnalyzerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build one persona analyzer per configured persona
    pub fn from_config(
        config: &SwarmConfig,
        backend_factory: &BackendFactory,
    ) -> Result<Self, AnalyzerError> {
        let mut registry = Self::new();

        for persona in &config.personas {
            let backend = backend_factory(persona);
            registry.register(PersonaAnalyzer::new(persona.clone(), backend))?;
        }

        info!("Registered {} analyzers from config", registry.len());
        Ok(registry)
    }

    /// Register an analyzer
    pub fn register<A: Analyzer + 'static>(&mut self, analyzer: A) -> Result<(), AnalyzerError> {
        self.register_arc(Arc::new(analyzer))
    }

    /// Register a shared analyzer
    pub fn register_arc(&mut self, analyzer: Arc<dyn Analyzer>) -> Result<(), AnalyzerError> {
        let name = analyzer.name().to_string();
        if !self.names.insert(name.clone()) {
            return Err(AnalyzerError::DuplicateName(name));
        }
        self.analyzers.push(analyzer);
        Ok(())
    }

    /// Builder-style registration
    pub fn with<A: Analyzer + 'static>(mut self, analyzer: A) -> Result<Self, AnalyzerError> {
        self.register(analyzer)?;
        Ok(self)
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Analyzer>> {
        self.analyzers.iter().find(|a| a.name() == name).cloned()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn Analyzer>> {
        self.analyzers.iter()
    }

    pub fn names(&self) -> Vec<&str> {
        self.analyzers.iter().map(|a| a.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.analyzers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.analyzers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::FixedAnalyzer;
    use crate::scripted::ScriptedBackend;
    use swarmaudit_core::RawAnalysisResult;

    #[test]
    fn test_registration_order() {
        let registry = AnalyzerRegistry::new()
            .with(FixedAnalyzer::new("Thief", RawAnalysisResult::clear()))
            .unwrap()
            .with(FixedAnalyzer::new("Logician", RawAnalysisResult::clear()))
            .unwrap()
            .with(FixedAnalyzer::new("Oracle Expert", RawAnalysisResult::clear()))
            .unwrap();

        assert_eq!(registry.names(), vec!["Thief", "Logician", "Oracle Expert"]);
        assert_eq!(registry.len(), 3);
        assert!(registry.get("Logician").is_some());
        assert!(registry.get("Nobody").is_none());
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let mut registry = AnalyzerRegistry::new();
        registry
            .register(FixedAnalyzer::new("Thief", RawAnalysisResult::clear()))
            .unwrap();

        let err = registry
            .register(FixedAnalyzer::new("Thief", RawAnalysisResult::clear()))
            .unwrap_err();

        assert_eq!(err, AnalyzerError::DuplicateName("Thief".to_string()));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_from_config() {
        let config = SwarmConfig::default()
            .with_persona(PersonaConfig::new("Thief", "Steal the funds.").with_model("model-a"))
            .with_persona(PersonaConfig::new("Token Expert", "Check token quirks."));

        let factory: BackendFactory = Box::new(|persona| {
            let model = persona.model.clone().unwrap_or_else(|| "default".to_string());
            Arc::new(ScriptedBackend::new().with_model(model))
        });

        let registry = AnalyzerRegistry::from_config(&config, &factory).unwrap();

        assert_eq!(registry.names(), vec!["Thief", "Token Expert"]);
    }

    #[test]
    fn test_from_config_rejects_duplicate_personas() {
        let config = SwarmConfig::default()
            .with_persona(PersonaConfig::new("Thief", "a"))
            .with_persona(PersonaConfig::new("Thief", "b"));
        let factory: BackendFactory = Box::new(|_| Arc::new(ScriptedBackend::new()));

        assert!(AnalyzerRegistry::from_config(&config, &factory).is_err());
    }
}
