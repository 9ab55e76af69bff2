//! End-to-end audits with scripted persona backends

use std::sync::Arc;
use std::time::Duration;

use swarmaudit_agent::{
    AnalyzerOutcome, AnalyzerRegistry, AuditPipeline, BackendFactory, LlmError, ScriptedBackend,
    Severity, SourceFile, Swarm, SwarmConfig,
};
use swarmaudit_core::BenchmarkRecorder;
use tempfile::TempDir;
use tracing_subscriber::FmtSubscriber;

const CONFIG: &str = r#"{
    "personas": [
        {"name": "Thief", "system_prompt": "You are the Thief. Drain the vault."},
        {"name": "Reentrancy Expert", "system_prompt": "You are the Reentrancy Expert."},
        {"name": "Gas Golfer", "system_prompt": "You are the Gas Golfer.", "temperature": 0.0},
        {"name": "Oracle Expert", "system_prompt": "You are the Oracle Expert."}
    ],
    "max_concurrent_analyzers": 2,
    "analyzer_timeout_secs": 5
}"#;

fn init_tracing() {
    let _ = FmtSubscriber::builder()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}

fn backend_factory() -> BackendFactory {
    Box::new(|persona| {
        let backend = match persona.name.as_str() {
            "Thief" => ScriptedBackend::replying(
                r#"{"found_vulnerability": true, "title": "Reentrancy Bug", "severity": "High",
                    "kill_chain": "1. deposit\n2. withdraw re-enters"}"#,
            ),
            "Reentrancy Expert" => ScriptedBackend::new().with_response(
                "Vault.sol",
                "Confirmed.\n```json\n{\"found_vulnerability\": true, \"title\": \" reentrancy bug \", \
                 \"severity\": \"Critical\", \"line_number\": \"17\"}\n```",
            ),
            "Gas Golfer" => ScriptedBackend::replying(
                r#"{"optimization_opportunity": true, "title": "Cache storage reads",
                    "gas_savings_estimate": "~2,100 gas"}"#,
            ),
            _ => ScriptedBackend::failing(LlmError::RateLimited(Duration::from_secs(30))),
        };
        Arc::new(backend)
    })
}

fn sources() -> Vec<SourceFile> {
    vec![
        SourceFile::new("Vault.sol", "contract Vault { function withdraw() external {} }"),
        SourceFile::new("Router.sol", "contract Router {}"),
    ]
}

#[tokio::test]
async fn test_full_audit_from_config() {
    init_tracing();
    let dir = TempDir::new().unwrap();
    let config: SwarmConfig = serde_json::from_str(CONFIG).unwrap();
    let config = config.with_benchmark_dir(dir.path());

    let registry = AnalyzerRegistry::from_config(&config, &backend_factory()).unwrap();
    assert_eq!(
        registry.names(),
        vec!["Thief", "Reentrancy Expert", "Gas Golfer", "Oracle Expert"]
    );

    let pipeline = AuditPipeline::from_config(registry, &config);
    let outcome = pipeline.run("vault-protocol", &sources()).await.unwrap();

    // Thief on both files, Expert on Vault.sol only, Gas Golfer on both
    assert_eq!(outcome.raw_count, 5);
    assert_eq!(outcome.failed_analyzers, 2);
    assert_eq!(outcome.findings.len(), 2);

    let reentrancy = &outcome.findings[0];
    assert_eq!(reentrancy.severity, Severity::Critical);
    assert_eq!(reentrancy.detected_by, "Reentrancy Expert");
    assert_eq!(reentrancy.line_number, 17);
    let paths: Vec<&str> = reentrancy.file_paths.iter().map(String::as_str).collect();
    assert_eq!(paths, vec!["Router.sol", "Vault.sol"]);

    let gas = &outcome.findings[1];
    assert!(gas.is_optimization());
    assert_eq!(gas.severity, Severity::Informational);
    assert!(gas.description.ends_with("Estimated gas savings: ~2,100 gas"));

    let (index, record) = pipeline.recorder().latest().unwrap().unwrap();
    assert_eq!(index, 1);
    assert_eq!(record.repo, "vault-protocol");
    assert_eq!(record.counts.critical, 1);
    assert_eq!(record.counts.informational, 1);
    assert_eq!(record.total_findings, 2);
}

#[tokio::test]
async fn test_benchmark_file_layout() {
    init_tracing();
    let dir = TempDir::new().unwrap();
    let config: SwarmConfig = serde_json::from_str(CONFIG).unwrap();
    let registry = AnalyzerRegistry::from_config(&config, &backend_factory()).unwrap();
    let pipeline = AuditPipeline::new(Swarm::new(registry), BenchmarkRecorder::new(dir.path()));

    let outcome = pipeline.run("vault-protocol", &sources()).await.unwrap();

    let text = std::fs::read_to_string(&outcome.benchmark_path).unwrap();
    assert!(text.contains("\n  \"repo\": \"vault-protocol\""));

    let json: serde_json::Value = serde_json::from_str(&text).unwrap();
    let counts: Vec<&str> = json["counts"]
        .as_object()
        .unwrap()
        .keys()
        .map(String::as_str)
        .collect();
    assert_eq!(counts.len(), 5);
    assert!(json["timestamp"].as_str().unwrap().ends_with('Z'));
    assert!(json["duration_seconds"].as_f64().unwrap() >= 0.0);
}

#[tokio::test]
async fn test_failing_personas_still_record() {
    init_tracing();
    let dir = TempDir::new().unwrap();
    let factory: BackendFactory =
        Box::new(|_| Arc::new(ScriptedBackend::failing(LlmError::AuthFailed)));
    let config = SwarmConfig::default()
        .with_persona(swarmaudit_agent::PersonaConfig::new("Thief", "a"))
        .with_persona(swarmaudit_agent::PersonaConfig::new("Logician", "b"))
        .with_benchmark_dir(dir.path());

    let registry = AnalyzerRegistry::from_config(&config, &factory).unwrap();
    let pipeline = AuditPipeline::from_config(registry, &config);

    let outcome = pipeline.run("empty-handed", &sources()).await.unwrap();

    assert!(outcome.findings.is_empty());
    assert_eq!(outcome.failed_analyzers, 4);
    assert_eq!(outcome.benchmark_path, dir.path().join("run_001.json"));
}

#[tokio::test]
async fn test_detailed_run_reports_each_persona() {
    init_tracing();
    let config: SwarmConfig = serde_json::from_str(CONFIG).unwrap();
    let registry = AnalyzerRegistry::from_config(&config, &backend_factory()).unwrap();
    let swarm = Swarm::from_config(registry, &config);

    let run = swarm
        .analyze_detailed("contract Router {}", "Router.sol")
        .await;

    let outcomes: Vec<(&str, &AnalyzerOutcome)> = run
        .reports
        .iter()
        .map(|r| (r.name.as_str(), &r.outcome))
        .collect();

    assert_eq!(outcomes[0], ("Thief", &AnalyzerOutcome::Flagged));
    assert_eq!(outcomes[1], ("Reentrancy Expert", &AnalyzerOutcome::Clear));
    assert_eq!(outcomes[2], ("Gas Golfer", &AnalyzerOutcome::Flagged));
    assert!(matches!(outcomes[3], ("Oracle Expert", AnalyzerOutcome::Failed(_))));
}
