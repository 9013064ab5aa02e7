//! Building the agent from the shipped configuration and data files.

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;

use bist::agent::test_support::StubGenerator;
use bist::models::{
    default_configurations, BistConfig, CapabilityFlags, GenerationBackend, GenerationConfig,
    PromptingMode, QueryCategory, StepStatus, Ticker, WorkflowStage,
};

fn repo_root() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../..")
}

fn shipped_config() -> BistConfig {
    let mut config = bist::load_config(repo_root().join("config/bist.toml")).unwrap();
    let root = repo_root();
    let absolute = |p: &str| root.join(p).to_string_lossy().to_string();
    config.data.market_snapshot_path = absolute(&config.data.market_snapshot_path);
    config.data.documents_path = absolute(&config.data.documents_path);
    config.evaluation.queries_path = absolute(&config.evaluation.queries_path);
    config
}

#[test]
fn shipped_config_matches_default_grid() {
    let config = shipped_config();
    assert_eq!(config.generation.backend, GenerationBackend::Cli);
    assert_eq!(config.evaluation.configurations, default_configurations());
}

#[test]
fn shipped_query_set_is_labelled() {
    let config = shipped_config();
    let queries = bist::eval::load_queries(std::path::Path::new(&config.evaluation.queries_path)).unwrap();
    assert_eq!(queries.len(), 25);

    let ids: BTreeSet<u32> = queries.iter().map(|q| q.id).collect();
    assert_eq!(ids.len(), 25);
    assert_eq!(queries[19].tickers, vec![Ticker::Akbnk, Ticker::Garan]);
    assert_eq!(queries[24].category, QueryCategory::Unknown);
    assert!(queries.iter().all(|q| !q.expected_elements.is_empty()));
}

#[tokio::test]
async fn workflow_over_shipped_data() {
    let config = shipped_config();
    let workflow =
        bist::build_workflow(&config, Arc::new(StubGenerator::fixed("# THYAO\n\nOzet."))).unwrap();

    let state = workflow
        .run("THYAO icin teknik analiz yap", CapabilityFlags::ALL, PromptingMode::FewShot)
        .await;

    assert_eq!(state.stage, WorkflowStage::Synthesized);
    assert_eq!(state.category, QueryCategory::Technical);
    assert!(state.gathered.values().all(|r| r.is_success()));
    assert!(!state.context.is_empty());
    assert!(state
        .trace
        .iter()
        .any(|t| t.step == "retrieval" && t.status == StepStatus::Ok));
}

#[test]
fn missing_snapshot_is_reported() {
    let mut config = shipped_config();
    config.data.market_snapshot_path = "/nonexistent/snapshot.json".to_string();
    let err = bist::build_workflow(&config, Arc::new(StubGenerator::fixed("x")))
        .err()
        .unwrap();
    assert!(err.to_string().contains("market snapshot"));
}

#[test]
fn gemini_backend_requires_key() {
    let config = GenerationConfig {
        backend: GenerationBackend::Gemini,
        api_key_env: "BIST_TEST_UNSET_GEMINI_KEY".to_string(),
        ..GenerationConfig::default()
    };
    let err = bist::build_generator(&config).err().unwrap();
    assert!(err.to_string().contains("BIST_TEST_UNSET_GEMINI_KEY"));
}

#[test]
fn cli_backend_builds_without_spawning() {
    let generator = bist::build_generator(&GenerationConfig::default()).unwrap();
    assert_eq!(generator.name(), "claude");
}
