//! Ablation sweeps over the sample snapshot with a scripted generator.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bist_agent::test_support::{sample_snapshot, StaticRetriever};
use bist_agent::{GenerationError, GenerationRequest, Generator, Retriever, ToolRegistry, Workflow};
use bist_eval::{load_results, write_results, EvaluationEngine, QueryStatus};
use bist_models::{default_configurations, EvalQuery, QueryCategory, RunStatus, Ticker};
use tokio_util::sync::CancellationToken;

const JUDGE_REPLY: &str = r#"{"data_accuracy": 4, "analysis_depth": 3, "reasoning_quality": 4,
"investor_usefulness": 3, "presentation_quality": 5, "strengths": ["veri"], "weaknesses": []}"#;

/// Answers by purpose; synthesis panics for queries containing "PATLA".
struct ScriptedGenerator;

#[async_trait]
impl Generator for ScriptedGenerator {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationError> {
        match request.purpose.as_str() {
            "synthesis" if request.prompt.contains("PATLA") => panic!("synthesis crashed"),
            "synthesis" => Ok("# Rapor\n\nTHYAO F/K orani 5.2.".to_string()),
            "judge" => Ok(JUDGE_REPLY.to_string()),
            "context_precision" => Ok("evet".to_string()),
            _ => Ok("0.8".to_string()),
        }
    }
}

fn engine(repeats: u32, concurrency: usize) -> EvaluationEngine {
    let generator: Arc<dyn Generator> = Arc::new(ScriptedGenerator);
    let retriever = Arc::new(StaticRetriever::with_texts(&[
        "THYAO F/K orani 5.2 seviyesinde.",
        "Havacilik sektorunde talep guclu.",
    ]));
    let workflow = Workflow::from_parts(
        ToolRegistry::with_snapshot(Arc::new(sample_snapshot())),
        Some(retriever as Arc<dyn Retriever>),
        Arc::clone(&generator),
        Duration::from_secs(2),
        5,
    );
    EvaluationEngine::new(workflow, generator)
        .with_repeats(repeats)
        .with_concurrency(concurrency)
}

fn queries() -> Vec<EvalQuery> {
    vec![
        EvalQuery {
            id: 1,
            query: "THYAO hissesi icin temel analiz yap".to_string(),
            category: QueryCategory::Fundamental,
            tickers: vec![Ticker::Thyao],
            expected_elements: vec!["F/K".to_string(), "temettu".to_string()],
        },
        EvalQuery {
            id: 2,
            query: "PATLA THYAO temel analiz".to_string(),
            category: QueryCategory::Fundamental,
            tickers: vec![Ticker::Thyao],
            expected_elements: vec![],
        },
    ]
}

#[tokio::test]
async fn sweep_continues_past_failing_query() {
    let configs: Vec<_> = default_configurations()
        .into_iter()
        .filter(|c| c.name == "full_system" || c.name == "no_rag")
        .collect();

    let report = engine(2, 3)
        .run_ablation(&queries(), &configs, CancellationToken::new())
        .await
        .unwrap();

    assert!(!report.cancelled);
    assert_eq!(report.runs.len(), 8);

    let full = &report.configurations["full_system"];
    assert_eq!(full.queries["1"].status, QueryStatus::Completed);
    assert_eq!(full.queries["2"].status, QueryStatus::Skipped);
    assert_eq!(full.aggregate.completed, 2);
    assert_eq!(full.aggregate.skipped, 2);
    assert_eq!(full.aggregate.success_rate, 0.5);

    let skipped = &full.queries["2"].runs[0];
    assert_eq!(skipped.status, RunStatus::Skipped);
    assert!(skipped.error.as_deref().unwrap_or_default().contains("synthesis crashed"));

    let metrics = &full.queries["1"].metrics;
    assert_eq!(metrics["tool_f1"], Some(1.0));
    assert_eq!(metrics["context_recall"], Some(0.5));
    assert_eq!(metrics["context_precision"], Some(1.0));
    assert_eq!(metrics["judge_presentation_quality"], Some(5.0));
    assert_eq!(full.aggregate.metrics["judge_overall"].std, 0.0);

    // Without retrieval the context metrics are undefined, not zero.
    let no_rag = &report.configurations["no_rag"].queries["1"].metrics;
    assert_eq!(no_rag["context_recall"], None);
    assert_eq!(no_rag["faithfulness"], None);
    assert_eq!(no_rag["answer_relevancy"], Some(0.8));
    assert!(!report.configurations["no_rag"]
        .aggregate
        .metrics
        .contains_key("context_recall"));
}

#[tokio::test]
async fn results_file_has_stable_shape() {
    let configs = &default_configurations()[..1];
    let report = engine(1, 2)
        .run_ablation(&queries(), configs, CancellationToken::new())
        .await
        .unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = write_results(&report, &dir.path().join("results")).unwrap();
    let name = path.file_name().unwrap().to_string_lossy().to_string();
    assert!(name.starts_with("ablation_results_"));

    let raw: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    let full = &raw["full_system"];
    assert_eq!(full["1"]["status"], "completed");
    assert_eq!(full["2"]["status"], "skipped");
    assert!(full["1"]["duration_ms"].is_number());
    assert!(full["1"]["metrics"]["tool_precision"].is_number());
    assert_eq!(full["1"]["runs"].as_array().unwrap().len(), 1);
    assert_eq!(full["aggregate"]["completed"], 1);

    let loaded = load_results(&path).unwrap();
    let reloaded = &loaded["full_system"];
    let original = &report.configurations["full_system"];
    assert_eq!(reloaded.queries["2"].status, QueryStatus::Skipped);
    assert_eq!(reloaded.queries["1"].runs[0].run_id, original.queries["1"].runs[0].run_id);
    assert_eq!(reloaded.aggregate.configuration, original.aggregate.configuration);
}

#[tokio::test]
async fn cancelled_sweep_reports_nothing_started() {
    let cancel = CancellationToken::new();
    cancel.cancel();

    let report = engine(3, 2)
        .run_ablation(&queries(), &default_configurations(), cancel)
        .await
        .unwrap();

    assert!(report.cancelled);
    assert!(report.runs.is_empty());
    let full = &report.configurations["full_system"];
    assert!(full.queries.is_empty());
    assert_eq!(full.aggregate.completed, 0);
    assert_eq!(full.aggregate.success_rate, 0.0);
}

#[tokio::test]
async fn invalid_setup_is_rejected() {
    let err = engine(1, 1)
        .run_ablation(&[], &default_configurations(), CancellationToken::new())
        .await;
    assert!(err.is_err());
}
