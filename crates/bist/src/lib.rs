//! BIST decision-support agent
//!
//! Answers natural-language questions about Borsa Istanbul equities by
//! classifying the query, planning tool calls and document retrieval,
//! gathering the results concurrently and synthesizing a Turkish report.
//! The evaluation engine runs ablation sweeps over the same workflow.
//!
//! # Library Usage
//!
//! ```rust,no_run
//! use bist::models::{CapabilityFlags, PromptingMode};
//!
//! # async fn run() -> anyhow::Result<()> {
//! let config = bist::load_config("config/bist.toml")?;
//! let generator = bist::build_generator(&config.generation)?;
//! let workflow = bist::build_workflow(&config, generator)?;
//! let state = workflow
//!     .run("THYAO hissesi icin temel analiz yap", CapabilityFlags::ALL, PromptingMode::FewShot)
//!     .await;
//! println!("{}", state.report().unwrap_or_default());
//! # Ok(())
//! # }
//! ```

pub use bist_agent as agent;
pub use bist_data as data;
pub use bist_eval as eval;
pub use bist_models as models;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use bist_agent::{
    CliConfig, CliGenerator, GeminiConfig, GeminiGenerator, Generator, Retriever, StoreRetriever,
    ThrottlePolicy, ThrottledGenerator, ToolRegistry, Workflow,
};
use bist_data::{DocumentStore, MarketSnapshot};
use bist_eval::EvaluationEngine;
use bist_models::{BistConfig, GenerationBackend, GenerationConfig};
use tracing::info;

/// Read and parse a TOML configuration file.
pub fn load_config(path: impl AsRef<Path>) -> Result<BistConfig, anyhow::Error> {
    let path = path.as_ref();
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config: {}", path.display()))?;
    toml::from_str(&raw).with_context(|| format!("Failed to parse config: {}", path.display()))
}

/// Build the configured generation backend, wrapped in the throttle so every
/// caller shares one permit pool and retry policy.
pub fn build_generator(config: &GenerationConfig) -> Result<Arc<dyn Generator>, anyhow::Error> {
    let timeout = Duration::from_secs(config.timeout_seconds);
    let backend: Arc<dyn Generator> = match config.backend {
        GenerationBackend::Cli => {
            let defaults = CliConfig::default();
            Arc::new(CliGenerator::new(CliConfig {
                command: config.command.clone(),
                model: config.model.clone().unwrap_or(defaults.model),
                timeout,
            }))
        }
        GenerationBackend::Gemini => {
            let api_key = std::env::var(&config.api_key_env)
                .with_context(|| format!("{} is not set", config.api_key_env))?;
            let model = config
                .model
                .clone()
                .unwrap_or_else(|| bist_agent::gemini::DEFAULT_MODEL.to_string());
            let mut gemini = GeminiConfig::new(model, api_key);
            gemini.timeout = timeout;
            Arc::new(GeminiGenerator::new(gemini).context("Failed to build Gemini client")?)
        }
    };

    let policy = ThrottlePolicy {
        max_concurrent: config.max_concurrent,
        max_attempts: config.max_attempts,
        base_backoff: Duration::from_millis(config.base_backoff_ms),
        ..ThrottlePolicy::default()
    };
    info!(
        backend = backend.name(),
        max_concurrent = policy.max_concurrent,
        max_attempts = policy.max_attempts,
        "Generation backend ready"
    );
    Ok(Arc::new(ThrottledGenerator::new(backend, policy)))
}

/// Build the workflow over the local market snapshot and document store.
pub fn build_workflow(
    config: &BistConfig,
    generator: Arc<dyn Generator>,
) -> Result<Workflow, anyhow::Error> {
    let snapshot = MarketSnapshot::load(&config.data.market_snapshot_path).with_context(|| {
        format!(
            "Failed to load market snapshot: {}",
            config.data.market_snapshot_path
        )
    })?;
    let documents = DocumentStore::load(&config.data.documents_path).with_context(|| {
        format!("Failed to load documents: {}", config.data.documents_path)
    })?;
    info!(
        stocks = snapshot.stocks.len(),
        documents = documents.len(),
        "Loaded local data"
    );

    let retriever: Arc<dyn Retriever> = Arc::new(StoreRetriever::new(Arc::new(documents)));
    Ok(Workflow::from_parts(
        ToolRegistry::with_snapshot(Arc::new(snapshot)),
        Some(retriever),
        generator,
        Duration::from_secs(config.agent.tool_timeout_seconds),
        config.agent.retrieval_top_k,
    ))
}

/// Build the evaluation engine. Synthesis and scoring share one throttled
/// generator so the concurrency cap covers both.
pub fn build_engine(config: &BistConfig) -> Result<EvaluationEngine, anyhow::Error> {
    let generator = build_generator(&config.generation)?;
    let workflow = build_workflow(config, Arc::clone(&generator))?;
    Ok(EvaluationEngine::new(workflow, generator)
        .with_repeats(config.evaluation.repeats)
        .with_concurrency(config.evaluation.concurrency))
}
