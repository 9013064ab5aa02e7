use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use bist_models::{
    AblationConfiguration, EvalQuery, EvaluationRun, QueryCategory, QuerySet, RunStatus, ToolId,
    WorkflowStage,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::aggregate::{aggregate, mean, ConfigSummary};
use crate::error::EvalError;

/// Outcome of one query across its repeats under one configuration.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum QueryStatus {
    /// Every repeat completed.
    Completed,
    /// Some repeats completed, some were skipped.
    Partial,
    Skipped,
}

/// Compact, serialized view of one run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunRecord {
    pub run_id: Uuid,
    pub repeat: u32,
    pub status: RunStatus,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub category: QueryCategory,
    pub stage: WorkflowStage,
    pub tool_set: Vec<ToolId>,
    pub scores: BTreeMap<String, Option<f64>>,
    pub error: Option<String>,
    pub report: Option<String>,
}

impl From<&EvaluationRun> for RunRecord {
    fn from(run: &EvaluationRun) -> Self {
        Self {
            run_id: run.run_id,
            repeat: run.repeat,
            status: run.status,
            started_at: run.started_at,
            duration_ms: run.duration_ms,
            category: run.state.category,
            stage: run.state.stage,
            tool_set: run.state.tool_set().into_iter().collect(),
            scores: run
                .scores
                .iter()
                .map(|(name, score)| (name.clone(), score.value))
                .collect(),
            error: run.error.clone(),
            report: run.state.final_report.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QueryResult {
    /// Per-metric mean over the completed repeats; `null` when no repeat
    /// produced a value.
    pub metrics: BTreeMap<String, Option<f64>>,
    /// Mean wall-clock duration over every repeat.
    pub duration_ms: f64,
    pub status: QueryStatus,
    pub runs: Vec<RunRecord>,
}

impl QueryResult {
    fn from_runs(runs: &[&EvaluationRun]) -> Self {
        let completed: Vec<&&EvaluationRun> = runs
            .iter()
            .filter(|r| r.status == RunStatus::Completed)
            .collect();

        let mut samples: BTreeMap<String, Vec<f64>> = BTreeMap::new();
        for run in &completed {
            for (name, score) in &run.scores {
                let slot = samples.entry(name.clone()).or_default();
                if let Some(value) = score.value {
                    slot.push(value);
                }
            }
        }
        let metrics = samples
            .into_iter()
            .map(|(name, values)| (name, mean(&values)))
            .collect();

        let durations: Vec<f64> = runs.iter().map(|r| r.duration_ms as f64).collect();
        let status = match (completed.len(), runs.len()) {
            (0, _) => QueryStatus::Skipped,
            (c, n) if c == n => QueryStatus::Completed,
            _ => QueryStatus::Partial,
        };

        Self {
            metrics,
            duration_ms: mean(&durations).unwrap_or(0.0),
            status,
            runs: runs.iter().map(|r| RunRecord::from(*r)).collect(),
        }
    }
}

/// Everything recorded for one configuration: one entry per query id plus
/// the `aggregate` table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConfigResults {
    #[serde(flatten)]
    pub queries: BTreeMap<String, QueryResult>,
    pub aggregate: ConfigSummary,
}

/// Result of an ablation sweep.
#[derive(Debug, Clone)]
pub struct AblationReport {
    pub generated_at: DateTime<Utc>,
    pub configurations: BTreeMap<String, ConfigResults>,
    /// Configuration names in the order they were requested.
    pub order: Vec<String>,
    pub runs: Vec<EvaluationRun>,
    /// True when the sweep was cancelled before every job finished.
    pub cancelled: bool,
}

impl AblationReport {
    pub fn build(
        configurations: &[AblationConfiguration],
        queries: &[EvalQuery],
        mut runs: Vec<EvaluationRun>,
        cancelled: bool,
    ) -> Self {
        let position = |name: &str| configurations.iter().position(|c| c.name == name);
        runs.sort_by(|a, b| {
            position(&a.config_name)
                .cmp(&position(&b.config_name))
                .then(a.query_id.cmp(&b.query_id))
                .then(a.repeat.cmp(&b.repeat))
        });

        let mut results = BTreeMap::new();
        for configuration in configurations {
            let config_runs: Vec<&EvaluationRun> = runs
                .iter()
                .filter(|r| r.config_name == configuration.name)
                .collect();

            let mut per_query = BTreeMap::new();
            for query in queries {
                let query_runs: Vec<&EvaluationRun> = config_runs
                    .iter()
                    .copied()
                    .filter(|r| r.query_id == query.id)
                    .collect();
                if query_runs.is_empty() {
                    continue;
                }
                per_query.insert(query.id.to_string(), QueryResult::from_runs(&query_runs));
            }

            results.insert(
                configuration.name.clone(),
                ConfigResults {
                    queries: per_query,
                    aggregate: aggregate(configuration, &config_runs),
                },
            );
        }

        Self {
            generated_at: Utc::now(),
            configurations: results,
            order: configurations.iter().map(|c| c.name.clone()).collect(),
            runs,
            cancelled,
        }
    }

    /// Per-configuration aggregates in request order.
    pub fn summaries(&self) -> impl Iterator<Item = &ConfigSummary> {
        self.order
            .iter()
            .filter_map(|name| self.configurations.get(name))
            .map(|results| &results.aggregate)
    }

    pub fn file_name(&self) -> String {
        format!(
            "ablation_results_{}.json",
            self.generated_at.format("%Y%m%d_%H%M%S")
        )
    }
}

/// Write the results document into `dir`, creating it if needed. Returns the
/// path written.
pub fn write_results(report: &AblationReport, dir: &Path) -> Result<PathBuf, EvalError> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(report.file_name());
    let json = serde_json::to_string_pretty(&report.configurations)?;
    std::fs::write(&path, json)?;
    info!(path = %path.display(), configurations = report.configurations.len(), "Wrote results");
    Ok(path)
}

pub fn load_results(path: &Path) -> Result<BTreeMap<String, ConfigResults>, EvalError> {
    let content = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

/// Load a labelled query set from a TOML file of `[[queries]]` tables.
pub fn load_queries(path: &Path) -> Result<Vec<EvalQuery>, EvalError> {
    let content = std::fs::read_to_string(path)?;
    let set: QuerySet = toml::from_str(&content)?;
    if set.queries.is_empty() {
        return Err(EvalError::Invalid(format!(
            "{} contains no queries",
            path.display()
        )));
    }
    Ok(set.queries)
}
