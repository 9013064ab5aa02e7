use std::collections::BTreeMap;

use bist_models::{AblationConfiguration, EvaluationRun, RunStatus};
use serde::{Deserialize, Serialize};

/// Mean, population standard deviation and sample count of one metric.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct MetricSummary {
    pub mean: f64,
    pub std: f64,
    pub count: usize,
}

/// Summarize a sample. `None` for an empty sample.
pub fn summarize(values: &[f64]) -> Option<MetricSummary> {
    if values.is_empty() {
        return None;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    Some(MetricSummary {
        mean,
        std: variance.sqrt(),
        count: values.len(),
    })
}

pub fn mean(values: &[f64]) -> Option<f64> {
    summarize(values).map(|s| s.mean)
}

/// Per-configuration aggregate over every run of that configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConfigSummary {
    pub configuration: AblationConfiguration,
    pub metrics: BTreeMap<String, MetricSummary>,
    pub success_rate: f64,
    pub mean_duration_ms: f64,
    pub completed: usize,
    pub skipped: usize,
}

impl ConfigSummary {
    pub fn metric_mean(&self, name: &str) -> Option<f64> {
        self.metrics.get(name).map(|m| m.mean)
    }
}

/// Aggregate runs. Skipped runs count toward `skipped` and `success_rate`
/// only; metric summaries use the non-null values of completed runs.
pub fn aggregate(configuration: &AblationConfiguration, runs: &[&EvaluationRun]) -> ConfigSummary {
    let completed: Vec<&EvaluationRun> = runs
        .iter()
        .copied()
        .filter(|r| r.status == RunStatus::Completed)
        .collect();
    let skipped = runs.len() - completed.len();

    let mut samples: BTreeMap<String, Vec<f64>> = BTreeMap::new();
    for run in &completed {
        for (name, value) in run.metric_values() {
            samples.entry(name.to_string()).or_default().push(value);
        }
    }
    let metrics = samples
        .into_iter()
        .filter_map(|(name, values)| summarize(&values).map(|s| (name, s)))
        .collect();

    let durations: Vec<f64> = completed.iter().map(|r| r.duration_ms as f64).collect();
    let success_rate = if runs.is_empty() {
        0.0
    } else {
        completed.len() as f64 / runs.len() as f64
    };

    ConfigSummary {
        configuration: configuration.clone(),
        metrics,
        success_rate,
        mean_duration_ms: mean(&durations).unwrap_or(0.0),
        completed: completed.len(),
        skipped,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bist_models::{AgentState, CapabilityFlags, MetricScore, PromptingMode};
    use chrono::Utc;
    use uuid::Uuid;

    fn run(status: RunStatus, duration_ms: u64, scores: &[(&str, Option<f64>)]) -> EvaluationRun {
        EvaluationRun {
            run_id: Uuid::new_v4(),
            query_id: 1,
            config_name: "full_system".to_string(),
            repeat: 0,
            started_at: Utc::now(),
            status,
            duration_ms,
            state: AgentState::new("q", CapabilityFlags::ALL, PromptingMode::FewShot),
            scores: scores
                .iter()
                .map(|(name, value)| (name.to_string(), MetricScore::unit(name, *value)))
                .collect(),
            error: None,
        }
    }

    fn config() -> AblationConfiguration {
        bist_models::default_configurations().remove(0)
    }

    #[test]
    fn identical_values_have_zero_std() {
        let summary = summarize(&[0.75, 0.75, 0.75, 0.75]).unwrap();
        assert_eq!(summary.mean, 0.75);
        assert_eq!(summary.std, 0.0);
        assert_eq!(summary.count, 4);
    }

    #[test]
    fn population_std() {
        let summary = summarize(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]).unwrap();
        assert_eq!(summary.mean, 5.0);
        assert_eq!(summary.std, 2.0);
        assert!(summarize(&[]).is_none());
    }

    #[test]
    fn null_scores_and_skipped_runs_are_excluded() {
        let runs = vec![
            run(RunStatus::Completed, 100, &[("faithfulness", Some(0.8)), ("context_recall", None)]),
            run(RunStatus::Completed, 300, &[("faithfulness", Some(0.6)), ("context_recall", None)]),
            run(RunStatus::Skipped, 50, &[("faithfulness", Some(0.0))]),
        ];
        let refs: Vec<&EvaluationRun> = runs.iter().collect();
        let summary = aggregate(&config(), &refs);

        assert_eq!(summary.completed, 2);
        assert_eq!(summary.skipped, 1);
        assert!((summary.success_rate - 2.0 / 3.0).abs() < 1e-9);
        assert_eq!(summary.mean_duration_ms, 200.0);
        let faithfulness = summary.metrics["faithfulness"];
        assert!((faithfulness.mean - 0.7).abs() < 1e-9);
        assert_eq!(faithfulness.count, 2);
        assert!(!summary.metrics.contains_key("context_recall"));
    }

    #[test]
    fn empty_configuration() {
        let summary = aggregate(&config(), &[]);
        assert_eq!(summary.success_rate, 0.0);
        assert!(summary.metrics.is_empty());
    }
}
