use std::collections::{BTreeSet, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use bist_agent::{Generator, Workflow};
use bist_models::{AblationConfiguration, EvalQuery, EvaluationRun, RunStatus};
use chrono::Utc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::error::EvalError;
use crate::report::AblationReport;
use crate::scoring::Scorer;

/// One (configuration, query, repeat) unit of work.
struct Job {
    configuration: Arc<AblationConfiguration>,
    query: Arc<EvalQuery>,
    repeat: u32,
}

/// Runs a query set through the workflow under each ablation configuration
/// and scores every run.
#[derive(Clone)]
pub struct EvaluationEngine {
    workflow: Workflow,
    scorer: Arc<Scorer>,
    repeats: u32,
    concurrency: usize,
}

impl EvaluationEngine {
    /// `scoring` is the generator behind the RAGAS metrics and the judge. It
    /// may be the same instance the workflow synthesizes with.
    pub fn new(workflow: Workflow, scoring: Arc<dyn Generator>) -> Self {
        Self {
            workflow,
            scorer: Arc::new(Scorer::new(scoring)),
            repeats: 1,
            concurrency: 1,
        }
    }

    pub fn with_repeats(mut self, repeats: u32) -> Self {
        self.repeats = repeats;
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Run every (configuration × query × repeat) job across the worker pool.
    ///
    /// Individual failures never abort the sweep: they are recorded as
    /// skipped runs. When `cancel` fires, workers stop picking up jobs, runs
    /// in flight are aborted and the report covers what finished.
    pub async fn run_ablation(
        &self,
        queries: &[EvalQuery],
        configurations: &[AblationConfiguration],
        cancel: CancellationToken,
    ) -> Result<AblationReport, EvalError> {
        validate(queries, configurations, self.repeats)?;

        let mut queue = VecDeque::new();
        for configuration in configurations {
            let configuration = Arc::new(configuration.clone());
            for query in queries {
                let query = Arc::new(query.clone());
                for repeat in 1..=self.repeats {
                    queue.push_back(Job {
                        configuration: Arc::clone(&configuration),
                        query: Arc::clone(&query),
                        repeat,
                    });
                }
            }
        }
        let total = queue.len();
        info!(
            jobs = total,
            configurations = configurations.len(),
            queries = queries.len(),
            repeats = self.repeats,
            workers = self.concurrency,
            "Starting ablation sweep"
        );

        let queue = Arc::new(Mutex::new(queue));
        let runs: Arc<Mutex<Vec<EvaluationRun>>> = Arc::new(Mutex::new(Vec::with_capacity(total)));

        let mut workers = JoinSet::new();
        for worker in 0..self.concurrency.min(total) {
            let engine = self.clone();
            let queue = Arc::clone(&queue);
            let runs = Arc::clone(&runs);
            let cancel = cancel.clone();
            workers.spawn(async move {
                engine.worker_loop(worker, queue, runs, cancel).await;
            });
        }
        while let Some(joined) = workers.join_next().await {
            if let Err(e) = joined {
                error!(error = %e, "Evaluation worker panicked");
            }
        }

        let runs = std::mem::take(&mut *runs.lock().unwrap_or_else(|p| p.into_inner()));
        let cancelled = cancel.is_cancelled() && runs.len() < total;
        if cancelled {
            warn!(finished = runs.len(), jobs = total, "Ablation sweep cancelled");
        } else {
            info!(finished = runs.len(), "Ablation sweep complete");
        }

        Ok(AblationReport::build(configurations, queries, runs, cancelled))
    }

    async fn worker_loop(
        &self,
        worker: usize,
        queue: Arc<Mutex<VecDeque<Job>>>,
        runs: Arc<Mutex<Vec<EvaluationRun>>>,
        cancel: CancellationToken,
    ) {
        loop {
            if cancel.is_cancelled() {
                break;
            }
            let Some(job) = queue.lock().unwrap_or_else(|p| p.into_inner()).pop_front() else {
                break;
            };

            tokio::select! {
                _ = cancel.cancelled() => {
                    info!(worker, "Evaluation worker shutting down");
                    break;
                }
                run = self.run_job(&job) => {
                    runs.lock().unwrap_or_else(|p| p.into_inner()).push(run);
                }
            }
        }
    }

    /// Execute and score a single run. Errored workflows and empty reports
    /// are recorded as skipped.
    async fn run_job(&self, job: &Job) -> EvaluationRun {
        let configuration = &job.configuration;
        let query = &job.query;
        let started_at = Utc::now();
        let start = Instant::now();

        let state = self
            .workflow
            .run(&query.query, configuration.capabilities, configuration.prompting)
            .await;
        let duration_ms = start.elapsed().as_millis() as u64;

        let mut run = EvaluationRun {
            run_id: Uuid::new_v4(),
            query_id: query.id,
            config_name: configuration.name.clone(),
            repeat: job.repeat,
            started_at,
            status: RunStatus::Skipped,
            duration_ms,
            state,
            scores: Default::default(),
            error: None,
        };

        if run.state.is_errored() || run.state.report().is_none() {
            let reason = run
                .state
                .error
                .clone()
                .unwrap_or_else(|| "empty report".to_string());
            warn!(
                query_id = query.id,
                config = %configuration.name,
                repeat = job.repeat,
                error = %reason,
                "Run skipped"
            );
            run.error = Some(reason);
            return run;
        }

        run.scores = self.scorer.score(query, configuration, &run.state).await;
        run.status = RunStatus::Completed;
        info!(
            query_id = query.id,
            config = %configuration.name,
            repeat = job.repeat,
            duration_ms,
            scored = run.metric_values().count(),
            "Run completed"
        );
        run
    }
}

fn validate(
    queries: &[EvalQuery],
    configurations: &[AblationConfiguration],
    repeats: u32,
) -> Result<(), EvalError> {
    if queries.is_empty() {
        return Err(EvalError::Invalid("query set is empty".to_string()));
    }
    if configurations.is_empty() {
        return Err(EvalError::Invalid("no configurations selected".to_string()));
    }
    if repeats == 0 {
        return Err(EvalError::Invalid("repeats must be at least 1".to_string()));
    }
    let mut names = BTreeSet::new();
    for configuration in configurations {
        if !names.insert(configuration.name.as_str()) {
            return Err(EvalError::Invalid(format!(
                "duplicate configuration name: {}",
                configuration.name
            )));
        }
    }
    let mut ids = BTreeSet::new();
    for query in queries {
        if !ids.insert(query.id) {
            return Err(EvalError::Invalid(format!("duplicate query id: {}", query.id)));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use bist_models::{default_configurations, QueryCategory};

    fn query(id: u32) -> EvalQuery {
        EvalQuery {
            id,
            query: "Makro gorunum nasil?".to_string(),
            category: QueryCategory::Macro,
            tickers: vec![],
            expected_elements: vec![],
        }
    }

    #[test]
    fn rejects_empty_inputs() {
        assert!(validate(&[], &default_configurations(), 1).is_err());
        assert!(validate(&[query(1)], &[], 1).is_err());
        assert!(validate(&[query(1)], &default_configurations(), 0).is_err());
    }

    #[test]
    fn rejects_duplicates() {
        let configs = default_configurations();
        let mut doubled = configs.clone();
        doubled.push(configs[0].clone());
        assert!(validate(&[query(1)], &doubled, 1).is_err());
        assert!(validate(&[query(1), query(1)], &configs, 1).is_err());
        assert!(validate(&[query(1), query(2)], &configs, 3).is_ok());
    }
}
