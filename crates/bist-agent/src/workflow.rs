use std::sync::Arc;

use bist_models::{AgentState, CapabilityFlags, PromptingMode, StepStatus, TraceEntry, WorkflowStage};
use chrono::{DateTime, Utc};
use tokio_util::task::AbortOnDropHandle;
use tracing::{error, info};

use crate::classifier::classify;
use crate::error::AgentError;
use crate::executor::Executor;
use crate::generation::Generator;
use crate::planner::{plan, Plan};
use crate::retriever::Retriever;
use crate::synthesizer::Synthesizer;
use crate::tools::ToolRegistry;

/// Classifier -> Planner -> Executor -> Synthesizer state machine.
///
/// Each stage takes the prior state and returns it advanced one stage.
/// Cheap to clone; clones share the generator and adapters.
#[derive(Clone)]
pub struct Workflow {
    executor: Executor,
    synthesizer: Synthesizer,
}

impl Workflow {
    pub fn new(executor: Executor, synthesizer: Synthesizer) -> Self {
        Self {
            executor,
            synthesizer,
        }
    }

    pub fn from_parts(
        registry: ToolRegistry,
        retriever: Option<Arc<dyn Retriever>>,
        generator: Arc<dyn Generator>,
        tool_timeout: std::time::Duration,
        top_k: usize,
    ) -> Self {
        Self::new(
            Executor::new(registry, retriever, tool_timeout, top_k),
            Synthesizer::new(generator),
        )
    }

    /// Answer one query. Always returns a state in a terminal stage:
    /// `Synthesized` with a non-empty report, or `Errored` with an error.
    pub async fn run(
        &self,
        query: &str,
        capabilities: CapabilityFlags,
        prompting: PromptingMode,
    ) -> AgentState {
        info!(
            query,
            rag = capabilities.rag,
            tools = capabilities.tools,
            prompting = prompting.as_str(),
            "Running workflow"
        );
        let initial = AgentState::new(query, capabilities, prompting);
        let fallback = initial.clone();
        let this = self.clone();

        // Dropping `run` aborts the stage task instead of detaching it.
        let task = AbortOnDropHandle::new(tokio::spawn(async move { this.drive(initial).await }));
        match task.await {
            Ok(state) => state,
            Err(e) => {
                let message = if e.is_panic() {
                    panic_message(e.into_panic())
                } else {
                    "workflow task cancelled".to_string()
                };
                error!(error = %message, "Workflow task panicked");
                let now = Utc::now();
                errored(fallback, "workflow", now, AgentError::Workflow(message))
            }
        }
    }

    async fn drive(&self, state: AgentState) -> AgentState {
        let started = Utc::now();

        let state = match classify_stage(state.clone()) {
            Ok(next) => next,
            Err(e) => return errored(state, "classify", started, e),
        };
        let started = Utc::now();
        let state = match plan_stage(state.clone()) {
            Ok(next) => next,
            Err(e) => return errored(state, "plan", started, e),
        };
        let started = Utc::now();
        let state = match self.gather_stage(state.clone()).await {
            Ok(next) => next,
            Err(e) => return errored(state, "gather", started, e),
        };
        let started = Utc::now();
        let state = match self.synthesize_stage(state.clone()).await {
            Ok(next) => next,
            Err(e) => return errored(state, "synthesize", started, e),
        };

        info!(
            category = %state.category,
            tools = state.planned_tools.len(),
            failed = state.failed_slots().len(),
            "Workflow complete"
        );
        state
    }

    async fn gather_stage(&self, mut state: AgentState) -> Result<AgentState, AgentError> {
        expect_stage(&state, WorkflowStage::Planned)?;
        let started = Utc::now();

        let current_plan = Plan {
            invocations: state.planned_tools.clone(),
            retrieve: state.retrieval_planned,
        };
        let gathered = self.executor.execute(&current_plan, &state.query).await;

        state.gathered = gathered.results;
        state.context = gathered.context;
        state.trace.extend(gathered.trace);

        let failed = state.failed_slots().len();
        let status = if failed > 0 {
            StepStatus::Degraded
        } else {
            StepStatus::Ok
        };
        let detail = format!(
            "{} tools ({failed} failed), {} snippets",
            state.gathered.len(),
            state.context.len()
        );
        state.record(TraceEntry::new("gather", started, Utc::now(), status, Some(detail)));
        state.stage = WorkflowStage::Gathered;
        Ok(state)
    }

    async fn synthesize_stage(&self, mut state: AgentState) -> Result<AgentState, AgentError> {
        expect_stage(&state, WorkflowStage::Gathered)?;
        let started = Utc::now();

        let synthesis = self.synthesizer.synthesize(&state).await;
        if synthesis.report.trim().is_empty() {
            return Err(AgentError::Workflow("synthesizer produced an empty report".to_string()));
        }

        state.final_report = Some(synthesis.report);
        state.record(TraceEntry::new(
            "synthesize",
            started,
            Utc::now(),
            synthesis.status,
            synthesis.detail,
        ));
        state.stage = WorkflowStage::Synthesized;
        Ok(state)
    }
}

fn classify_stage(mut state: AgentState) -> Result<AgentState, AgentError> {
    expect_stage(&state, WorkflowStage::Start)?;
    let started = Utc::now();

    let classification = classify(&state.query);
    state.tickers = classification.tickers;
    state.category = classification.category;
    state.sector = classification.sector;

    let tickers: Vec<&str> = state.tickers.iter().map(|t| t.symbol()).collect();
    let detail = format!("{} [{}]", state.category, tickers.join(","));
    state.record(TraceEntry::new("classify", started, Utc::now(), StepStatus::Ok, Some(detail)));
    state.stage = WorkflowStage::Classified;
    Ok(state)
}

fn plan_stage(mut state: AgentState) -> Result<AgentState, AgentError> {
    expect_stage(&state, WorkflowStage::Classified)?;
    let started = Utc::now();

    let planned = plan(state.category, &state.tickers, state.sector, state.capabilities);
    state.planned_tools = planned.invocations;
    state.retrieval_planned = planned.retrieve;

    let keys: Vec<String> = state.planned_tools.iter().map(|i| i.key()).collect();
    let detail = format!("[{}] retrieve={}", keys.join(","), state.retrieval_planned);
    state.record(TraceEntry::new("plan", started, Utc::now(), StepStatus::Ok, Some(detail)));
    state.stage = WorkflowStage::Planned;
    Ok(state)
}

fn expect_stage(state: &AgentState, expected: WorkflowStage) -> Result<(), AgentError> {
    if state.stage == expected {
        Ok(())
    } else {
        Err(AgentError::Workflow(format!(
            "expected stage {expected:?}, found {:?}",
            state.stage
        )))
    }
}

fn errored(mut state: AgentState, step: &str, started: DateTime<Utc>, error: AgentError) -> AgentState {
    error!(step, error = %error, "Workflow step failed");
    state.record(TraceEntry::new(
        step,
        started,
        Utc::now(),
        StepStatus::Failed,
        Some(error.to_string()),
    ));
    state.error = Some(error.to_string());
    state.final_report = None;
    state.stage = WorkflowStage::Errored;
    state
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("panic: {s}")
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("panic: {s}")
    } else {
        "panic: unknown payload".to_string()
    }
}
