use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::query::{CapabilityFlags, PromptingMode, QueryCategory};
use crate::ticker::{Sector, Ticker};
use crate::tool::{ContextSnippet, ToolId, ToolInvocation, ToolResult};

/// Position of a query in the workflow state machine.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStage {
    #[default]
    Start,
    Classified,
    Planned,
    Gathered,
    Synthesized,
    Errored,
}

impl WorkflowStage {
    pub fn is_terminal(&self) -> bool {
        matches!(self, WorkflowStage::Synthesized | WorkflowStage::Errored)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Ok,
    /// The step completed but fell back to a reduced output.
    Degraded,
    Failed,
    Skipped,
}

/// One observed step of a workflow run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TraceEntry {
    pub step: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub status: StepStatus,
    pub detail: Option<String>,
}

impl TraceEntry {
    pub fn new(
        step: impl Into<String>,
        started_at: DateTime<Utc>,
        finished_at: DateTime<Utc>,
        status: StepStatus,
        detail: Option<String>,
    ) -> Self {
        let duration_ms = (finished_at - started_at).num_milliseconds().max(0) as u64;
        Self {
            step: step.into(),
            started_at,
            finished_at,
            duration_ms,
            status,
            detail,
        }
    }
}

/// The record threaded through the workflow for a single query.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AgentState {
    pub query: String,
    /// Tickers named in the query, in order of first appearance.
    pub tickers: Vec<Ticker>,
    pub category: QueryCategory,
    /// Sector named in the query, used to widen sector and comparison plans.
    #[serde(default)]
    pub sector: Option<Sector>,
    pub capabilities: CapabilityFlags,
    pub prompting: PromptingMode,
    pub planned_tools: Vec<ToolInvocation>,
    pub retrieval_planned: bool,
    /// Keyed by `ToolInvocation::key`. Keys are always a subset of `planned_tools`.
    pub gathered: BTreeMap<String, ToolResult>,
    pub context: Vec<ContextSnippet>,
    pub final_report: Option<String>,
    pub trace: Vec<TraceEntry>,
    pub stage: WorkflowStage,
    pub error: Option<String>,
}

impl AgentState {
    pub fn new(query: impl Into<String>, capabilities: CapabilityFlags, prompting: PromptingMode) -> Self {
        Self {
            query: query.into(),
            tickers: Vec::new(),
            category: QueryCategory::Unknown,
            sector: None,
            capabilities,
            prompting,
            planned_tools: Vec::new(),
            retrieval_planned: false,
            gathered: BTreeMap::new(),
            context: Vec::new(),
            final_report: None,
            trace: Vec::new(),
            stage: WorkflowStage::Start,
            error: None,
        }
    }

    pub fn primary_ticker(&self) -> Option<Ticker> {
        self.tickers.first().copied()
    }

    /// Distinct tools selected for this query, counting retrieval as `RagSearch`.
    pub fn tool_set(&self) -> BTreeSet<ToolId> {
        let mut set: BTreeSet<ToolId> = self.planned_tools.iter().map(|inv| inv.tool).collect();
        if self.retrieval_planned {
            set.insert(ToolId::RagSearch);
        }
        set
    }

    /// Planned invocations whose slot holds a failure, with the reason.
    pub fn failed_slots(&self) -> Vec<(ToolInvocation, String)> {
        self.planned_tools
            .iter()
            .filter_map(|inv| {
                self.gathered
                    .get(&inv.key())
                    .and_then(|result| result.failure_reason())
                    .map(|reason| (*inv, reason.to_string()))
            })
            .collect()
    }

    pub fn report(&self) -> Option<&str> {
        self.final_report.as_deref().filter(|r| !r.trim().is_empty())
    }

    pub fn is_errored(&self) -> bool {
        self.stage == WorkflowStage::Errored
    }

    pub fn record(&mut self, entry: TraceEntry) {
        self.trace.push(entry);
    }
}
