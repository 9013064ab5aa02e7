use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use bist_models::{ContextSnippet, StepStatus, ToolInvocation, ToolResult, TraceEntry};
use chrono::Utc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::planner::Plan;
use crate::retriever::Retriever;
use crate::tools::ToolRegistry;

/// Everything the executor collected for one plan.
#[derive(Debug, Clone, Default)]
pub struct Gathered {
    /// One entry per planned invocation, keyed by `ToolInvocation::key`.
    pub results: BTreeMap<String, ToolResult>,
    pub context: Vec<ContextSnippet>,
    pub trace: Vec<TraceEntry>,
}

/// Runs a plan's tool calls and retrieval concurrently. Individual failures
/// become `ToolResult::Failure` slots; `execute` itself never fails.
#[derive(Clone)]
pub struct Executor {
    registry: ToolRegistry,
    retriever: Option<Arc<dyn Retriever>>,
    tool_timeout: Duration,
    top_k: usize,
}

enum Pending {
    Ready(ToolResult),
    Running(JoinHandle<ToolResult>),
}

impl Executor {
    pub fn new(
        registry: ToolRegistry,
        retriever: Option<Arc<dyn Retriever>>,
        tool_timeout: Duration,
        top_k: usize,
    ) -> Self {
        Self {
            registry,
            retriever,
            tool_timeout,
            top_k,
        }
    }

    pub async fn execute(&self, plan: &Plan, query: &str) -> Gathered {
        let started = Utc::now();

        // 1. Spawn every tool call; no call waits on another
        let mut pending: Vec<(ToolInvocation, Pending)> = Vec::new();
        for invocation in &plan.invocations {
            pending.push((*invocation, self.spawn_tool(*invocation)));
        }

        let retrieval = if plan.retrieve {
            self.retriever.as_ref().map(|retriever| {
                let retriever = Arc::clone(retriever);
                let query = query.to_string();
                let top_k = self.top_k;
                let timeout = self.tool_timeout;
                tokio::spawn(async move {
                    match tokio::time::timeout(timeout, retriever.search(&query, top_k)).await {
                        Ok(Ok(snippets)) => Ok(snippets),
                        Ok(Err(e)) => Err(e.to_string()),
                        Err(_) => Err("timeout".to_string()),
                    }
                })
            })
        } else {
            None
        };

        // 2. Collect in plan order
        let mut gathered = Gathered::default();
        for (invocation, slot) in pending {
            let result = match slot {
                Pending::Ready(result) => result,
                Pending::Running(handle) => match handle.await {
                    Ok(result) => result,
                    Err(e) => {
                        error!(tool = %invocation.key(), error = %e, "Tool task panicked");
                        ToolResult::failure("tool panicked")
                    }
                },
            };

            let (status, detail) = match result.failure_reason() {
                Some(reason) => {
                    warn!(tool = %invocation.key(), reason, "Tool failed");
                    (StepStatus::Failed, Some(reason.to_string()))
                }
                None => {
                    debug!(tool = %invocation.key(), "Tool succeeded");
                    (StepStatus::Ok, None)
                }
            };
            gathered.trace.push(TraceEntry::new(
                format!("tool:{}", invocation.key()),
                started,
                Utc::now(),
                status,
                detail,
            ));
            gathered.results.insert(invocation.key(), result);
        }

        // 3. Retrieval degrades to empty context
        let retrieval_started = started;
        let (status, detail) = match retrieval {
            None if !plan.retrieve => (StepStatus::Skipped, Some("retrieval disabled".to_string())),
            None => (StepStatus::Skipped, Some("no retriever configured".to_string())),
            Some(handle) => match handle.await {
                Ok(Ok(snippets)) => {
                    let detail = format!("{} snippets", snippets.len());
                    gathered.context = snippets;
                    (StepStatus::Ok, Some(detail))
                }
                Ok(Err(reason)) => {
                    warn!(reason = %reason, "Retrieval failed, continuing without context");
                    (StepStatus::Failed, Some(reason))
                }
                Err(e) => {
                    error!(error = %e, "Retrieval task panicked");
                    (StepStatus::Failed, Some("retrieval panicked".to_string()))
                }
            },
        };
        gathered.trace.push(TraceEntry::new(
            "retrieval",
            retrieval_started,
            Utc::now(),
            status,
            detail,
        ));

        info!(
            tools = gathered.results.len(),
            failed = gathered.results.values().filter(|r| !r.is_success()).count(),
            snippets = gathered.context.len(),
            "Gathering complete"
        );
        gathered
    }

    fn spawn_tool(&self, invocation: ToolInvocation) -> Pending {
        if invocation.tool.requires_ticker() && invocation.ticker.is_none() {
            return Pending::Ready(ToolResult::failure("ticker_required"));
        }
        let Some(adapter) = self.registry.get(invocation.tool) else {
            return Pending::Ready(ToolResult::failure("tool not registered"));
        };

        let timeout = self.tool_timeout;
        Pending::Running(tokio::spawn(async move {
            match tokio::time::timeout(timeout, adapter.invoke(invocation.ticker)).await {
                Ok(Ok(payload)) => ToolResult::success(payload),
                Ok(Err(e)) => ToolResult::failure(e.to_string()),
                Err(_) => ToolResult::failure("timeout"),
            }
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{FailingRetriever, ScriptedTool, StaticRetriever};
    use bist_models::{Ticker, ToolId};

    fn plan_of(invocations: Vec<ToolInvocation>, retrieve: bool) -> Plan {
        Plan {
            invocations,
            retrieve,
        }
    }

    fn executor(registry: ToolRegistry, retriever: Option<Arc<dyn Retriever>>) -> Executor {
        Executor::new(registry, retriever, Duration::from_millis(200), 5)
    }

    #[tokio::test]
    async fn every_planned_invocation_gets_a_slot() {
        let registry = ToolRegistry::new()
            .with(Arc::new(ScriptedTool::ok(ToolId::MarketData, serde_json::json!({"price": 1}))))
            .with(Arc::new(ScriptedTool::failing(ToolId::Technicals, "insufficient data")));
        let plan = plan_of(
            vec![
                ToolInvocation::new(ToolId::MarketData, Some(Ticker::Akbnk)),
                ToolInvocation::new(ToolId::MarketData, Some(Ticker::Garan)),
                ToolInvocation::new(ToolId::Technicals, Some(Ticker::Akbnk)),
                ToolInvocation::new(ToolId::MacroData, None),
            ],
            false,
        );

        let gathered = executor(registry, None).execute(&plan, "AKBNK GARAN").await;
        assert_eq!(gathered.results.len(), 4);
        assert!(gathered.results["market_data:AKBNK"].is_success());
        assert!(gathered.results["market_data:GARAN"].is_success());
        assert_eq!(
            gathered.results["technicals:AKBNK"].failure_reason(),
            Some("insufficient data")
        );
        assert_eq!(
            gathered.results["macro_data"].failure_reason(),
            Some("tool not registered")
        );
    }

    #[tokio::test]
    async fn ticker_scoped_tool_without_ticker_fails_fast() {
        let tool = Arc::new(ScriptedTool::ok(ToolId::Technicals, serde_json::json!({})));
        let registry = ToolRegistry::new().with(tool.clone());
        let plan = plan_of(vec![ToolInvocation::new(ToolId::Technicals, None)], false);

        let gathered = executor(registry, None).execute(&plan, "teknik").await;
        assert_eq!(
            gathered.results["technicals"].failure_reason(),
            Some("ticker_required")
        );
        assert_eq!(tool.calls(), 0);
    }

    #[tokio::test]
    async fn slow_tool_times_out_without_blocking_siblings() {
        let registry = ToolRegistry::new()
            .with(Arc::new(ScriptedTool::slow(ToolId::MarketData, Duration::from_secs(5))))
            .with(Arc::new(ScriptedTool::ok(ToolId::MacroData, serde_json::json!({"rate": 45}))));
        let plan = plan_of(
            vec![
                ToolInvocation::new(ToolId::MarketData, Some(Ticker::Thyao)),
                ToolInvocation::new(ToolId::MacroData, None),
            ],
            false,
        );

        let gathered = executor(registry, None).execute(&plan, "THYAO").await;
        assert_eq!(gathered.results["market_data:THYAO"].failure_reason(), Some("timeout"));
        assert!(gathered.results["macro_data"].is_success());
    }

    #[tokio::test]
    async fn panicking_tool_becomes_failure() {
        let registry = ToolRegistry::new()
            .with(Arc::new(ScriptedTool::panicking(ToolId::ModelPortfolios)));
        let plan = plan_of(vec![ToolInvocation::new(ToolId::ModelPortfolios, None)], false);

        let gathered = executor(registry, None).execute(&plan, "portfoy").await;
        assert_eq!(
            gathered.results["model_portfolios"].failure_reason(),
            Some("tool panicked")
        );
    }

    #[tokio::test]
    async fn retrieval_results_become_context() {
        let retriever: Arc<dyn Retriever> = Arc::new(StaticRetriever::with_texts(&["a", "b"]));
        let gathered = executor(ToolRegistry::new(), Some(retriever))
            .execute(&plan_of(vec![], true), "THYAO")
            .await;
        assert_eq!(gathered.context.len(), 2);
        let last = gathered.trace.last().unwrap();
        assert_eq!(last.step, "retrieval");
        assert_eq!(last.status, StepStatus::Ok);
    }

    #[tokio::test]
    async fn retrieval_failure_degrades_to_empty_context() {
        let retriever: Arc<dyn Retriever> = Arc::new(FailingRetriever);
        let gathered = executor(ToolRegistry::new(), Some(retriever))
            .execute(&plan_of(vec![], true), "THYAO")
            .await;
        assert!(gathered.context.is_empty());
        assert_eq!(gathered.trace.last().unwrap().status, StepStatus::Failed);
    }

    #[tokio::test]
    async fn retrieval_skipped_when_not_planned() {
        let retriever = Arc::new(StaticRetriever::with_texts(&["a"]));
        let gathered = executor(ToolRegistry::new(), Some(retriever.clone() as Arc<dyn Retriever>))
            .execute(&plan_of(vec![], false), "THYAO")
            .await;
        assert!(gathered.context.is_empty());
        assert_eq!(gathered.trace.last().unwrap().status, StepStatus::Skipped);
        assert_eq!(retriever.calls(), 0);
    }
}
