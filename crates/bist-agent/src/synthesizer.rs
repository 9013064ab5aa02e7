use std::sync::Arc;

use bist_models::{AgentState, StepStatus, ToolId, ToolResult};
use tracing::{info, warn};

use crate::generation::{GenerationRequest, Generator};
use crate::prompts::{synthesis_prompt, system_prompt};

pub const GAPS_HEADING: &str = "## Veri Eksiklikleri (data gaps)";

/// Outcome of the synthesis step. The report is always non-empty.
#[derive(Debug, Clone, PartialEq)]
pub struct Synthesis {
    pub report: String,
    pub status: StepStatus,
    pub detail: Option<String>,
}

/// Turns gathered evidence into a Markdown report via a generator.
#[derive(Clone)]
pub struct Synthesizer {
    generator: Arc<dyn Generator>,
}

impl Synthesizer {
    pub fn new(generator: Arc<dyn Generator>) -> Self {
        Self { generator }
    }

    /// Generate the report. Generation failures fall back to a degraded report
    /// listing the raw gathered data; failed data sources are always disclosed.
    pub async fn synthesize(&self, state: &AgentState) -> Synthesis {
        let request = GenerationRequest::new(
            "synthesis",
            system_prompt(state.prompting),
            synthesis_prompt(state),
            state.prompting,
        );

        let (body, status, detail) = match self.generator.generate(&request).await {
            Ok(text) if !text.trim().is_empty() => {
                info!(chars = text.len(), backend = %self.generator.name(), "Report generated");
                (text.trim_end().to_string(), StepStatus::Ok, None)
            }
            Ok(_) => {
                warn!("Generator returned a blank report, using degraded report");
                let reason = "empty response".to_string();
                (degraded_report(state, &reason), StepStatus::Degraded, Some(reason))
            }
            Err(e) => {
                warn!(error = %e, "Synthesis failed, using degraded report");
                let reason = e.to_string();
                (degraded_report(state, &reason), StepStatus::Degraded, Some(reason))
            }
        };

        let report = match gap_section(state) {
            Some(gaps) => format!("{body}\n\n{gaps}"),
            None => body,
        };

        Synthesis {
            report,
            status,
            detail,
        }
    }
}

/// Disclosure of every failed data source, or `None` when nothing failed.
pub fn gap_section(state: &AgentState) -> Option<String> {
    let mut lines: Vec<String> = state
        .failed_slots()
        .into_iter()
        .map(|(invocation, reason)| {
            format!(
                "- {} unavailable ({}) [{}]",
                invocation.tool.label(),
                reason,
                invocation.key()
            )
        })
        .collect();

    if let Some(reason) = retrieval_failure(state) {
        lines.push(format!("- {} unavailable ({})", ToolId::RagSearch.label(), reason));
    }

    if lines.is_empty() {
        None
    } else {
        Some(format!("{GAPS_HEADING}\n\n{}\n", lines.join("\n")))
    }
}

fn retrieval_failure(state: &AgentState) -> Option<&str> {
    state
        .trace
        .iter()
        .rev()
        .find(|entry| entry.step == "retrieval")
        .filter(|entry| entry.status == StepStatus::Failed)
        .map(|entry| entry.detail.as_deref().unwrap_or("unknown error"))
}

/// Report assembled without a generator: the question, what was gathered
/// and where it came from.
pub fn degraded_report(state: &AgentState, reason: &str) -> String {
    let mut report = format!(
        "# {}\n\n> Rapor sentezi basarisiz oldu ({reason}). Asagida toplanan ham veriler yer almaktadir.\n",
        state.query.trim()
    );

    let successes: Vec<_> = state
        .planned_tools
        .iter()
        .filter_map(|inv| match state.gathered.get(&inv.key()) {
            Some(ToolResult::Success { payload }) => Some((inv, payload)),
            _ => None,
        })
        .collect();

    if !successes.is_empty() {
        report.push_str("\n## Toplanan Veriler\n");
        for (invocation, payload) in successes {
            let rendered = serde_json::to_string_pretty(payload).unwrap_or_else(|_| payload.to_string());
            report.push_str(&format!(
                "\n### {} [{}]\n\n```json\n{rendered}\n```\n",
                invocation.tool.label(),
                invocation.key()
            ));
        }
    }

    if !state.context.is_empty() {
        report.push_str("\n## Kaynaklar\n\n");
        for snippet in &state.context {
            report.push_str(&format!("- {}\n", snippet.source_id));
        }
    }

    report.trim_end().to_string()
}
