use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::agent_state::AgentState;
use crate::query::{CapabilityFlags, PromptingMode, QueryCategory};
use crate::ticker::Ticker;

/// A named, immutable ablation setting: which capabilities run and how the
/// synthesis prompt is primed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AblationConfiguration {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub capabilities: CapabilityFlags,
    #[serde(default)]
    pub prompting: PromptingMode,
}

impl AblationConfiguration {
    pub fn new(
        name: &str,
        description: &str,
        rag: bool,
        tools: bool,
        prompting: PromptingMode,
    ) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            capabilities: CapabilityFlags { rag, tools },
            prompting,
        }
    }
}

/// The standard ablation grid: the full system plus one configuration per
/// removed capability or reduced prompting mode.
pub fn default_configurations() -> Vec<AblationConfiguration> {
    use PromptingMode::*;
    vec![
        AblationConfiguration::new("full_system", "Full system with all components", true, true, FewShot),
        AblationConfiguration::new("no_rag", "Without RAG retrieval", false, true, FewShot),
        AblationConfiguration::new("no_tools", "Without financial data tools", true, false, FewShot),
        AblationConfiguration::new("rag_only", "RAG only, no tools", true, false, ZeroShot),
        AblationConfiguration::new("tools_only", "Tools only, no RAG", false, true, ZeroShot),
        AblationConfiguration::new("zero_shot", "Full system with zero-shot prompting", true, true, ZeroShot),
        AblationConfiguration::new("one_shot", "Full system with one-shot prompting", true, true, OneShot),
    ]
}

/// A labelled evaluation query.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EvalQuery {
    pub id: u32,
    pub query: String,
    /// Category a correct classification would assign.
    #[serde(default)]
    pub category: QueryCategory,
    #[serde(default)]
    pub tickers: Vec<Ticker>,
    /// Facts a well-grounded answer or context should mention.
    #[serde(default)]
    pub expected_elements: Vec<String>,
}

/// File shape for a query set: `[[queries]]` tables in TOML.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct QuerySet {
    pub queries: Vec<EvalQuery>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Completed,
    /// The run produced nothing scoreable and is excluded from aggregation.
    Skipped,
}

/// A single metric value. `value` is `None` when the metric could not be
/// computed for the run (missing context, unparseable judge reply, ...).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MetricScore {
    pub name: String,
    pub value: Option<f64>,
    pub range: (f64, f64),
}

impl MetricScore {
    pub fn unit(name: &str, value: Option<f64>) -> Self {
        Self {
            name: name.to_string(),
            value: value.map(|v| v.clamp(0.0, 1.0)),
            range: (0.0, 1.0),
        }
    }

    pub fn rating(name: &str, value: Option<f64>) -> Self {
        Self {
            name: name.to_string(),
            value: value.map(|v| v.clamp(1.0, 5.0)),
            range: (1.0, 5.0),
        }
    }
}

/// One execution of the workflow for one query under one configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EvaluationRun {
    pub run_id: Uuid,
    pub query_id: u32,
    pub config_name: String,
    pub repeat: u32,
    pub started_at: DateTime<Utc>,
    pub status: RunStatus,
    pub duration_ms: u64,
    pub state: AgentState,
    pub scores: BTreeMap<String, MetricScore>,
    pub error: Option<String>,
}

impl EvaluationRun {
    /// Score values that were actually computed.
    pub fn metric_values(&self) -> impl Iterator<Item = (&str, f64)> {
        self.scores
            .values()
            .filter_map(|score| score.value.map(|v| (score.name.as_str(), v)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_grid_has_full_system_first() {
        let configs = default_configurations();
        assert_eq!(configs.len(), 7);
        assert_eq!(configs[0].name, "full_system");
        assert_eq!(configs[0].capabilities, CapabilityFlags::ALL);

        let no_rag = configs.iter().find(|c| c.name == "no_rag").unwrap();
        assert!(!no_rag.capabilities.rag);
        assert!(no_rag.capabilities.tools);
    }

    #[test]
    fn metric_scores_clamp_to_range() {
        assert_eq!(MetricScore::unit("faithfulness", Some(1.4)).value, Some(1.0));
        assert_eq!(MetricScore::rating("judge_analysis_depth", Some(0.0)).value, Some(1.0));
        assert_eq!(MetricScore::unit("context_recall", None).value, None);
    }

    #[test]
    fn query_set_from_toml() {
        let toml_str = r#"
[[queries]]
id = 1
query = "THYAO hissesi icin temel analiz yap"
category = "fundamental"
tickers = ["THYAO"]
expected_elements = ["F/K", "gelir"]

[[queries]]
id = 25
query = "Borsa"
"#;
        let set: QuerySet = toml::from_str(toml_str).unwrap();
        assert_eq!(set.queries.len(), 2);
        assert_eq!(set.queries[0].tickers, vec![Ticker::Thyao]);
        assert_eq!(set.queries[1].category, QueryCategory::Unknown);
        assert!(set.queries[1].expected_elements.is_empty());
    }
}
