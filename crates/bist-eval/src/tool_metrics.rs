use std::collections::BTreeSet;

use bist_models::{AgentState, ToolId};

pub const TOOL_PRECISION: &str = "tool_precision";
pub const TOOL_RECALL: &str = "tool_recall";
pub const TOOL_F1: &str = "tool_f1";
pub const TOOL_OUTPUT_VALIDITY: &str = "tool_output_validity";

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ToolScores {
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    /// Share of gathered slots holding a success; `None` when nothing ran.
    pub output_validity: Option<f64>,
}

/// Compare the tools a run selected against the tools it should have selected.
pub fn score(selected: &BTreeSet<ToolId>, expected: &BTreeSet<ToolId>, state: &AgentState) -> ToolScores {
    let hits = selected.intersection(expected).count() as f64;

    let precision = match (selected.is_empty(), expected.is_empty()) {
        (true, true) => 1.0,
        (true, false) => 0.0,
        (false, _) => hits / selected.len() as f64,
    };
    let recall = match (expected.is_empty(), selected.is_empty()) {
        (true, true) => 1.0,
        (true, false) => 0.0,
        (false, _) => hits / expected.len() as f64,
    };
    let f1 = if precision + recall > 0.0 {
        2.0 * precision * recall / (precision + recall)
    } else {
        0.0
    };

    let output_validity = if state.gathered.is_empty() {
        None
    } else {
        let valid = state.gathered.values().filter(|r| r.is_success()).count();
        Some(valid as f64 / state.gathered.len() as f64)
    };

    ToolScores {
        precision,
        recall,
        f1,
        output_validity,
    }
}
