use std::sync::Arc;

use bist_agent::parser::{extract_json, parse_number};
use bist_agent::{GenerationRequest, Generator};
use bist_models::{AgentState, PromptingMode};
use tracing::{debug, warn};

use crate::prompts::{judge_prompt, truncate_chars, SCORER_SYSTEM_PROMPT};

/// Rubric dimensions, each rated 1-5.
pub const DIMENSIONS: [&str; 5] = [
    "data_accuracy",
    "analysis_depth",
    "reasoning_quality",
    "investor_usefulness",
    "presentation_quality",
];

pub const JUDGE_OVERALL: &str = "judge_overall";

const REPORT_CHARS: usize = 3000;
const SOURCES_CHARS: usize = 1500;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct JudgeScores {
    /// Parallel to `DIMENSIONS`.
    pub dimensions: [Option<f64>; 5],
    pub strengths: Vec<String>,
    pub weaknesses: Vec<String>,
}

impl JudgeScores {
    /// Mean of the dimensions that were scored.
    pub fn overall(&self) -> Option<f64> {
        let present: Vec<f64> = self.dimensions.iter().flatten().copied().collect();
        if present.is_empty() {
            None
        } else {
            Some(present.iter().sum::<f64>() / present.len() as f64)
        }
    }

    /// `(metric_name, value)` pairs, names prefixed with `judge_`.
    pub fn named(&self) -> Vec<(String, Option<f64>)> {
        DIMENSIONS
            .iter()
            .zip(self.dimensions)
            .map(|(dim, value)| (format!("judge_{dim}"), value))
            .collect()
    }
}

/// Rubric-based report rating through a separate generation call.
pub struct Judge {
    generator: Arc<dyn Generator>,
}

impl Judge {
    pub fn new(generator: Arc<dyn Generator>) -> Self {
        Self { generator }
    }

    pub async fn evaluate(&self, state: &AgentState) -> JudgeScores {
        let Some(report) = state.report() else {
            return JudgeScores::default();
        };

        let sources = if state.context.is_empty() {
            "Kaynak bilgisi yok".to_string()
        } else {
            state
                .context
                .iter()
                .map(|s| format!("- {}", s.source_id))
                .collect::<Vec<_>>()
                .join("\n")
        };
        let prompt = judge_prompt(
            &state.query,
            truncate_chars(report, REPORT_CHARS),
            truncate_chars(&sources, SOURCES_CHARS),
        );
        let request = GenerationRequest::new("judge", SCORER_SYSTEM_PROMPT, prompt, PromptingMode::ZeroShot);

        match self.generator.generate(&request).await {
            Ok(reply) => parse_judge_reply(&reply),
            Err(e) => {
                warn!(error = %e, "Judge call failed");
                JudgeScores::default()
            }
        }
    }
}

/// Parse the judge's JSON reply. Each dimension accepts `{"score": n}` or a
/// bare number; anything else leaves that dimension `None`.
pub fn parse_judge_reply(reply: &str) -> JudgeScores {
    let parsed = extract_json(reply)
        .ok()
        .and_then(|json| serde_json::from_str::<serde_json::Value>(&json).ok());
    let Some(value) = parsed else {
        debug!(length = reply.len(), "Judge reply contained no JSON");
        return JudgeScores::default();
    };

    let mut scores = JudgeScores::default();
    for (slot, dim) in scores.dimensions.iter_mut().zip(DIMENSIONS) {
        let raw = match value.get(dim) {
            Some(serde_json::Value::Object(obj)) => obj.get("score"),
            other => other,
        };
        *slot = raw.and_then(score_value).map(|v| v.clamp(1.0, 5.0));
    }
    scores.strengths = string_list(value.get("strengths"));
    scores.weaknesses = string_list(value.get("weaknesses"));
    scores
}

fn score_value(value: &serde_json::Value) -> Option<f64> {
    match value {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => parse_number(s),
        _ => None,
    }
}

fn string_list(value: Option<&serde_json::Value>) -> Vec<String> {
    value
        .and_then(|v| v.as_array())
        .map(|items| {
            items
                .iter()
                .filter_map(|item| item.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}
