use std::sync::Arc;

use bist_agent::parser::{parse_unit_score, parse_verdict};
use bist_agent::{GenerationRequest, Generator};
use bist_data::text::normalize;
use bist_models::{AgentState, ContextSnippet, PromptingMode};
use tracing::debug;

use crate::prompts::{
    context_relevance_prompt, faithfulness_prompt, relevancy_prompt, truncate_chars,
    SCORER_SYSTEM_PROMPT,
};

pub const FAITHFULNESS: &str = "faithfulness";
pub const ANSWER_RELEVANCY: &str = "answer_relevancy";
pub const CONTEXT_PRECISION: &str = "context_precision";
pub const CONTEXT_RECALL: &str = "context_recall";

/// Snippets considered by faithfulness and context precision.
const MAX_SNIPPETS: usize = 5;
const REPORT_CHARS: usize = 1500;
const CONTEXT_CHARS: usize = 2000;
const SNIPPET_CHARS: usize = 500;

/// Reference-free retrieval quality scores. `None` means undefined for the
/// run, which aggregation excludes rather than counting as zero.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RagasScores {
    pub faithfulness: Option<f64>,
    pub answer_relevancy: Option<f64>,
    pub context_precision: Option<f64>,
    pub context_recall: Option<f64>,
}

pub struct RagasScorer {
    generator: Arc<dyn Generator>,
}

impl RagasScorer {
    pub fn new(generator: Arc<dyn Generator>) -> Self {
        Self { generator }
    }

    pub async fn score(&self, state: &AgentState, expected_elements: &[String]) -> RagasScores {
        let Some(report) = state.report() else {
            return RagasScores::default();
        };
        let report = truncate_chars(report, REPORT_CHARS);

        let (faithfulness, answer_relevancy, context_precision) = tokio::join!(
            self.faithfulness(report, &state.context),
            self.answer_relevancy(&state.query, report),
            self.context_precision(&state.query, &state.context),
        );

        RagasScores {
            faithfulness,
            answer_relevancy,
            context_precision,
            context_recall: context_recall(&state.context, expected_elements),
        }
    }

    async fn faithfulness(&self, report: &str, context: &[ContextSnippet]) -> Option<f64> {
        if context.is_empty() {
            return None;
        }
        let joined = context
            .iter()
            .take(MAX_SNIPPETS)
            .map(|s| s.text.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");
        let prompt = faithfulness_prompt(report, truncate_chars(&joined, CONTEXT_CHARS));
        self.ask(FAITHFULNESS, prompt).await.and_then(|reply| parse_unit_score(&reply))
    }

    async fn answer_relevancy(&self, query: &str, report: &str) -> Option<f64> {
        let reply = self.ask(ANSWER_RELEVANCY, relevancy_prompt(query, report)).await?;
        parse_unit_score(&reply)
    }

    /// Fraction of the first snippets judged relevant. Snippets whose verdict
    /// cannot be read are left out of the denominator.
    async fn context_precision(&self, query: &str, context: &[ContextSnippet]) -> Option<f64> {
        if context.is_empty() {
            return None;
        }
        let mut judged = 0usize;
        let mut relevant = 0usize;
        for snippet in context.iter().take(MAX_SNIPPETS) {
            let prompt = context_relevance_prompt(query, truncate_chars(&snippet.text, SNIPPET_CHARS));
            match self.ask(CONTEXT_PRECISION, prompt).await.and_then(|r| parse_verdict(&r)) {
                Some(true) => {
                    judged += 1;
                    relevant += 1;
                }
                Some(false) => judged += 1,
                None => {}
            }
        }
        (judged > 0).then(|| relevant as f64 / judged as f64)
    }

    async fn ask(&self, purpose: &str, prompt: String) -> Option<String> {
        let request = GenerationRequest::new(purpose, SCORER_SYSTEM_PROMPT, prompt, PromptingMode::ZeroShot);
        match self.generator.generate(&request).await {
            Ok(reply) => Some(reply),
            Err(e) => {
                debug!(metric = purpose, error = %e, "Scoring call failed");
                None
            }
        }
    }
}

/// Fraction of expected elements present in the retrieved context, compared
/// case- and diacritic-insensitively. `None` without context or expectations.
pub fn context_recall(context: &[ContextSnippet], expected_elements: &[String]) -> Option<f64> {
    if context.is_empty() || expected_elements.is_empty() {
        return None;
    }
    let haystack = normalize(
        &context
            .iter()
            .map(|s| s.text.as_str())
            .collect::<Vec<_>>()
            .join("\n"),
    );
    let found = expected_elements
        .iter()
        .filter(|element| haystack.contains(&normalize(element)))
        .count();
    Some(found as f64 / expected_elements.len() as f64)
}
