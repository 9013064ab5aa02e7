use std::collections::BTreeMap;
use std::sync::Arc;

use bist_agent::{expected_tool_set, Generator};
use bist_models::{AblationConfiguration, AgentState, EvalQuery, MetricScore};

use crate::judge::{Judge, JUDGE_OVERALL};
use crate::ragas::{
    RagasScorer, ANSWER_RELEVANCY, CONTEXT_PRECISION, CONTEXT_RECALL, FAITHFULNESS,
};
use crate::tool_metrics::{self, TOOL_F1, TOOL_OUTPUT_VALIDITY, TOOL_PRECISION, TOOL_RECALL};

/// 1.0 when the classifier assigned the labelled category.
pub const CATEGORY_ACCURACY: &str = "category_accuracy";

/// Every scorer applied to a finished run.
pub struct Scorer {
    ragas: RagasScorer,
    judge: Judge,
}

impl Scorer {
    pub fn new(generator: Arc<dyn Generator>) -> Self {
        Self {
            ragas: RagasScorer::new(Arc::clone(&generator)),
            judge: Judge::new(generator),
        }
    }

    pub async fn score(
        &self,
        query: &EvalQuery,
        configuration: &AblationConfiguration,
        state: &AgentState,
    ) -> BTreeMap<String, MetricScore> {
        let (ragas, judge) = tokio::join!(
            self.ragas.score(state, &query.expected_elements),
            self.judge.evaluate(state),
        );

        let expected = expected_tool_set(query.category, configuration.capabilities);
        let tools = tool_metrics::score(&state.tool_set(), &expected, state);

        let mut scores = vec![
            MetricScore::unit(FAITHFULNESS, ragas.faithfulness),
            MetricScore::unit(ANSWER_RELEVANCY, ragas.answer_relevancy),
            MetricScore::unit(CONTEXT_PRECISION, ragas.context_precision),
            MetricScore::unit(CONTEXT_RECALL, ragas.context_recall),
            MetricScore::unit(TOOL_PRECISION, Some(tools.precision)),
            MetricScore::unit(TOOL_RECALL, Some(tools.recall)),
            MetricScore::unit(TOOL_F1, Some(tools.f1)),
            MetricScore::unit(TOOL_OUTPUT_VALIDITY, tools.output_validity),
            MetricScore::unit(
                CATEGORY_ACCURACY,
                Some(if state.category == query.category { 1.0 } else { 0.0 }),
            ),
            MetricScore::rating(JUDGE_OVERALL, judge.overall()),
        ];
        for (name, value) in judge.named() {
            scores.push(MetricScore::rating(&name, value));
        }

        scores.into_iter().map(|s| (s.name.clone(), s)).collect()
    }
}
