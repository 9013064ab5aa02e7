pub mod aggregate;
pub mod engine;
pub mod error;
pub mod judge;
pub mod prompts;
pub mod ragas;
pub mod report;
pub mod scoring;
pub mod tool_metrics;

pub use aggregate::{aggregate, summarize, ConfigSummary, MetricSummary};
pub use engine::EvaluationEngine;
pub use error::EvalError;
pub use judge::{Judge, JudgeScores};
pub use ragas::{RagasScorer, RagasScores};
pub use report::{
    load_queries, load_results, write_results, AblationReport, ConfigResults, QueryResult,
    QueryStatus, RunRecord,
};
pub use scoring::Scorer;
pub use tool_metrics::ToolScores;
