pub mod agent_state;
pub mod config;
pub mod evaluation;
pub mod query;
pub mod ticker;
pub mod tool;

pub use agent_state::{AgentState, StepStatus, TraceEntry, WorkflowStage};
pub use config::{AgentConfig, BistConfig, DataConfig, EvaluationConfig, GenerationBackend, GenerationConfig};
pub use evaluation::{
    default_configurations, AblationConfiguration, EvalQuery, EvaluationRun, MetricScore, QuerySet,
    RunStatus,
};
pub use query::{CapabilityFlags, PromptingMode, QueryCategory};
pub use ticker::{Sector, Ticker};
pub use tool::{ContextSnippet, ToolId, ToolInvocation, ToolResult};
