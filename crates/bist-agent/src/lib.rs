pub mod classifier;
pub mod error;
pub mod executor;
pub mod gemini;
pub mod generation;
pub mod parser;
pub mod planner;
pub mod prompts;
pub mod retriever;
pub mod synthesizer;
pub mod tools;
pub mod workflow;

pub mod test_support;

pub use classifier::{classify, Classification};
pub use error::{AgentError, GenerationError};
pub use executor::{Executor, Gathered};
pub use gemini::{GeminiConfig, GeminiGenerator};
pub use generation::{
    check_cli_available, CliConfig, CliGenerator, GenerationRequest, Generator, ThrottlePolicy,
    ThrottledGenerator,
};
pub use planner::{expected_tool_set, plan, Plan};
pub use retriever::{Retriever, StoreRetriever};
pub use synthesizer::{Synthesis, Synthesizer};
pub use tools::{ToolAdapter, ToolRegistry};
pub use workflow::Workflow;
