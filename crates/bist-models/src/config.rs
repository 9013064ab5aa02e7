use serde::{Deserialize, Serialize};

use crate::evaluation::{default_configurations, AblationConfiguration};

/// Top-level configuration, loaded from `config/bist.toml`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct BistConfig {
    #[serde(default)]
    pub generation: GenerationConfig,
    #[serde(default)]
    pub agent: AgentConfig,
    #[serde(default)]
    pub evaluation: EvaluationConfig,
    #[serde(default)]
    pub data: DataConfig,
}

/// Which language-generation provider backs `generate()`.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum GenerationBackend {
    /// A local LLM command line tool invoked per request.
    #[default]
    Cli,
    Gemini,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GenerationConfig {
    #[serde(default)]
    pub backend: GenerationBackend,
    /// Model name passed to the backend; each backend has its own default.
    #[serde(default)]
    pub model: Option<String>,
    /// Program spawned by the CLI backend.
    #[serde(default = "default_command")]
    pub command: String,
    #[serde(default = "default_generation_timeout")]
    pub timeout_seconds: u64,
    /// Environment variable holding the provider API key.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    /// Upper bound on generation calls in flight, sized to the provider quota.
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,
    /// Attempts per call, including the first, before a quota/transport error is final.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// First retry delay in milliseconds; doubles on each further retry.
    #[serde(default = "default_base_backoff_ms")]
    pub base_backoff_ms: u64,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            backend: GenerationBackend::default(),
            model: None,
            command: default_command(),
            timeout_seconds: default_generation_timeout(),
            api_key_env: default_api_key_env(),
            max_concurrent: default_max_concurrent(),
            max_attempts: default_max_attempts(),
            base_backoff_ms: default_base_backoff_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AgentConfig {
    /// Per-invocation bound for tool calls and the retrieval call.
    #[serde(default = "default_tool_timeout")]
    pub tool_timeout_seconds: u64,
    #[serde(default = "default_top_k")]
    pub retrieval_top_k: usize,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            tool_timeout_seconds: default_tool_timeout(),
            retrieval_top_k: default_top_k(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EvaluationConfig {
    /// Repeats per (query, configuration) pair, smoothing generation nondeterminism.
    #[serde(default = "default_repeats")]
    pub repeats: u32,
    /// Workflow runs executing at the same time.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    #[serde(default = "default_results_dir")]
    pub results_dir: String,
    #[serde(default = "default_queries_path")]
    pub queries_path: String,
    #[serde(default = "default_configurations")]
    pub configurations: Vec<AblationConfiguration>,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            repeats: default_repeats(),
            concurrency: default_concurrency(),
            results_dir: default_results_dir(),
            queries_path: default_queries_path(),
            configurations: default_configurations(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DataConfig {
    #[serde(default = "default_snapshot_path")]
    pub market_snapshot_path: String,
    #[serde(default = "default_documents_path")]
    pub documents_path: String,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            market_snapshot_path: default_snapshot_path(),
            documents_path: default_documents_path(),
        }
    }
}

fn default_command() -> String {
    "claude".to_string()
}
fn default_generation_timeout() -> u64 {
    90
}
fn default_api_key_env() -> String {
    "GEMINI_API_KEY".to_string()
}
fn default_max_concurrent() -> usize {
    4
}
fn default_max_attempts() -> u32 {
    4
}
fn default_base_backoff_ms() -> u64 {
    1_000
}
fn default_tool_timeout() -> u64 {
    20
}
fn default_top_k() -> usize {
    5
}
fn default_repeats() -> u32 {
    3
}
fn default_concurrency() -> usize {
    4
}
fn default_results_dir() -> String {
    "results".to_string()
}
fn default_queries_path() -> String {
    "config/eval-queries.toml".to_string()
}
fn default_snapshot_path() -> String {
    "data/market_snapshot.json".to_string()
}
fn default_documents_path() -> String {
    "data/documents.json".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::PromptingMode;

    #[test]
    fn empty_file_uses_defaults() {
        let config: BistConfig = toml::from_str("").unwrap();
        assert_eq!(config, BistConfig::default());
        assert_eq!(config.evaluation.repeats, 3);
        assert_eq!(config.evaluation.configurations.len(), 7);
        assert_eq!(config.generation.backend, GenerationBackend::Cli);
    }

    #[test]
    fn config_from_toml() {
        let toml_str = r#"
[generation]
backend = "gemini"
model = "gemini-2.0-flash"
max_concurrent = 2

[agent]
tool_timeout_seconds = 5

[evaluation]
repeats = 1
results_dir = "/tmp/results"

[[evaluation.configurations]]
name = "full_system"
capabilities = { rag = true, tools = true }
prompting = "few_shot"

[[evaluation.configurations]]
name = "no_rag"
capabilities = { rag = false, tools = true }
"#;
        let config: BistConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.generation.backend, GenerationBackend::Gemini);
        assert_eq!(config.generation.model.as_deref(), Some("gemini-2.0-flash"));
        assert_eq!(config.generation.max_concurrent, 2);
        assert_eq!(config.generation.max_attempts, 4);
        assert_eq!(config.agent.tool_timeout_seconds, 5);
        assert_eq!(config.agent.retrieval_top_k, 5);
        assert_eq!(config.evaluation.configurations.len(), 2);
        assert_eq!(config.evaluation.configurations[1].prompting, PromptingMode::FewShot);
        assert!(!config.evaluation.configurations[1].capabilities.rag);
        assert_eq!(config.data, DataConfig::default());
    }

    #[test]
    fn roundtrip_config() {
        let config = BistConfig::default();
        let toml_str = toml::to_string(&config).unwrap();
        let parsed: BistConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed, config);
    }
}
