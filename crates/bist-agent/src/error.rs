use std::time::Duration;

use bist_data::DataError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AgentError {
    #[error("Generation error: {0}")]
    Generation(#[from] GenerationError),

    #[error("Response parse error: {0}")]
    Parse(String),

    #[error("Workflow error: {0}")]
    Workflow(String),

    /// Tool-level failure; the message becomes the failure reason verbatim.
    #[error("{0}")]
    Tool(String),

    #[error(transparent)]
    Data(#[from] DataError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Failure of a single `generate()` call.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GenerationError {
    #[error("quota exceeded: {detail}")]
    Quota {
        detail: String,
        retry_after: Option<Duration>,
    },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("generation timed out after {0} seconds")]
    Timeout(u64),

    #[error("provider rejected request: {0}")]
    Api(String),

    #[error("provider returned an empty response")]
    Empty,

    #[error("generation backend not configured: {0}")]
    Config(String),
}

impl GenerationError {
    /// Quota, transport and timeout failures are worth retrying after a delay.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            GenerationError::Quota { .. } | GenerationError::Transport(_) | GenerationError::Timeout(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_errors_display_verbatim() {
        let err: AgentError = DataError::InsufficientData {
            symbol: "TCELL".to_string(),
            available: 3,
        }
        .into();
        assert_eq!(err.to_string(), "insufficient data");
    }

    #[test]
    fn retryable_generation_errors() {
        let quota = GenerationError::Quota {
            detail: "429".to_string(),
            retry_after: None,
        };
        assert!(quota.is_retryable());
        assert!(GenerationError::Timeout(30).is_retryable());
        assert!(!GenerationError::Api("bad request".to_string()).is_retryable());
        assert!(!GenerationError::Empty.is_retryable());
    }
}
