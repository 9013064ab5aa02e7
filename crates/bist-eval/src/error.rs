use thiserror::Error;

#[derive(Error, Debug)]
pub enum EvalError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Query set parse error: {0}")]
    QuerySet(#[from] toml::de::Error),

    #[error("Invalid evaluation setup: {0}")]
    Invalid(String),
}
