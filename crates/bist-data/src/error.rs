use thiserror::Error;

#[derive(Error, Debug)]
pub enum DataError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("no data for {0}")]
    NotFound(String),

    /// Too little price history to compute indicators.
    #[error("insufficient data")]
    InsufficientData { symbol: String, available: usize },
}
