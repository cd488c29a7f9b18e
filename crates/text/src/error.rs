use thiserror::Error;

#[derive(Debug, Error)]
pub enum TokenizerError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("tokenizer json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid tokenizer: {0}")]
    Invalid(String),
}
