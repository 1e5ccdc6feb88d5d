use thiserror::Error;

#[derive(Error, Debug)]
pub enum MemoryError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("embedding error: {0}")]
    Embedding(String),

    #[error("tokenization error: {0}")]
    Tokenization(String),

    #[error("not found: {0}")]
    NotFound(String),
}

pub type MemoryResult<T> = Result<T, MemoryError>;

impl From<MemoryError> for shannon_types::ShannonError {
    fn from(err: MemoryError) -> Self {
        shannon_types::ShannonError::Internal(anyhow::anyhow!(err))
    }
}
