use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("no entry found with uuid '{0}'")]
    NotFound(String),

    #[error("unexpected number of rows affected: expected {expected}, got {got}")]
    RowsAffected { expected: u64, got: u64 },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("internal store error: {0}")]
    Internal(String),
}
