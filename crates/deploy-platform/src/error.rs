use thiserror::Error;

#[derive(Debug, Error)]
pub enum PlatformError {
    #[error("create failed: {0}")]
    CreateFailed(String),

    #[error("delete failed: {0}")]
    DeleteFailed(String),

    #[error("readiness timed out after {0:?}")]
    ReadinessTimeout(std::time::Duration),

    #[error("failed to load platform credentials: {0}")]
    Credentials(String),

    #[error("internal platform error: {0}")]
    Internal(String),
}
