use thiserror::Error;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("store error: {0}")]
    Store(#[from] deploy_store::StoreError),

    #[error("platform error: {0}")]
    Platform(#[from] deploy_platform::PlatformError),

    #[error("queue error: {0}")]
    Queue(#[from] deploy_queue::QueueError),

    #[error("snapshot decode error: {0}")]
    Snapshot(#[from] deploy_domain::SnapshotDecodeError),

    #[error("delivery body is not valid utf-8: {0}")]
    InvalidUtf8(#[from] std::str::Utf8Error),

    #[error("request is missing {0}")]
    MissingField(&'static str),
}
