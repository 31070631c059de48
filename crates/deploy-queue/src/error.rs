use thiserror::Error;

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("queue not connected")]
    NotConnected,

    #[error("broker connection failed: {0}")]
    Connect(String),

    #[error("publish failed: {0}")]
    Publish(String),

    #[error("consume failed: {0}")]
    Consume(String),

    #[error("ack failed: {0}")]
    Ack(String),
}
