use async_trait::async_trait;

use crate::error::QueueError;

/// One message pulled off the queue, carrying its own acknowledgment handle.
///
/// The handler decides the outcome; the dispatcher acknowledges unconditionally
/// once the handler returns, whatever that outcome was.
pub struct Delivery {
    pub body: Vec<u8>,
    acker: Box<dyn Acker>,
}

impl Delivery {
    pub fn new(body: Vec<u8>, acker: Box<dyn Acker>) -> Self {
        Self { body, acker }
    }

    pub async fn ack(self) -> Result<(), QueueError> {
        self.acker.ack().await
    }
}

#[async_trait]
pub trait Acker: Send + Sync {
    async fn ack(&self) -> Result<(), QueueError>;
}

/// A long-lived session over one durable, named queue.
///
/// Implementations hide broker reconnection from callers: `push` and
/// `next_delivery` either complete against a live connection or fail with
/// [`QueueError`] after a bounded retry window — they never hang forever.
#[async_trait]
pub trait Queue: Send + Sync + 'static {
    /// Publish a message body. Blocks until the broker confirms delivery or a
    /// reconnect cycle elapses.
    async fn push(&self, body: Vec<u8>) -> Result<(), QueueError>;

    /// Pull the next delivery. Restarts the underlying consumer transparently
    /// across reconnects — callers see one logical, unbroken stream.
    async fn next_delivery(&self) -> Result<Delivery, QueueError>;
}
