use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, Notify};

use crate::error::QueueError;
use crate::queue::{Acker, Delivery, Queue};

struct NoopAcker;

#[async_trait]
impl Acker for NoopAcker {
    async fn ack(&self) -> Result<(), QueueError> {
        Ok(())
    }
}

/// In-process queue used by tests and the local platform: pushed bodies are
/// handed back to the next `next_delivery` caller in FIFO order, acks are no-ops.
#[derive(Clone, Default)]
pub struct InMemoryQueue {
    messages: Arc<Mutex<VecDeque<Vec<u8>>>>,
    notify: Arc<Notify>,
}

impl InMemoryQueue {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Queue for InMemoryQueue {
    async fn push(&self, body: Vec<u8>) -> Result<(), QueueError> {
        self.messages.lock().await.push_back(body);
        self.notify.notify_one();
        Ok(())
    }

    async fn next_delivery(&self) -> Result<Delivery, QueueError> {
        loop {
            if let Some(body) = self.messages.lock().await.pop_front() {
                return Ok(Delivery::new(body, Box::new(NoopAcker)));
            }
            self.notify.notified().await;
        }
    }
}
