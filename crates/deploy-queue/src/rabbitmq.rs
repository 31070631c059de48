use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use lapin::options::{
    BasicAckOptions, BasicConsumeOptions, BasicPublishOptions, QueueDeclareOptions,
};
use lapin::types::FieldTable;
use lapin::{BasicProperties, Channel, Connection, ConnectionProperties, Consumer};
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::error::QueueError;
use crate::queue::{Acker, Delivery, Queue};

/// Backoff schedule shared by publish and consume reconnect attempts:
/// 1 s, 2 s, 4 s, 8 s, 16 s, 30 s, then holds at 30 s.
const RECONNECT_DELAYS: [u64; 6] = [1, 2, 4, 8, 16, 30];

struct Session {
    #[allow(dead_code)] // kept alive so the channel doesn't close under us
    connection: Connection,
    channel: Channel,
    consumer: Consumer,
}

/// A reconnecting session over one durable AMQP queue.
///
/// Hides broker disconnects from callers: [`push`](Queue::push) and
/// [`next_delivery`](Queue::next_delivery) each retry across the backoff
/// schedule before giving up with [`QueueError::NotConnected`].
pub struct RabbitMqQueue {
    url: String,
    queue_name: String,
    session: Mutex<Option<Session>>,
}

impl RabbitMqQueue {
    pub fn new(url: impl Into<String>, queue_name: impl Into<String>) -> Self {
        Self { url: url.into(), queue_name: queue_name.into(), session: Mutex::new(None) }
    }

    async fn connect(&self) -> Result<Session, QueueError> {
        let connection = Connection::connect(&self.url, ConnectionProperties::default())
            .await
            .map_err(|e| QueueError::Connect(e.to_string()))?;
        let channel = connection.create_channel().await.map_err(|e| QueueError::Connect(e.to_string()))?;

        channel
            .queue_declare(
                &self.queue_name,
                QueueDeclareOptions { durable: true, ..Default::default() },
                FieldTable::default(),
            )
            .await
            .map_err(|e| QueueError::Connect(e.to_string()))?;

        let consumer = channel
            .basic_consume(
                &self.queue_name,
                "deploy-worker",
                BasicConsumeOptions::default(),
                FieldTable::default(),
            )
            .await
            .map_err(|e| QueueError::Connect(e.to_string()))?;

        Ok(Session { connection, channel, consumer })
    }

    /// Ensures `self.session` holds a live session, reconnecting with backoff
    /// if needed. Returns once a session is in place or the schedule is exhausted.
    async fn ensure_session(&self) -> Result<(), QueueError> {
        {
            let guard = self.session.lock().await;
            if guard.is_some() {
                return Ok(());
            }
        }

        for (attempt, delay) in RECONNECT_DELAYS.iter().enumerate() {
            match self.connect().await {
                Ok(session) => {
                    info!(queue = %self.queue_name, "connected to broker");
                    *self.session.lock().await = Some(session);
                    return Ok(());
                }
                Err(e) => {
                    warn!(attempt, error = %e, "broker connect failed, retrying");
                    tokio::time::sleep(Duration::from_secs(*delay)).await;
                }
            }
        }
        Err(QueueError::NotConnected)
    }
}

struct LapinAcker {
    delivery: lapin::message::Delivery,
}

#[async_trait]
impl Acker for LapinAcker {
    async fn ack(&self) -> Result<(), QueueError> {
        self.delivery
            .ack(BasicAckOptions::default())
            .await
            .map_err(|e| QueueError::Ack(e.to_string()))
    }
}

#[async_trait]
impl Queue for RabbitMqQueue {
    async fn push(&self, body: Vec<u8>) -> Result<(), QueueError> {
        for attempt in 0..RECONNECT_DELAYS.len() {
            self.ensure_session().await?;

            let result = {
                let guard = self.session.lock().await;
                match guard.as_ref() {
                    Some(session) => {
                        session
                            .channel
                            .basic_publish(
                                "",
                                &self.queue_name,
                                BasicPublishOptions::default(),
                                &body,
                                BasicProperties::default(),
                            )
                            .await
                    }
                    None => return Err(QueueError::NotConnected),
                }
            };

            match result {
                Ok(confirm) => {
                    confirm.await.map_err(|e| QueueError::Publish(e.to_string()))?;
                    return Ok(());
                }
                Err(e) => {
                    warn!(attempt, error = %e, "publish failed, dropping session");
                    *self.session.lock().await = None;
                    tokio::time::sleep(Duration::from_secs(RECONNECT_DELAYS[attempt])).await;
                }
            }
        }
        Err(QueueError::Publish("exhausted reconnect attempts".into()))
    }

    async fn next_delivery(&self) -> Result<Delivery, QueueError> {
        loop {
            self.ensure_session().await?;

            let next = {
                let mut guard = self.session.lock().await;
                match guard.as_mut() {
                    Some(session) => session.consumer.next().await,
                    None => None,
                }
            };

            match next {
                Some(Ok(delivery)) => {
                    let body = delivery.data.clone();
                    return Ok(Delivery::new(body, Box::new(LapinAcker { delivery })));
                }
                Some(Err(e)) => {
                    warn!(error = %e, "consumer stream error, reconnecting");
                    *self.session.lock().await = None;
                }
                None => {
                    warn!("consumer stream ended, reconnecting");
                    *self.session.lock().await = None;
                }
            }
        }
    }
}
