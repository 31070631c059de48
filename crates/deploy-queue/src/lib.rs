pub mod error;
pub mod memory;
pub mod queue;
pub mod rabbitmq;

pub use error::QueueError;
pub use memory::InMemoryQueue;
pub use queue::{Acker, Delivery, Queue};
pub use rabbitmq::RabbitMqQueue;
