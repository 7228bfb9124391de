//! Message bus boundary
//!
//! Thin publish/subscribe abstraction used by the order side (publish) and
//! the inventory side (subscribe). The bus owns no domain data.
//!
//! Delivery is at-least-once: a message is acknowledged only after its
//! handler reports [`HandlerOutcome::Ack`]. A [`HandlerOutcome::Retry`]
//! leaves it with the bus for redelivery.
//!
//! Implementations:
//! - [`RedisStreamBus`]: Redis Streams with a consumer group
//! - [`InMemoryBus`]: single-process queue for tests and local runs

pub mod memory;
pub mod redis_stream;
pub mod subscription;

pub use memory::InMemoryBus;
pub use redis_stream::RedisStreamBus;
pub use subscription::{subscribe, SubscriptionHandle, SubscriptionOptions};

use crate::error::Result;
use async_trait::async_trait;

/// One delivered message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusMessage {
    /// Bus-assigned id, used for acknowledgement
    pub id: String,
    pub topic: String,
    pub payload: Vec<u8>,
    /// Set when the message was handed out before and not acknowledged
    pub redelivered: bool,
}

/// What the subscriber loop should do with a message after handling it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlerOutcome {
    /// Processing finished (successfully or terminally); remove from the bus
    Ack,
    /// Processing hit a transient failure; leave for redelivery
    Retry,
}

/// Publishing side of the bus
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, topic: &str, payload: &[u8]) -> Result<()>;
}

/// Pull-based consuming side of the bus
#[async_trait]
pub trait EventSubscriber: Send + Sync {
    /// Return up to `max` messages, waiting a bounded time when none are ready.
    /// An empty vector means the wait elapsed.
    async fn fetch(&self, topic: &str, max: usize) -> Result<Vec<BusMessage>>;

    /// Mark a message as processed.
    async fn ack(&self, message: &BusMessage) -> Result<()>;

    /// Hand a message back for redelivery.
    async fn release(&self, message: &BusMessage) -> Result<()>;
}

/// Callback invoked for every delivered message
#[async_trait]
pub trait MessageHandler: Send + Sync + 'static {
    async fn handle(&self, message: &BusMessage) -> HandlerOutcome;
}
