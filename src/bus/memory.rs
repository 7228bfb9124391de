//! In-memory bus for tests and single-process scenarios.
//!
//! Thread-safe and cheap to clone; every clone shares the same topics.
//! Each topic is a FIFO queue plus an in-flight set, which gives the same
//! at-least-once semantics as the stream bus: fetched messages stay in flight
//! until acked, released ones go back to the front of the queue.

use super::{BusMessage, EventPublisher, EventSubscriber};
use crate::error::{AppError, Result};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;

#[derive(Default)]
struct TopicState {
    queue: VecDeque<BusMessage>,
    in_flight: HashMap<String, BusMessage>,
    published: Vec<Vec<u8>>,
    acked: Vec<String>,
}

#[derive(Clone)]
pub struct InMemoryBus {
    topics: Arc<Mutex<HashMap<String, TopicState>>>,
    notify: Arc<Notify>,
    next_id: Arc<AtomicU64>,
    fail_publish: Arc<AtomicBool>,
    poll_wait: Duration,
}

impl Default for InMemoryBus {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryBus {
    pub fn new() -> Self {
        Self {
            topics: Arc::new(Mutex::new(HashMap::new())),
            notify: Arc::new(Notify::new()),
            next_id: Arc::new(AtomicU64::new(1)),
            fail_publish: Arc::new(AtomicBool::new(false)),
            poll_wait: Duration::from_millis(50),
        }
    }

    /// Make subsequent publishes fail with a transient error.
    pub fn set_publish_failure(&self, fail: bool) {
        self.fail_publish.store(fail, Ordering::SeqCst);
    }

    /// Payloads accepted on `topic`, in publish order.
    pub fn published(&self, topic: &str) -> Vec<Vec<u8>> {
        self.with_topic(topic, |t| t.published.clone())
    }

    /// Ids acknowledged on `topic`.
    pub fn acked(&self, topic: &str) -> Vec<String> {
        self.with_topic(topic, |t| t.acked.clone())
    }

    /// Messages waiting for delivery plus those delivered but not acked.
    pub fn outstanding(&self, topic: &str) -> usize {
        self.with_topic(topic, |t| t.queue.len() + t.in_flight.len())
    }

    fn with_topic<T>(&self, topic: &str, f: impl FnOnce(&mut TopicState) -> T) -> T {
        let mut topics = self
            .topics
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        f(topics.entry(topic.to_string()).or_default())
    }

    fn take_ready(&self, topic: &str, max: usize) -> Vec<BusMessage> {
        self.with_topic(topic, |t| {
            let n = max.min(t.queue.len());
            let batch: Vec<BusMessage> = t.queue.drain(..n).collect();
            for message in &batch {
                t.in_flight.insert(message.id.clone(), message.clone());
            }
            batch
        })
    }
}

#[async_trait]
impl EventPublisher for InMemoryBus {
    async fn publish(&self, topic: &str, payload: &[u8]) -> Result<()> {
        if self.fail_publish.load(Ordering::SeqCst) {
            return Err(AppError::Transient("in-memory bus unavailable".to_string()));
        }

        let id = self.next_id.fetch_add(1, Ordering::SeqCst).to_string();
        self.with_topic(topic, |t| {
            t.published.push(payload.to_vec());
            t.queue.push_back(BusMessage {
                id,
                topic: topic.to_string(),
                payload: payload.to_vec(),
                redelivered: false,
            });
        });
        self.notify.notify_waiters();
        Ok(())
    }
}

#[async_trait]
impl EventSubscriber for InMemoryBus {
    async fn fetch(&self, topic: &str, max: usize) -> Result<Vec<BusMessage>> {
        let batch = self.take_ready(topic, max);
        if !batch.is_empty() {
            return Ok(batch);
        }

        // Wake on the next publish/release, or give up after `poll_wait`.
        let _ = tokio::time::timeout(self.poll_wait, self.notify.notified()).await;
        Ok(self.take_ready(topic, max))
    }

    async fn ack(&self, message: &BusMessage) -> Result<()> {
        self.with_topic(&message.topic, |t| {
            if t.in_flight.remove(&message.id).is_some() {
                t.acked.push(message.id.clone());
            }
        });
        Ok(())
    }

    async fn release(&self, message: &BusMessage) -> Result<()> {
        self.with_topic(&message.topic, |t| {
            if let Some(mut returned) = t.in_flight.remove(&message.id) {
                returned.redelivered = true;
                t.queue.push_front(returned);
            }
        });
        self.notify.notify_waiters();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_publish_then_fetch() {
        let bus = InMemoryBus::new();
        bus.publish("order.created", b"one").await.unwrap();
        bus.publish("order.created", b"two").await.unwrap();

        let batch = bus.fetch("order.created", 10).await.unwrap();
        assert_eq!(batch.len(), 2);
        assert_eq!(batch[0].payload, b"one");
        assert_eq!(batch[1].payload, b"two");
        assert!(!batch[0].redelivered);
    }

    #[tokio::test]
    async fn test_topics_are_independent() {
        let bus = InMemoryBus::new();
        bus.publish("a", b"x").await.unwrap();

        assert!(bus.fetch("b", 10).await.unwrap().is_empty());
        assert_eq!(bus.fetch("a", 10).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_ack_removes_in_flight() {
        let bus = InMemoryBus::new();
        bus.publish("t", b"x").await.unwrap();

        let batch = bus.fetch("t", 1).await.unwrap();
        assert_eq!(bus.outstanding("t"), 1);

        bus.ack(&batch[0]).await.unwrap();
        assert_eq!(bus.outstanding("t"), 0);
        assert_eq!(bus.acked("t"), vec![batch[0].id.clone()]);
    }

    #[tokio::test]
    async fn test_release_redelivers() {
        let bus = InMemoryBus::new();
        bus.publish("t", b"x").await.unwrap();

        let first = bus.fetch("t", 1).await.unwrap();
        bus.release(&first[0]).await.unwrap();

        let second = bus.fetch("t", 1).await.unwrap();
        assert_eq!(second[0].id, first[0].id);
        assert!(second[0].redelivered);
    }

    #[tokio::test]
    async fn test_publish_failure_injection() {
        let bus = InMemoryBus::new();
        bus.set_publish_failure(true);

        let err = bus.publish("t", b"x").await.unwrap_err();
        assert!(err.is_transient());
        assert!(bus.published("t").is_empty());

        bus.set_publish_failure(false);
        bus.publish("t", b"x").await.unwrap();
        assert_eq!(bus.published("t").len(), 1);
    }

    #[tokio::test]
    async fn test_fetch_times_out_when_empty() {
        let bus = InMemoryBus::new();
        let batch = bus.fetch("t", 10).await.unwrap();
        assert!(batch.is_empty());
    }
}
