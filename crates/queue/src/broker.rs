//! `Broker` (spec §6 "Broker protocol") — three logical queues (main,
//! retry, dead-letter), JSON envelopes, manual ack. `InMemoryBroker` is the
//! test double, adapted from a single Postgres SKIP-LOCKED polling idiom
//! into the three-queue contract, with the retry queue's delayed release
//! modeled as a ready-time check rather than a DB poll column.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use crate::message::QueueMessage;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueName {
    Main,
    Retry,
    DeadLetter,
}

/// One fetched message plus the handle needed to ack/nack it.
#[derive(Debug, Clone)]
pub struct Delivery {
    pub tag: u64,
    pub message: QueueMessage,
}

#[async_trait]
pub trait Broker: Send + Sync {
    /// Publish `message` onto `queue`; `delay` (meaningful only for
    /// `Retry`) defers visibility until `now + delay`.
    async fn publish(&self, queue: QueueName, message: QueueMessage, delay: Option<Duration>) -> Result<(), String>;

    /// Pull up to `prefetch` ready messages from the main queue, promoting
    /// any retry-queue entries whose delay has elapsed first.
    async fn consume(&self, prefetch: usize) -> Result<Vec<Delivery>, String>;

    /// Acknowledge successful handling; the message is gone for good.
    async fn ack(&self, tag: u64) -> Result<(), String>;

    /// Reject a message. `requeue = true` puts it back at the front of the
    /// main queue (spec §4.6 step 2's init-not-ready case); `requeue =
    /// false` routes it to the dead-letter queue per broker policy.
    async fn nack(&self, tag: u64, requeue: bool) -> Result<(), String>;
}

struct Pending {
    message: QueueMessage,
    queue: QueueName,
}

struct DelayedEntry {
    ready_at: DateTime<Utc>,
    message: QueueMessage,
}

#[derive(Default)]
struct Queues {
    main: VecDeque<QueueMessage>,
    retry: Vec<DelayedEntry>,
    dead_letter: VecDeque<QueueMessage>,
    pending: std::collections::HashMap<u64, Pending>,
}

/// In-process `Broker` for tests and single-node demos. Production
/// deployments point `QueueConsumer` at a real AMQP/SQS-backed
/// implementation of this trait instead.
pub struct InMemoryBroker {
    queues: Arc<Mutex<Queues>>,
    next_tag: AtomicU64,
}

impl InMemoryBroker {
    pub fn new() -> Self {
        Self { queues: Arc::new(Mutex::new(Queues::default())), next_tag: AtomicU64::new(1) }
    }

    pub async fn dead_letter_count(&self) -> usize {
        self.queues.lock().await.dead_letter.len()
    }

    pub async fn main_queue_len(&self) -> usize {
        self.queues.lock().await.main.len()
    }
}

impl Default for InMemoryBroker {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Broker for InMemoryBroker {
    async fn publish(&self, queue: QueueName, message: QueueMessage, delay: Option<Duration>) -> Result<(), String> {
        let mut queues = self.queues.lock().await;
        match queue {
            QueueName::Main => queues.main.push_back(message),
            QueueName::DeadLetter => queues.dead_letter.push_back(message),
            QueueName::Retry => {
                let ready_at = Utc::now() + chrono::Duration::from_std(delay.unwrap_or_default()).unwrap_or_default();
                queues.retry.push(DelayedEntry { ready_at, message });
            }
        }
        Ok(())
    }

    async fn consume(&self, prefetch: usize) -> Result<Vec<Delivery>, String> {
        let mut queues = self.queues.lock().await;

        let now = Utc::now();
        let (ready, still_waiting): (Vec<_>, Vec<_>) = queues.retry.drain(..).partition(|entry| entry.ready_at <= now);
        queues.retry = still_waiting;
        for entry in ready {
            queues.main.push_back(entry.message);
        }

        let mut out = Vec::with_capacity(prefetch);
        for _ in 0..prefetch {
            let Some(message) = queues.main.pop_front() else { break };
            let tag = self.next_tag.fetch_add(1, Ordering::SeqCst);
            queues.pending.insert(tag, Pending { message: message.clone(), queue: QueueName::Main });
            out.push(Delivery { tag, message });
        }
        Ok(out)
    }

    async fn ack(&self, tag: u64) -> Result<(), String> {
        self.queues.lock().await.pending.remove(&tag);
        Ok(())
    }

    async fn nack(&self, tag: u64, requeue: bool) -> Result<(), String> {
        let mut queues = self.queues.lock().await;
        let Some(pending) = queues.pending.remove(&tag) else { return Ok(()) };
        if requeue {
            queues.main.push_front(pending.message);
        } else {
            queues.dead_letter.push_back(pending.message);
        }
        let _ = pending.queue;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use uuid::Uuid;

    fn message() -> QueueMessage {
        QueueMessage::new(Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4(), json!({}))
    }

    #[tokio::test]
    async fn published_message_is_consumed_once() {
        let broker = InMemoryBroker::new();
        broker.publish(QueueName::Main, message(), None).await.unwrap();
        let deliveries = broker.consume(10).await.unwrap();
        assert_eq!(deliveries.len(), 1);
        assert_eq!(broker.consume(10).await.unwrap().len(), 0);
    }

    #[tokio::test]
    async fn nack_without_requeue_routes_to_dead_letter() {
        let broker = InMemoryBroker::new();
        broker.publish(QueueName::Main, message(), None).await.unwrap();
        let delivery = broker.consume(1).await.unwrap().remove(0);
        broker.nack(delivery.tag, false).await.unwrap();
        assert_eq!(broker.dead_letter_count().await, 1);
    }

    #[tokio::test]
    async fn retry_queue_withholds_until_delay_elapses() {
        let broker = InMemoryBroker::new();
        broker.publish(QueueName::Retry, message(), Some(Duration::from_secs(60))).await.unwrap();
        assert_eq!(broker.consume(10).await.unwrap().len(), 0);
    }
}
