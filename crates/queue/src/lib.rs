//! `queue` crate — the durable work queue between the API/scheduler and
//! the execution engine: broker protocol, error classification, and the
//! `QueueConsumer` loop that drives `WorkflowExecutor` with at-least-once
//! delivery semantics (spec §4.6, §6).

pub mod broker;
pub mod cache;
pub mod classify;
pub mod config;
pub mod consumer;
pub mod error;
pub mod message;

pub use broker::{Broker, Delivery, InMemoryBroker, QueueName};
pub use classify::{classify_error, Classification, ErrorKind};
pub use config::ConsumerConfig;
pub use consumer::QueueConsumer;
pub use error::QueueError;
pub use message::QueueMessage;
