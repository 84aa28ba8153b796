//! Typed error taxonomy for the queue crate (spec §7): the outcomes
//! `ErrorClassifier` routes on, plus the mechanical broker/db failures.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum QueueError {
    /// `monthlyExecutionCount >= monthlyExecutionQuota` (spec §4.6 step 7).
    #[error("quota exceeded")]
    QuotaExceeded,

    /// `workflow.userId != message.userId` — a claimed execution pointing
    /// at a workflow it doesn't own.
    #[error("workflow ownership mismatch")]
    OwnershipMismatch,

    /// The in-process worker hasn't finished initializing; spec §4.6 step 2
    /// says to nack-with-requeue rather than process the envelope.
    #[error("worker not yet initialized")]
    NotInitialized,

    /// `engine::EngineError` surfaced from `WorkflowExecutor`.
    #[error("workflow execution error: {0}")]
    Engine(#[from] engine::EngineError),

    #[error("database error: {0}")]
    Database(#[from] db::DbError),

    #[error("breaker error: {0}")]
    Breaker(#[from] breaker::BreakerError),

    #[error("broker error: {0}")]
    Broker(String),
}
