//! Engine-level error taxonomy (spec §7): validation errors, execution
//! errors, and the breaker/resume errors unique to `WorkflowExecutor`.

use thiserror::Error;

/// One fatal validation failure, collected into a batch by `GraphValidator`
/// (spec §4.1: "`ValidationError { nodeId, message }` collected into a
/// batch").
#[derive(Debug, Clone, Error)]
#[error("node '{node_id}': {message}")]
pub struct ValidationError {
    pub node_id: String,
    pub message: String,
}

/// Non-fatal edge type-compatibility warning (spec §4.1 step 7).
#[derive(Debug, Clone)]
pub struct TypeWarning {
    pub from: String,
    pub to: String,
    pub field: String,
    pub message: String,
}

#[derive(Debug, Error)]
pub enum EngineError {
    /// Batch of fatal `GraphValidator` failures (spec §4.1, §7
    /// `ValidationError`).
    #[error("workflow validation failed: {0:?}")]
    Validation(Vec<ValidationError>),

    /// DFS cycle detection raised during validation, naming the node where
    /// the back-edge was found (spec §4.1 step 4).
    #[error("cycle detected at node '{0}'")]
    CycleError(String),

    /// A graph of more than one node has a node with no incident edges
    /// (spec §4.1 step 5).
    #[error("orphan node '{0}' has no incident edges")]
    OrphanError(String),

    /// A terminal node's resolved type does not belong to the configured
    /// allow-list (spec §4.1 step 6).
    #[error("terminal node '{node_id}' has disallowed category '{category}'")]
    TerminalCategoryError { node_id: String, category: String },

    /// The topological sort emitted fewer nodes than the graph contains —
    /// the defensive check redundant with `CycleError` (spec §4.2).
    #[error("topological sort could not order all nodes — cycle or orphan present")]
    CycleOrOrphanError,

    /// A node's handler invocation exceeded `NODE_EXECUTION_TIMEOUT`
    /// (spec §4.4 step 4).
    #[error("node '{node_id}' timed out after {timeout_ms}ms")]
    HandlerTimeout { node_id: String, timeout_ms: u64 },

    /// A node's handler returned `NodeError::Fatal`, or `NodeError::Retryable`
    /// exhausted its retry budget (spec §4.4 step 6).
    #[error("node '{node_id}' failed: {message}")]
    HandlerError { node_id: String, message: String },

    /// A breaker denied admission; bypasses retries (spec §4.4 step 3,
    /// §4.5 step 3). The message text is matched verbatim by
    /// `queue::classify::classify_error`, so it must contain the literal
    /// substring "Circuit breaker is OPEN".
    #[error("Circuit breaker is OPEN for {circuit_id}")]
    CircuitOpenError { circuit_id: String },

    /// `resumeFromNodeId` did not match any node in the sorted order
    /// (spec §4.5 "Resume semantics").
    #[error("resume point '{0}' not found in workflow")]
    ResumePointMissing(String),

    /// Persistence error from the `db` crate.
    #[error("database error: {0}")]
    Database(#[from] db::DbError),

    /// Persistence error from the `breaker` crate.
    #[error("breaker error: {0}")]
    Breaker(#[from] breaker::BreakerError),
}

impl EngineError {
    /// Whether this failure is recoverable by `NodeExecutor`'s own retry
    /// loop — `CircuitOpenError` bypasses retries even though it occurs
    /// during node execution (spec §4.4 step 3).
    pub fn bypasses_node_retry(&self) -> bool {
        matches!(self, EngineError::CircuitOpenError { .. })
    }
}
