//! The `ExecutableNode` trait — the contract every node handler must fulfil
//! (spec §6 "Block handler contract").

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

use crate::NodeError;

/// Severity for messages a node logs through [`ExecutionContext::logger`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeLogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

/// Sink a node can use to emit structured log lines without depending on
/// the `monitor` or `db` crates directly — the engine wires a concrete
/// implementation in at execution time.
pub trait NodeLogger: Send + Sync {
    fn log(&self, level: NodeLogLevel, message: &str);
}

/// A logger that discards everything — used in tests and standalone node
/// invocations where no execution context is wired up.
pub struct NullLogger;

impl NodeLogger for NullLogger {
    fn log(&self, _level: NodeLogLevel, _message: &str) {}
}

/// Shared context passed to every node during execution (spec §4.4 step 4:
/// `ctx = {nodeId, executionId, workflowId, userId, inputs, config,
/// previousOutputs, logger, workflowData}`).
///
/// Defined here (in the leaf `nodes` crate) so both the engine and
/// individual node implementations can import it without a circular
/// dependency.
#[derive(Clone)]
pub struct ExecutionContext {
    pub node_id: String,
    pub execution_id: uuid::Uuid,
    pub workflow_id: uuid::Uuid,
    pub user_id: uuid::Uuid,
    /// This node's resolved input (after default shaping + dependency
    /// routing — spec §4.2 "relevantOutputs").
    pub inputs: Value,
    /// Node-specific `config` from its `NodeDefinition`.
    pub config: Value,
    /// Direct parents' outputs, keyed by parent node id.
    pub previous_outputs: HashMap<String, Value>,
    /// Arbitrary workflow-level metadata (trigger payload, workflow name…).
    pub workflow_data: Value,
    pub logger: Arc<dyn NodeLogger>,
}

impl std::fmt::Debug for ExecutionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionContext")
            .field("node_id", &self.node_id)
            .field("execution_id", &self.execution_id)
            .field("workflow_id", &self.workflow_id)
            .field("user_id", &self.user_id)
            .field("inputs", &self.inputs)
            .field("config", &self.config)
            .field("previous_outputs", &self.previous_outputs)
            .field("workflow_data", &self.workflow_data)
            .finish()
    }
}

/// The core node trait. All built-in nodes and sandboxed/custom-block
/// plug-ins must implement this. Handlers must not mutate `ctx` or the
/// node definition they were invoked with (spec §6).
#[async_trait]
pub trait ExecutableNode: Send + Sync {
    /// Execute the node, receiving its resolved input, and return this
    /// node's JSON output.
    async fn execute(&self, input: Value, ctx: &ExecutionContext) -> Result<Value, NodeError>;

    /// Optional config validation, run once by the `GraphValidator` before
    /// any node executes (spec §4.1 step 3). Default: no errors.
    fn validate_config(&self, _config: &Value, _user_id: uuid::Uuid) -> Vec<String> {
        Vec::new()
    }
}
