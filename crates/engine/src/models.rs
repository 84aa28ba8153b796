//! Core domain models for the workflow engine.
//!
//! These types are the source of truth for what a workflow looks like in
//! memory. They serialize to/from the JSONB `definition` column of the
//! `workflows` table (read-only from this crate's perspective, spec §3).

use chrono::{DateTime, Utc};
use nodes::schema::FieldSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Trigger
// ---------------------------------------------------------------------------

/// How a workflow is started.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Trigger {
    /// Triggered by an incoming HTTP request to `/webhook/{path}`.
    Webhook {
        /// URL path segment that identifies this workflow.
        path: String,
    },
    /// Triggered manually via the REST API.
    Manual,
    /// Triggered on a cron schedule — enqueued by a scheduler outside this
    /// crate's scope.
    Cron {
        /// Standard cron expression (5 fields).
        expression: String,
    },
}

// ---------------------------------------------------------------------------
// NodeDefinition
// ---------------------------------------------------------------------------

/// A single step in the workflow graph. `node_type` and `data` together
/// model the "dynamic block shapes" Design Note: the type may live in
/// either field depending on which editor/version produced the workflow,
/// resolved by [`nodes::blocktype::resolve_block_type`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeDefinition {
    /// Unique identifier within this workflow (referenced by edges).
    pub id: String,
    /// Primary type field; empty string defers to `data`.
    #[serde(default)]
    pub node_type: String,
    /// Freeform per-editor payload; may carry `type`, `blockType`, or
    /// `config.blockType` as a fallback type source.
    #[serde(default)]
    pub data: Value,
    /// Configuration passed to the handler at execution time.
    pub config: Value,
    /// Declared input shape, consulted by the edge type-compatibility
    /// check (spec §4.1 step 7) and the executor's lenient input
    /// validation (spec §4.4 step 2).
    #[serde(default)]
    pub input_schema: Option<FieldSchema>,
    /// Declared output shape, consulted the same way.
    #[serde(default)]
    pub output_schema: Option<FieldSchema>,
}

impl NodeDefinition {
    /// Resolve this node's effective block type under the precedence in
    /// spec §4.1 step 1 / §4.4 step 1.
    pub fn resolve_type(&self) -> Option<&str> {
        nodes::blocktype::resolve_block_type(&self.node_type, &self.data)
    }
}

// ---------------------------------------------------------------------------
// Edge
// ---------------------------------------------------------------------------

/// Directed dependency from source node's output to target node's input.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Edge {
    pub from: String,
    pub to: String,
}

// ---------------------------------------------------------------------------
// Workflow
// ---------------------------------------------------------------------------

/// A complete workflow definition, read-only from this crate's side.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Workflow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub trigger: Trigger,
    pub nodes: Vec<NodeDefinition>,
    pub edges: Vec<Edge>,
    pub is_public: bool,
    pub version: i32,
    pub created_at: DateTime<Utc>,
}

impl Workflow {
    /// Convenience constructor for tests.
    pub fn new(name: impl Into<String>, trigger: Trigger, nodes: Vec<NodeDefinition>, edges: Vec<Edge>) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            name: name.into(),
            trigger,
            nodes,
            edges,
            is_public: false,
            version: 1,
            created_at: Utc::now(),
        }
    }
}

/// Lifecycle status of a full workflow execution (spec §3), re-exported
/// from `db::models` so engine callers don't need a direct `db` import for
/// the common case of matching on status.
pub type ExecutionStatus = db::models::ExecutionStatus;

/// The outcome of a completed `executeWorkflow` call (spec §4.5 contract:
/// `{status, outputs, error?}`).
#[derive(Debug, Clone, Serialize)]
pub struct WorkflowExecutionResult {
    pub execution_id: Uuid,
    pub status: ExecutionStatus,
    pub outputs: HashMap<String, Value>,
    pub error: Option<String>,
}
