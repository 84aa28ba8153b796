//! The nine typed events the monitor channel carries (spec §4.7). Using an
//! enum rather than a callback interface keeps the publish side
//! (`ExecutionLogger`/`WorkflowExecutor`) decoupled from subscriber count:
//! a `tokio::sync::broadcast::Sender` fans a clone of each variant out.

use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MonitorEvent {
    ExecutionStarted {
        execution_id: Uuid,
        workflow_id: Uuid,
        total_nodes: usize,
    },
    NodeExecutionUpdate {
        execution_id: Uuid,
        node_id: String,
        status: String,
        /// `completed / total * 100`, rounded.
        progress: u8,
    },
    EdgeFlowUpdate {
        execution_id: Uuid,
        from_node_id: String,
        to_node_id: String,
        status: EdgeFlowStatus,
    },
    ExecutionCompleted {
        execution_id: Uuid,
        outputs: Value,
    },
    ExecutionFailed {
        execution_id: Uuid,
        error: String,
    },
    ExecutionPaused {
        execution_id: Uuid,
        resume_from_node_id: Option<String>,
    },
    ExecutionResumed {
        execution_id: Uuid,
        resume_from_node_id: String,
    },
    ExecutionLog {
        execution_id: Uuid,
        node_id: Option<String>,
        level: String,
        message: String,
    },
    ExecutionMetrics {
        execution_id: Uuid,
        completed_nodes: usize,
        total_nodes: usize,
        elapsed_ms: i64,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeFlowStatus {
    Flowing,
    Completed,
}

impl MonitorEvent {
    /// Terminal events start the 5-minute eviction countdown for an
    /// execution's snapshot (spec §4.7).
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            MonitorEvent::ExecutionCompleted { .. } | MonitorEvent::ExecutionFailed { .. }
        )
    }

    pub fn execution_id(&self) -> Uuid {
        match self {
            MonitorEvent::ExecutionStarted { execution_id, .. }
            | MonitorEvent::NodeExecutionUpdate { execution_id, .. }
            | MonitorEvent::EdgeFlowUpdate { execution_id, .. }
            | MonitorEvent::ExecutionCompleted { execution_id, .. }
            | MonitorEvent::ExecutionFailed { execution_id, .. }
            | MonitorEvent::ExecutionPaused { execution_id, .. }
            | MonitorEvent::ExecutionResumed { execution_id, .. }
            | MonitorEvent::ExecutionLog { execution_id, .. }
            | MonitorEvent::ExecutionMetrics { execution_id, .. } => *execution_id,
        }
    }
}
