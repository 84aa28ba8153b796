//! Row structs that map 1-to-1 onto database tables.
//!
//! These are *persistence* models — they carry no business logic.
//! Domain types (the in-memory workflow graph, breaker state machine,
//! monitor events) live in their own crates and convert to/from these rows
//! at the boundary.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// workflows (read-only from the core's perspective)
// ---------------------------------------------------------------------------

/// A persisted workflow definition row.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct WorkflowRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    /// Full JSON workflow definition (nodes, edges, trigger, …)
    pub definition: serde_json::Value,
    pub is_public: bool,
    pub version: i32,
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// executions
// ---------------------------------------------------------------------------

/// Lifecycle states of an `Execution`, per spec §3.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Paused,
}

impl ExecutionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Paused => "paused",
        }
    }
}

impl std::fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ExecutionStatus {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "running" => Ok(Self::Running),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            "paused" => Ok(Self::Paused),
            other => Err(format!("unknown execution status: {other}")),
        }
    }
}

/// A persisted `Execution` row.
///
/// `locked_by` is non-null iff `status = running`, set with a
/// compare-and-swap so exactly one worker owns the execution (spec §3
/// invariant, §5 claim protocol).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ExecutionRow {
    pub id: Uuid,
    pub workflow_id: Uuid,
    pub user_id: Uuid,
    pub status: String,
    pub input: serde_json::Value,
    pub output: Option<serde_json::Value>,
    pub error: Option<String>,
    pub locked_by: Option<String>,
    pub trigger_type: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// block_executions (one per node per execution)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockExecutionStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl BlockExecutionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

impl std::fmt::Display for BlockExecutionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A persisted `BlockExecution` row — one per node per execution.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct BlockExecutionRow {
    pub id: Uuid,
    pub execution_id: Uuid,
    pub node_id: String,
    pub block_type: String,
    pub status: String,
    pub input: serde_json::Value,
    pub output: Option<serde_json::Value>,
    pub error: Option<String>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
}

// ---------------------------------------------------------------------------
// execution_logs / node_logs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

/// An append-only log entry keyed by execution (and optionally node).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ExecutionLogRow {
    pub id: Uuid,
    pub execution_id: Uuid,
    pub node_id: Option<String>,
    pub level: String,
    pub message: String,
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// circuit_breaker_state
// ---------------------------------------------------------------------------

/// A persisted circuit breaker row, unique by `circuit_id` (spec §3, §4.3).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CircuitBreakerRow {
    pub circuit_id: String,
    pub state: String,
    pub failure_count: i32,
    pub success_count: i32,
    pub last_failure_time: Option<DateTime<Utc>>,
    pub last_success_time: Option<DateTime<Utc>>,
    pub last_half_open_time: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// profiles (read/increment only)
// ---------------------------------------------------------------------------

/// A user profile row, used for the monthly execution quota check (§4.6).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ProfileRow {
    pub user_id: Uuid,
    pub monthly_execution_count: i32,
    pub monthly_execution_quota: i32,
}
