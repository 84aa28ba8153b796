//! `execution_logs` repository — append-only event stream (spec §3).

use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{models::ExecutionLogRow, DbError};

/// Append a log entry. `node_id` is `None` for workflow-level events.
pub async fn append(
    pool: &PgPool,
    execution_id: Uuid,
    node_id: Option<&str>,
    level: &str,
    message: &str,
    metadata: serde_json::Value,
) -> Result<ExecutionLogRow, DbError> {
    let id = Uuid::new_v4();
    let now = Utc::now();

    let row = sqlx::query_as!(
        ExecutionLogRow,
        r#"
        INSERT INTO execution_logs (id, execution_id, node_id, level, message, metadata, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING id, execution_id, node_id, level, message, metadata, created_at
        "#,
        id,
        execution_id,
        node_id,
        level,
        message,
        metadata,
        now,
    )
    .fetch_one(pool)
    .await?;

    Ok(row)
}

/// Fetch the full log history for an execution, oldest first — used by
/// subscribers that missed live monitor events (spec §4.7).
pub async fn list_for_execution(
    pool: &PgPool,
    execution_id: Uuid,
) -> Result<Vec<ExecutionLogRow>, DbError> {
    let rows = sqlx::query_as!(
        ExecutionLogRow,
        r#"SELECT id, execution_id, node_id, level, message, metadata, created_at
           FROM execution_logs WHERE execution_id = $1 ORDER BY created_at ASC"#,
        execution_id,
    )
    .fetch_all(pool)
    .await?;
    Ok(rows)
}
