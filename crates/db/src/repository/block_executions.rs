//! `block_executions` repository — one row per node per execution,
//! precreated in `pending` up front (spec §4.5 step 4) and transitioned as
//! the `WorkflowExecutor` runs (`running` → `completed`/`failed`).

use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{models::BlockExecutionRow, DbError};

/// Precreate a `pending` row for a node before execution starts.
pub async fn create_pending(
    pool: &PgPool,
    execution_id: Uuid,
    node_id: &str,
    block_type: &str,
    input: serde_json::Value,
) -> Result<BlockExecutionRow, DbError> {
    let id = Uuid::new_v4();

    let row = sqlx::query_as!(
        BlockExecutionRow,
        r#"
        INSERT INTO block_executions
            (id, execution_id, node_id, block_type, status, input, output, error, start_time, end_time)
        VALUES ($1, $2, $3, $4, 'pending', $5, NULL, NULL, NULL, NULL)
        RETURNING id, execution_id, node_id, block_type, status, input, output, error, start_time, end_time
        "#,
        id,
        execution_id,
        node_id,
        block_type,
        input,
    )
    .fetch_one(pool)
    .await?;

    Ok(row)
}

/// Mark a block execution `completed` in a single precreate+complete step,
/// used by the resume path to seed rows for nodes upstream of the resume
/// point (spec §4.5 step 4: "or `completed` for the resume marker").
pub async fn create_completed(
    pool: &PgPool,
    execution_id: Uuid,
    node_id: &str,
    block_type: &str,
    input: serde_json::Value,
    output: serde_json::Value,
) -> Result<BlockExecutionRow, DbError> {
    let id = Uuid::new_v4();
    let now = Utc::now();

    let row = sqlx::query_as!(
        BlockExecutionRow,
        r#"
        INSERT INTO block_executions
            (id, execution_id, node_id, block_type, status, input, output, error, start_time, end_time)
        VALUES ($1, $2, $3, $4, 'completed', $5, $6, NULL, $7, $7)
        RETURNING id, execution_id, node_id, block_type, status, input, output, error, start_time, end_time
        "#,
        id,
        execution_id,
        node_id,
        block_type,
        input,
        output,
        now,
    )
    .fetch_one(pool)
    .await?;

    Ok(row)
}

/// Transition a block execution to `running`, stamping `start_time`.
pub async fn mark_running(pool: &PgPool, execution_id: Uuid, node_id: &str) -> Result<(), DbError> {
    sqlx::query!(
        r#"UPDATE block_executions SET status = 'running', start_time = $1
           WHERE execution_id = $2 AND node_id = $3"#,
        Utc::now(),
        execution_id,
        node_id,
    )
    .execute(pool)
    .await?;
    Ok(())
}

/// Transition a block execution to `completed`, stamping `end_time` and
/// storing its output.
pub async fn mark_completed(
    pool: &PgPool,
    execution_id: Uuid,
    node_id: &str,
    output: serde_json::Value,
) -> Result<(), DbError> {
    sqlx::query!(
        r#"UPDATE block_executions SET status = 'completed', output = $1, end_time = $2
           WHERE execution_id = $3 AND node_id = $4"#,
        output,
        Utc::now(),
        execution_id,
        node_id,
    )
    .execute(pool)
    .await?;
    Ok(())
}

/// Transition a block execution to `failed`, stamping `end_time` and
/// storing its error message.
pub async fn mark_failed(
    pool: &PgPool,
    execution_id: Uuid,
    node_id: &str,
    error: &str,
) -> Result<(), DbError> {
    sqlx::query!(
        r#"UPDATE block_executions SET status = 'failed', error = $1, end_time = $2
           WHERE execution_id = $3 AND node_id = $4"#,
        error,
        Utc::now(),
        execution_id,
        node_id,
    )
    .execute(pool)
    .await?;
    Ok(())
}

/// Mark every `BlockExecution` still in `running` as `failed` with the
/// propagated error — the cleanup invariant of spec §4.5 ("after
/// executeWorkflow returns, no BlockExecution is in pending or running").
pub async fn fail_all_running(
    pool: &PgPool,
    execution_id: Uuid,
    error: &str,
) -> Result<u64, DbError> {
    let result = sqlx::query!(
        r#"UPDATE block_executions SET status = 'failed', error = $1, end_time = $2
           WHERE execution_id = $3 AND status = 'running'"#,
        error,
        Utc::now(),
        execution_id,
    )
    .execute(pool)
    .await?;
    Ok(result.rows_affected())
}

/// Fetch every block execution for an execution, keyed for resume lookups.
pub async fn list_for_execution(
    pool: &PgPool,
    execution_id: Uuid,
) -> Result<Vec<BlockExecutionRow>, DbError> {
    let rows = sqlx::query_as!(
        BlockExecutionRow,
        r#"SELECT id, execution_id, node_id, block_type, status, input, output, error, start_time, end_time
           FROM block_executions WHERE execution_id = $1"#,
        execution_id,
    )
    .fetch_all(pool)
    .await?;
    Ok(rows)
}
