//! `executions` repository: creation, status transitions, and the
//! compare-and-swap claim protocol that gives a worker exclusive ownership
//! of an execution (spec §3 "Ownership", §5 "claim protocol").

use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{models::ExecutionRow, DbError};

/// Create a new `Execution` row in `pending` status.
pub async fn create_execution(
    pool: &PgPool,
    workflow_id: Uuid,
    user_id: Uuid,
    input: serde_json::Value,
    trigger_type: Option<&str>,
) -> Result<ExecutionRow, DbError> {
    let id = Uuid::new_v4();
    let now = Utc::now();

    let row = sqlx::query_as!(
        ExecutionRow,
        r#"
        INSERT INTO executions
            (id, workflow_id, user_id, status, input, output, error, locked_by,
             trigger_type, created_at, updated_at)
        VALUES ($1, $2, $3, 'pending', $4, NULL, NULL, NULL, $5, $6, $6)
        RETURNING id, workflow_id, user_id, status, input, output, error,
                  locked_by, trigger_type, created_at, updated_at
        "#,
        id,
        workflow_id,
        user_id,
        input,
        trigger_type,
        now,
    )
    .fetch_one(pool)
    .await?;

    Ok(row)
}

/// Fetch a single execution by its primary key.
pub async fn get_execution(pool: &PgPool, id: Uuid) -> Result<ExecutionRow, DbError> {
    sqlx::query_as!(
        ExecutionRow,
        r#"SELECT id, workflow_id, user_id, status, input, output, error,
                  locked_by, trigger_type, created_at, updated_at
           FROM executions WHERE id = $1"#,
        id,
    )
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)
}

/// Atomically claim an execution for `worker_id`.
///
/// Succeeds (sets `locked_by = worker_id`, `status = running`) only if the
/// row is currently unlocked, or its lease has expired
/// (`updated_at < now - lease_ttl`) — the crash-recovery reclaim path of
/// spec §5. Returns `Ok(true)` if the claim was won, `Ok(false)` on a
/// conflict (another worker holds a live lease) — this is never an error,
/// just a signal for the caller to `ack` and drop the message.
pub async fn claim_execution(
    pool: &PgPool,
    execution_id: Uuid,
    worker_id: &str,
    lease_ttl_secs: i64,
) -> Result<bool, DbError> {
    let now = Utc::now();
    let stale_before = now - chrono::Duration::seconds(lease_ttl_secs);

    let result = sqlx::query!(
        r#"
        UPDATE executions
        SET locked_by = $1, status = 'running', updated_at = $2
        WHERE id = $3
          AND (locked_by IS NULL OR updated_at < $4)
          AND status NOT IN ('completed', 'failed')
        "#,
        worker_id,
        now,
        execution_id,
        stale_before,
    )
    .execute(pool)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// Release a worker's claim without changing `status` — used when a
/// message is dropped after a claim conflict is detected downstream
/// (e.g. workflow ownership mismatch).
pub async fn release_claim(pool: &PgPool, execution_id: Uuid, worker_id: &str) -> Result<(), DbError> {
    sqlx::query!(
        r#"UPDATE executions SET locked_by = NULL, updated_at = $1
           WHERE id = $2 AND locked_by = $3"#,
        Utc::now(),
        execution_id,
        worker_id,
    )
    .execute(pool)
    .await?;
    Ok(())
}

/// Transition an execution to `completed` with its final output, releasing
/// the claim (terminal states imply `locked_by = NULL`, spec §3).
pub async fn complete_execution(
    pool: &PgPool,
    execution_id: Uuid,
    output: serde_json::Value,
) -> Result<(), DbError> {
    sqlx::query!(
        r#"
        UPDATE executions
        SET status = 'completed', output = $1, error = NULL, locked_by = NULL, updated_at = $2
        WHERE id = $3
        "#,
        output,
        Utc::now(),
        execution_id,
    )
    .execute(pool)
    .await?;
    Ok(())
}

/// Transition an execution to `failed` with an error message, releasing
/// the claim.
pub async fn fail_execution(pool: &PgPool, execution_id: Uuid, error: &str) -> Result<(), DbError> {
    sqlx::query!(
        r#"
        UPDATE executions
        SET status = 'failed', error = $1, locked_by = NULL, updated_at = $2
        WHERE id = $3
        "#,
        error,
        Utc::now(),
        execution_id,
    )
    .execute(pool)
    .await?;
    Ok(())
}

/// Transition an execution to `paused` so it can later be resumed with a
/// `resumeFromNodeId`/`resumeData` message.
pub async fn pause_execution(pool: &PgPool, execution_id: Uuid) -> Result<(), DbError> {
    sqlx::query!(
        r#"UPDATE executions SET status = 'paused', locked_by = NULL, updated_at = $1 WHERE id = $2"#,
        Utc::now(),
        execution_id,
    )
    .execute(pool)
    .await?;
    Ok(())
}
