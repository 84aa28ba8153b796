//! `circuit_breaker_state` repository.
//!
//! Every state-affecting call from `breaker::MultiLevelBreaker` is a single
//! transactional read-modify-write keyed by the unique `circuit_id` (spec
//! §4.3 "every state-affecting call is a single upsert"). We use
//! `SELECT … FOR UPDATE` inside a transaction rather than an optimistic
//! version column — it gives the same single-row serialization with less
//! call-site bookkeeping, and matches the `SELECT … FOR UPDATE SKIP LOCKED`
//! idiom already used for job polling elsewhere in this schema.

use chrono::Utc;
use sqlx::{PgPool, Postgres, Transaction};

use crate::{models::CircuitBreakerRow, DbError};

/// Read-only snapshot fetch, used for admission checks via the in-memory
/// cache refresh path (spec §4.3 "short TTL cache").
pub async fn get(pool: &PgPool, circuit_id: &str) -> Result<Option<CircuitBreakerRow>, DbError> {
    let row = sqlx::query_as!(
        CircuitBreakerRow,
        r#"SELECT circuit_id, state, failure_count, success_count,
                  last_failure_time, last_success_time, last_half_open_time,
                  created_at, updated_at
           FROM circuit_breaker_state WHERE circuit_id = $1"#,
        circuit_id,
    )
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

/// Begin a transaction and lock (or create, defaulted to `CLOSED`) the row
/// for `circuit_id`. The caller computes the next state from the returned
/// row and must call [`save`] before committing.
pub async fn lock_or_init<'a>(
    tx: &mut Transaction<'a, Postgres>,
    circuit_id: &str,
) -> Result<CircuitBreakerRow, DbError> {
    if let Some(row) = sqlx::query_as!(
        CircuitBreakerRow,
        r#"SELECT circuit_id, state, failure_count, success_count,
                  last_failure_time, last_success_time, last_half_open_time,
                  created_at, updated_at
           FROM circuit_breaker_state WHERE circuit_id = $1 FOR UPDATE"#,
        circuit_id,
    )
    .fetch_optional(&mut **tx)
    .await?
    {
        return Ok(row);
    }

    let now = Utc::now();
    let row = sqlx::query_as!(
        CircuitBreakerRow,
        r#"
        INSERT INTO circuit_breaker_state
            (circuit_id, state, failure_count, success_count,
             last_failure_time, last_success_time, last_half_open_time,
             created_at, updated_at)
        VALUES ($1, 'closed', 0, 0, NULL, NULL, NULL, $2, $2)
        RETURNING circuit_id, state, failure_count, success_count,
                  last_failure_time, last_success_time, last_half_open_time,
                  created_at, updated_at
        "#,
        circuit_id,
        now,
    )
    .fetch_one(&mut **tx)
    .await?;

    Ok(row)
}

/// Persist the computed next state within the open transaction.
pub async fn save<'a>(tx: &mut Transaction<'a, Postgres>, row: &CircuitBreakerRow) -> Result<(), DbError> {
    sqlx::query!(
        r#"
        UPDATE circuit_breaker_state
        SET state = $1, failure_count = $2, success_count = $3,
            last_failure_time = $4, last_success_time = $5, last_half_open_time = $6,
            updated_at = $7
        WHERE circuit_id = $8
        "#,
        row.state,
        row.failure_count,
        row.success_count,
        row.last_failure_time,
        row.last_success_time,
        row.last_half_open_time,
        Utc::now(),
        row.circuit_id,
    )
    .execute(&mut **tx)
    .await?;
    Ok(())
}
