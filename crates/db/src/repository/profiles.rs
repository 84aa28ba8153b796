//! `profiles` repository — read + atomic increment for the monthly
//! execution quota check (spec §4.6 steps 7–8).

use sqlx::PgPool;
use uuid::Uuid;

use crate::{models::ProfileRow, DbError};

/// Fetch a user's profile (quota + current monthly usage).
pub async fn get_profile(pool: &PgPool, user_id: Uuid) -> Result<ProfileRow, DbError> {
    sqlx::query_as!(
        ProfileRow,
        r#"SELECT user_id, monthly_execution_count, monthly_execution_quota
           FROM profiles WHERE user_id = $1"#,
        user_id,
    )
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)
}

/// Atomically increment `monthly_execution_count` by one.
pub async fn increment_execution_count(pool: &PgPool, user_id: Uuid) -> Result<(), DbError> {
    sqlx::query!(
        r#"UPDATE profiles SET monthly_execution_count = monthly_execution_count + 1
           WHERE user_id = $1"#,
        user_id,
    )
    .execute(pool)
    .await?;
    Ok(())
}
