//! Typed error type for the db crate.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("sqlx error: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("row not found")]
    NotFound,

    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A conditional update (claim/release, optimistic lock) matched zero
    /// rows — the expected prior value no longer held.
    #[error("conditional update matched no rows: {0}")]
    ConditionFailed(String),
}
