use thiserror::Error;

#[derive(Debug, Error)]
pub enum BreakerError {
    #[error("database error: {0}")]
    Database(#[from] db::DbError),

    #[error("invalid persisted circuit state: {0}")]
    InvalidState(String),
}
