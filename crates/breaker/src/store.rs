//! `BreakerStore` — the persistence boundary for circuit breaker state
//! (spec §4.3, Design Note "Global breaker state … → make explicit
//! dependencies"). `PgBreakerStore` is the default; `InMemoryBreakerStore`
//! is the test double, mirroring `nodes::mock::MockNode`.

use async_trait::async_trait;
use chrono::Utc;
use db::DbPool;
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Mutex;
use tracing::instrument;

use crate::config::BreakerConfig;
use crate::error::BreakerError;
use crate::state::{apply_timeout, is_admitting, record_failure, record_success, BreakerState, CircuitState};

/// Persists and queries circuit breaker state keyed by `circuit_id`
/// (spec C3). Every state-affecting call is a single atomic
/// read-modify-write.
#[async_trait]
pub trait BreakerStore: Send + Sync {
    /// Apply the OPEN→HALF_OPEN timeout if due, then report whether the
    /// circuit currently admits an operation.
    async fn admit(&self, circuit_id: &str) -> Result<bool, BreakerError>;

    /// Record a success against the circuit.
    async fn record_success(&self, circuit_id: &str) -> Result<(), BreakerError>;

    /// Record a failure against the circuit.
    async fn record_failure(&self, circuit_id: &str) -> Result<(), BreakerError>;

    /// Fetch a read-only snapshot, `None` if the circuit has never recorded
    /// an outcome.
    async fn get_state(&self, circuit_id: &str) -> Result<Option<BreakerState>, BreakerError>;
}

fn row_to_state(row: &db::models::CircuitBreakerRow) -> Result<BreakerState, BreakerError> {
    Ok(BreakerState {
        circuit_id: row.circuit_id.clone(),
        state: CircuitState::from_str(&row.state).map_err(BreakerError::InvalidState)?,
        failure_count: row.failure_count.max(0) as u32,
        success_count: row.success_count.max(0) as u32,
        last_failure_time: row.last_failure_time,
        last_success_time: row.last_success_time,
        last_half_open_time: row.last_half_open_time,
    })
}

fn state_to_row(state: &BreakerState, created_at: chrono::DateTime<Utc>) -> db::models::CircuitBreakerRow {
    db::models::CircuitBreakerRow {
        circuit_id: state.circuit_id.clone(),
        state: state.state.as_str().to_string(),
        failure_count: state.failure_count as i32,
        success_count: state.success_count as i32,
        last_failure_time: state.last_failure_time,
        last_success_time: state.last_success_time,
        last_half_open_time: state.last_half_open_time,
        created_at,
        updated_at: Utc::now(),
    }
}

/// Postgres-backed `BreakerStore`.
pub struct PgBreakerStore {
    pool: DbPool,
    config: BreakerConfig,
}

impl PgBreakerStore {
    pub fn new(pool: DbPool, config: BreakerConfig) -> Self {
        Self { pool, config }
    }

    async fn with_locked_state<F>(&self, circuit_id: &str, f: F) -> Result<BreakerState, BreakerError>
    where
        F: FnOnce(&mut BreakerState, &BreakerConfig, chrono::DateTime<Utc>) + Send,
    {
        let mut tx = self.pool.begin().await.map_err(db::DbError::from)?;
        let row = db::repository::circuit_breaker::lock_or_init(&mut tx, circuit_id).await?;
        let mut state = row_to_state(&row)?;
        let now = Utc::now();
        f(&mut state, &self.config, now);
        let new_row = state_to_row(&state, row.created_at);
        db::repository::circuit_breaker::save(&mut tx, &new_row).await?;
        tx.commit().await.map_err(db::DbError::from)?;
        Ok(state)
    }
}

#[async_trait]
impl BreakerStore for PgBreakerStore {
    #[instrument(skip(self))]
    async fn admit(&self, circuit_id: &str) -> Result<bool, BreakerError> {
        let state = self
            .with_locked_state(circuit_id, |state, config, now| apply_timeout(state, config, now))
            .await?;
        Ok(is_admitting(&state))
    }

    #[instrument(skip(self))]
    async fn record_success(&self, circuit_id: &str) -> Result<(), BreakerError> {
        self.with_locked_state(circuit_id, |state, config, now| record_success(state, config, now))
            .await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn record_failure(&self, circuit_id: &str) -> Result<(), BreakerError> {
        self.with_locked_state(circuit_id, |state, config, now| record_failure(state, config, now))
            .await?;
        Ok(())
    }

    async fn get_state(&self, circuit_id: &str) -> Result<Option<BreakerState>, BreakerError> {
        let row = db::repository::circuit_breaker::get(&self.pool, circuit_id).await?;
        row.as_ref().map(row_to_state).transpose()
    }
}

/// In-memory `BreakerStore` — used by unit tests and as the cache layer
/// described in spec §4.3 ("in-memory cache with a short TTL").
pub struct InMemoryBreakerStore {
    config: BreakerConfig,
    states: Mutex<HashMap<String, BreakerState>>,
}

impl InMemoryBreakerStore {
    pub fn new(config: BreakerConfig) -> Self {
        Self { config, states: Mutex::new(HashMap::new()) }
    }
}

impl Default for InMemoryBreakerStore {
    fn default() -> Self {
        Self::new(BreakerConfig::default())
    }
}

#[async_trait]
impl BreakerStore for InMemoryBreakerStore {
    async fn admit(&self, circuit_id: &str) -> Result<bool, BreakerError> {
        let mut states = self.states.lock().unwrap();
        let state = states
            .entry(circuit_id.to_string())
            .or_insert_with(|| BreakerState::new(circuit_id));
        apply_timeout(state, &self.config, Utc::now());
        Ok(is_admitting(state))
    }

    async fn record_success(&self, circuit_id: &str) -> Result<(), BreakerError> {
        let mut states = self.states.lock().unwrap();
        let state = states
            .entry(circuit_id.to_string())
            .or_insert_with(|| BreakerState::new(circuit_id));
        record_success(state, &self.config, Utc::now());
        Ok(())
    }

    async fn record_failure(&self, circuit_id: &str) -> Result<(), BreakerError> {
        let mut states = self.states.lock().unwrap();
        let state = states
            .entry(circuit_id.to_string())
            .or_insert_with(|| BreakerState::new(circuit_id));
        record_failure(state, &self.config, Utc::now());
        Ok(())
    }

    async fn get_state(&self, circuit_id: &str) -> Result<Option<BreakerState>, BreakerError> {
        Ok(self.states.lock().unwrap().get(circuit_id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn in_memory_store_opens_after_threshold() {
        let store = InMemoryBreakerStore::new(BreakerConfig { failure_threshold: 1, ..Default::default() });
        assert!(store.admit("node-type:email").await.unwrap());
        store.record_failure("node-type:email").await.unwrap();
        assert!(!store.admit("node-type:email").await.unwrap());
    }
}
