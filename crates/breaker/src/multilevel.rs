//! `MultiLevelBreaker` (C4) — composes circuit breakers at
//! `{node-type, user, workflow, global}` and admits an operation iff all
//! relevant levels are `CLOSED` or `HALF_OPEN` (spec §4.3).

use std::sync::Arc;
use uuid::Uuid;

use crate::error::BreakerError;
use crate::store::BreakerStore;

/// Scope for one admission/outcome-recording call. `node_type` is `None`
/// for the workflow-level preflight check in spec §4.5 step 3 (which only
/// consults `{workflow, user, global}`); it is `Some` for the per-node
/// check in spec §4.4 step 3, which consults all four levels.
#[derive(Debug, Clone)]
pub struct BreakerContext {
    pub node_type: Option<String>,
    pub user_id: Uuid,
    pub workflow_id: Uuid,
}

impl BreakerContext {
    pub fn workflow_level(user_id: Uuid, workflow_id: Uuid) -> Self {
        Self { node_type: None, user_id, workflow_id }
    }

    pub fn node_level(node_type: impl Into<String>, user_id: Uuid, workflow_id: Uuid) -> Self {
        Self { node_type: Some(node_type.into()), user_id, workflow_id }
    }

    /// The ordered list of circuit ids this context touches. Order matters
    /// for `shouldAllowExecution`'s diagnostic: the *first* blocking level
    /// is reported.
    pub fn circuit_ids(&self) -> Vec<String> {
        let mut ids = Vec::with_capacity(4);
        if let Some(node_type) = &self.node_type {
            ids.push(format!("node-type:{node_type}"));
        }
        ids.push(format!("user:{}", self.user_id));
        ids.push(format!("workflow:{}", self.workflow_id));
        ids.push("global".to_string());
        ids
    }
}

/// Result of an admission check (spec §4.3:
/// `shouldAllowExecution(ctx) → {allowed, blockedBy?}`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdmissionResult {
    pub allowed: bool,
    pub blocked_by: Option<String>,
}

pub struct MultiLevelBreaker {
    store: Arc<dyn BreakerStore>,
}

impl MultiLevelBreaker {
    pub fn new(store: Arc<dyn BreakerStore>) -> Self {
        Self { store }
    }

    /// Admits the operation iff every level in `ctx` is `CLOSED` or
    /// `HALF_OPEN`. Returns the first blocking level for diagnostics.
    pub async fn should_allow_execution(&self, ctx: &BreakerContext) -> Result<AdmissionResult, BreakerError> {
        for circuit_id in ctx.circuit_ids() {
            if !self.store.admit(&circuit_id).await? {
                return Ok(AdmissionResult { allowed: false, blocked_by: Some(circuit_id) });
            }
        }
        Ok(AdmissionResult { allowed: true, blocked_by: None })
    }

    /// Record a success against every level in `ctx`.
    pub async fn record_success(&self, ctx: &BreakerContext) -> Result<(), BreakerError> {
        for circuit_id in ctx.circuit_ids() {
            self.store.record_success(&circuit_id).await?;
        }
        Ok(())
    }

    /// Record a failure against every level in `ctx`.
    pub async fn record_failure(&self, ctx: &BreakerContext) -> Result<(), BreakerError> {
        for circuit_id in ctx.circuit_ids() {
            self.store.record_failure(&circuit_id).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BreakerConfig;
    use crate::store::InMemoryBreakerStore;

    #[tokio::test]
    async fn scenario_4_circuit_opens_after_five_failures() {
        let store = Arc::new(InMemoryBreakerStore::new(BreakerConfig::default()));
        let breaker = MultiLevelBreaker::new(store);
        let ctx = BreakerContext::node_level("T", Uuid::new_v4(), Uuid::new_v4());

        for _ in 0..5 {
            breaker.record_failure(&ctx).await.unwrap();
        }

        let result = breaker.should_allow_execution(&ctx).await.unwrap();
        assert!(!result.allowed);
        assert_eq!(result.blocked_by.as_deref(), Some("node-type:T"));
    }

    #[tokio::test]
    async fn workflow_level_context_checks_three_circuits() {
        let store = Arc::new(InMemoryBreakerStore::new(BreakerConfig::default()));
        let breaker = MultiLevelBreaker::new(store);
        let ctx = BreakerContext::workflow_level(Uuid::new_v4(), Uuid::new_v4());
        assert_eq!(ctx.circuit_ids().len(), 3);
        let result = breaker.should_allow_execution(&ctx).await.unwrap();
        assert!(result.allowed);
    }
}
