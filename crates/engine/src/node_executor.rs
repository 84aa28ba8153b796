//! `NodeExecutor` (C5) — runs one block: resolve type, consult the
//! breaker, invoke the handler under a timeout, validate input/output
//! leniently, retry with exponential backoff + jitter (spec §4.4).
//!
//! Pulled out of the orchestrator into its own type so retry/breaker/
//! timeout concerns stay independent of DAG orchestration.

use std::collections::HashMap;
use std::sync::Arc;

use rand::Rng;
use serde_json::Value;
use tracing::{instrument, warn};
use uuid::Uuid;

use breaker::{BreakerContext, MultiLevelBreaker};
use nodes::traits::{ExecutionContext, NodeLogLevel, NodeLogger};
use nodes::{categorize, prepare, schema, ExecutableNode, NodeError, NodeRegistry};

use crate::config::ExecutorConfig;
use crate::models::NodeDefinition;
use crate::EngineError;

pub struct NodeExecutor {
    registry: Arc<NodeRegistry>,
    breaker: Arc<MultiLevelBreaker>,
    config: ExecutorConfig,
}

impl NodeExecutor {
    pub fn new(registry: Arc<NodeRegistry>, breaker: Arc<MultiLevelBreaker>, config: ExecutorConfig) -> Self {
        Self { registry, breaker, config }
    }

    /// Run `node` to completion (success, exhausted retries, or a
    /// non-retryable failure), per the per-attempt algorithm of spec §4.4.
    #[instrument(skip(self, relevant_outputs, workflow_data, logger), fields(node_id = %node.id))]
    pub async fn execute(
        &self,
        node: &NodeDefinition,
        execution_id: Uuid,
        workflow_id: Uuid,
        user_id: Uuid,
        relevant_outputs: HashMap<String, Value>,
        workflow_data: Value,
        logger: Arc<dyn NodeLogger>,
    ) -> Result<Value, EngineError> {
        let block_type = node.resolve_type().ok_or_else(|| EngineError::HandlerError {
            node_id: node.id.clone(),
            message: "node type could not be resolved".to_string(),
        })?;

        let handler = self.registry.get(block_type).ok_or_else(|| EngineError::HandlerError {
            node_id: node.id.clone(),
            message: format!("no handler registered for type '{block_type}'"),
        })?;

        let breaker_ctx = BreakerContext::node_level(block_type, user_id, workflow_id);
        let raw_input = merge_relevant_outputs(&relevant_outputs);
        let shaped_input = prepare::prepare_block_data(block_type, raw_input);

        if let Some(input_schema) = &node.input_schema {
            let envelope = serde_json::json!({
                "data": shaped_input,
                "context": { "workflowId": workflow_id, "executionId": execution_id, "userId": user_id },
            });
            if let Err(warnings) = schema::validate_value(input_schema, &envelope, self.config.strict_schema_validation) {
                for message in &warnings {
                    logger.log(NodeLogLevel::Warn, &format!("input validation: {message}"));
                }
                if self.config.strict_schema_validation {
                    return Err(EngineError::HandlerError { node_id: node.id.clone(), message: warnings.join("; ") });
                }
            }
        }

        let mut attempt: u32 = 0;
        loop {
            attempt += 1;

            let admission = self.breaker.should_allow_execution(&breaker_ctx).await?;
            if !admission.allowed {
                let circuit_id = admission.blocked_by.unwrap_or_default();
                return Err(EngineError::CircuitOpenError { circuit_id });
            }

            let ctx = ExecutionContext {
                node_id: node.id.clone(),
                execution_id,
                workflow_id,
                user_id,
                inputs: shaped_input.clone(),
                config: node.config.clone(),
                previous_outputs: relevant_outputs.clone(),
                workflow_data: workflow_data.clone(),
                logger: Arc::clone(&logger),
            };

            let attempt_result = tokio::time::timeout(self.config.node_execution_timeout, handler.execute(shaped_input.clone(), &ctx)).await;

            match attempt_result {
                Err(_elapsed) => {
                    self.breaker.record_failure(&breaker_ctx).await?;
                    let timeout_ms = self.config.node_execution_timeout.as_millis() as u64;
                    if attempt < self.config.max_retries {
                        self.sleep_backoff(attempt).await;
                        continue;
                    }
                    return Err(EngineError::HandlerTimeout { node_id: node.id.clone(), timeout_ms });
                }
                Ok(Ok(output)) => {
                    self.breaker.record_success(&breaker_ctx).await?;
                    if let Some(output_schema) = &node.output_schema {
                        if let Err(warnings) = schema::validate_value(output_schema, &output, self.config.strict_schema_validation) {
                            for message in &warnings {
                                logger.log(NodeLogLevel::Warn, &format!("output validation: {message}"));
                            }
                            if self.config.strict_schema_validation {
                                return Err(EngineError::HandlerError { node_id: node.id.clone(), message: warnings.join("; ") });
                            }
                        }
                    }
                    return Ok(output);
                }
                Ok(Err(NodeError::Fatal(message))) => {
                    self.breaker.record_failure(&breaker_ctx).await?;
                    warn!(node_id = %node.id, category = ?categorize::categorize(&message), "node failed fatally: {message}");
                    return Err(EngineError::HandlerError { node_id: node.id.clone(), message });
                }
                Ok(Err(NodeError::Retryable(message))) => {
                    self.breaker.record_failure(&breaker_ctx).await?;
                    warn!(node_id = %node.id, attempt, category = ?categorize::categorize(&message), "node failed, retryable: {message}");
                    if attempt < self.config.max_retries {
                        self.sleep_backoff(attempt).await;
                        continue;
                    }
                    return Err(EngineError::HandlerError { node_id: node.id.clone(), message });
                }
            }
        }
    }

    /// `backoff = RETRY_BACKOFF_MS * attempt + random(0, RETRY_JITTER_MS)`
    /// (spec §4.4 step 6).
    async fn sleep_backoff(&self, attempt: u32) {
        let jitter = if self.config.retry_jitter_ms == 0 { 0 } else { rand::thread_rng().gen_range(0..self.config.retry_jitter_ms) };
        let delay_ms = self.config.retry_backoff_ms * attempt as u64 + jitter;
        tokio::time::sleep(std::time::Duration::from_millis(delay_ms)).await;
    }
}

/// Flatten direct-parent outputs into a single JSON object keyed by
/// parent node id — the `relevantOutputs` payload a node receives
/// (spec §4.2).
fn merge_relevant_outputs(relevant_outputs: &HashMap<String, Value>) -> Value {
    serde_json::to_value(relevant_outputs).unwrap_or(Value::Null)
}

#[cfg(test)]
mod tests {
    use super::*;
    use nodes::mock::MockNode;
    use nodes::traits::NullLogger;
    use serde_json::json;

    fn executor(registry: NodeRegistry, config: ExecutorConfig) -> NodeExecutor {
        let breaker_store = Arc::new(breaker::InMemoryBreakerStore::default());
        let breaker = Arc::new(MultiLevelBreaker::new(breaker_store));
        NodeExecutor::new(Arc::new(registry), breaker, config)
    }

    fn node(id: &str, node_type: &str) -> NodeDefinition {
        NodeDefinition {
            id: id.to_string(),
            node_type: node_type.to_string(),
            data: json!({}),
            config: json!({}),
            input_schema: None,
            output_schema: None,
        }
    }

    #[tokio::test]
    async fn b1_zero_retries_means_one_attempt_no_backoff() {
        let mut registry = NodeRegistry::new();
        registry.register("mock", Arc::new(MockNode::failing_retryable("mock", "boom")));
        let config = ExecutorConfig { max_retries: 0, ..ExecutorConfig::default() };
        let exec = executor(registry, config);

        let start = tokio::time::Instant::now();
        let result = exec
            .execute(&node("a", "mock"), Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4(), HashMap::new(), Value::Null, Arc::new(NullLogger))
            .await;
        assert!(result.is_err());
        assert!(start.elapsed() < std::time::Duration::from_millis(50));
    }

    #[tokio::test]
    async fn scenario_3_transient_failure_then_success() {
        let behaviours = Arc::new(std::sync::Mutex::new(vec![true, false]));
        struct FlakyNode(Arc<std::sync::Mutex<Vec<bool>>>);
        #[async_trait::async_trait]
        impl ExecutableNode for FlakyNode {
            async fn execute(&self, _input: Value, _ctx: &ExecutionContext) -> Result<Value, NodeError> {
                let should_fail = self.0.lock().unwrap().remove(0);
                if should_fail {
                    Err(NodeError::Retryable("fetch failed".to_string()))
                } else {
                    Ok(json!({ "ok": true }))
                }
            }
        }

        let mut registry = NodeRegistry::new();
        registry.register("mock", Arc::new(FlakyNode(behaviours)));
        let config = ExecutorConfig { max_retries: 3, retry_backoff_ms: 1, retry_jitter_ms: 0, ..ExecutorConfig::default() };
        let exec = executor(registry, config);

        let output = exec
            .execute(&node("b", "mock"), Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4(), HashMap::new(), Value::Null, Arc::new(NullLogger))
            .await
            .unwrap();
        assert_eq!(output, json!({ "ok": true }));
    }

    #[tokio::test]
    async fn scenario_4_circuit_open_bypasses_handler() {
        let mut registry = NodeRegistry::new();
        registry.register("mock", Arc::new(MockNode::failing_retryable("mock", "boom")));
        let config = ExecutorConfig { max_retries: 0, ..ExecutorConfig::default() };

        let breaker_store = Arc::new(breaker::InMemoryBreakerStore::new(breaker::BreakerConfig { failure_threshold: 1, ..Default::default() }));
        let breaker = Arc::new(MultiLevelBreaker::new(breaker_store));
        let exec = NodeExecutor::new(Arc::new(registry), breaker, config);

        let workflow_id = Uuid::new_v4();
        let user_id = Uuid::new_v4();
        let execution_id = Uuid::new_v4();

        // First call trips the breaker (one failure, threshold 1).
        let _ = exec.execute(&node("t", "mock"), execution_id, workflow_id, user_id, HashMap::new(), Value::Null, Arc::new(NullLogger)).await;

        // Second call is denied before the handler runs.
        let result = exec.execute(&node("t", "mock"), execution_id, workflow_id, user_id, HashMap::new(), Value::Null, Arc::new(NullLogger)).await;
        assert!(matches!(result, Err(EngineError::CircuitOpenError { .. })));
    }
}
