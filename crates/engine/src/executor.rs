//! `WorkflowExecutor` (C6) — orchestrates one execution of a DAG: builds
//! the dependency map, claims per-block records, iterates in topological
//! order, routes `relevantOutputs` to dependents, handles resume, cleans
//! up on failure, and emits monitor/logger events (spec §4.5).
//!
//! Generalized from "always run every node top to bottom, piping the
//! previous node's whole output into the next" to a resume-aware,
//! breaker-gated, multi-parent version: dependents now receive only
//! `relevantOutputs` from their direct parents (the dependency map from
//! `dag::topological_sort`), not a single linear pipeline.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;
use tracing::{info, instrument};
use uuid::Uuid;

use breaker::{BreakerContext, MultiLevelBreaker};
use db::DbPool;
use monitor::{EdgeFlowStatus, ExecutionLogger, ExecutionMonitor, MonitorEvent};
use nodes::traits::{NodeLogLevel, NodeLogger};
use nodes::NodeRegistry;

use crate::config::ExecutorConfig;
use crate::models::{ExecutionStatus, Workflow, WorkflowExecutionResult};
use crate::node_executor::NodeExecutor;
use crate::validate::{GraphValidator, GraphValidatorConfig};
use crate::{dag, EngineError};

pub struct WorkflowExecutor {
    pool: DbPool,
    registry: Arc<NodeRegistry>,
    breaker: Arc<MultiLevelBreaker>,
    node_executor: NodeExecutor,
    logger: ExecutionLogger,
    monitor: ExecutionMonitor,
    validator_config: GraphValidatorConfig,
}

impl WorkflowExecutor {
    pub fn new(
        pool: DbPool,
        registry: Arc<NodeRegistry>,
        breaker: Arc<MultiLevelBreaker>,
        logger: ExecutionLogger,
        monitor: ExecutionMonitor,
        config: ExecutorConfig,
    ) -> Self {
        let node_executor = NodeExecutor::new(Arc::clone(&registry), Arc::clone(&breaker), config.clone());
        let validator_config = GraphValidatorConfig { terminal_allowed_categories: config.terminal_allowed_categories.clone() };
        Self { pool, registry, breaker, node_executor, logger, monitor, validator_config }
    }

    /// Public contract: `executeWorkflow(nodes, edges, executionId, userId,
    /// resumeFromNodeId?, resumeData?) → {status, outputs, error?}`
    /// (spec §4.5). Never swallows a failure: every error variant is
    /// preceded by persisting the corresponding state transition, matching
    /// the propagation policy of spec §7.
    #[instrument(skip(self, resume_data), fields(workflow_id = %workflow.id, execution_id = %execution_id))]
    pub async fn execute_workflow(
        &self,
        workflow: &Workflow,
        execution_id: Uuid,
        resume_from_node_id: Option<String>,
        resume_data: HashMap<String, Value>,
    ) -> Result<WorkflowExecutionResult, EngineError> {
        let user_id = workflow.user_id;
        let workflow_data = serde_json::json!({ "workflow_id": workflow.id, "workflow_name": workflow.name });

        self.monitor.publish(MonitorEvent::ExecutionStarted { execution_id, workflow_id: workflow.id, total_nodes: workflow.nodes.len() });
        let _ = self.logger.info(execution_id, None, "execution_started").await;

        // Step 2: validate + topologically sort.
        let validator = GraphValidator::new(&self.registry, self.validator_config.clone());
        let warnings = match validator.validate(workflow, user_id) {
            Ok(warnings) => warnings,
            Err(err) => return self.fail(execution_id, err).await,
        };
        for warning in &warnings {
            let _ = self.logger.warn(execution_id, Some(&warning.from), &warning.message).await;
        }

        let schedule = match dag::topological_sort(&workflow.nodes, &workflow.edges) {
            Ok(schedule) => schedule,
            Err(err) => return self.fail(execution_id, err).await,
        };

        // Step 3: consult the breaker at {workflow, user, global}.
        let workflow_ctx = BreakerContext::workflow_level(user_id, workflow.id);
        let admission = self.breaker.should_allow_execution(&workflow_ctx).await?;
        if !admission.allowed {
            let circuit_id = admission.blocked_by.unwrap_or_default();
            return self.fail(execution_id, EngineError::CircuitOpenError { circuit_id }).await;
        }

        // Resume point must exist in the sorted order.
        if let Some(resume_id) = &resume_from_node_id {
            if !schedule.order.contains(resume_id) {
                return self.fail(execution_id, EngineError::ResumePointMissing(resume_id.clone())).await;
            }
        }

        // Step 4: precreate BlockExecution rows for every node.
        let node_by_id: HashMap<&str, _> = workflow.nodes.iter().map(|n| (n.id.as_str(), n)).collect();
        for node_id in &schedule.order {
            let node = node_by_id[node_id.as_str()];
            let block_type = node.resolve_type().unwrap_or("unknown");
            if let Some(output) = resume_data.get(node_id) {
                db::repository::block_executions::create_completed(&self.pool, execution_id, node_id, block_type, node.config.clone(), output.clone()).await?;
            } else {
                db::repository::block_executions::create_pending(&self.pool, execution_id, node_id, block_type, node.config.clone()).await?;
            }
        }

        // Step 5/6: run the schedule, routing `relevantOutputs` per edge.
        let mut outputs: HashMap<String, Value> = resume_data;
        let mut should_execute = resume_from_node_id.is_none();
        let total = schedule.order.len();

        for (index, node_id) in schedule.order.iter().enumerate() {
            if !should_execute {
                if Some(node_id) == resume_from_node_id.as_ref() {
                    should_execute = true;
                } else {
                    continue;
                }
            }

            let node = node_by_id[node_id.as_str()];
            let relevant_outputs: HashMap<String, Value> = schedule
                .dependencies
                .get(node_id)
                .into_iter()
                .flatten()
                .filter_map(|parent| outputs.get(parent).map(|v| (parent.clone(), v.clone())))
                .collect();

            for parent in schedule.dependencies.get(node_id).into_iter().flatten() {
                self.monitor.publish(MonitorEvent::EdgeFlowUpdate {
                    execution_id,
                    from_node_id: parent.clone(),
                    to_node_id: node_id.clone(),
                    status: EdgeFlowStatus::Flowing,
                });
            }

            db::repository::block_executions::mark_running(&self.pool, execution_id, node_id).await?;
            self.monitor.publish(MonitorEvent::NodeExecutionUpdate {
                execution_id,
                node_id: node_id.clone(),
                status: "running".to_string(),
                progress: progress_pct(index, total),
            });

            let node_logger: Arc<dyn NodeLogger> = Arc::new(ExecutionLoggerAdapter {
                logger: self.logger.clone(),
                execution_id,
                node_id: node_id.clone(),
            });

            let result = self
                .node_executor
                .execute(node, execution_id, workflow.id, user_id, relevant_outputs, workflow_data.clone(), node_logger)
                .await;

            match result {
                Ok(output) => {
                    db::repository::block_executions::mark_completed(&self.pool, execution_id, node_id, output.clone()).await?;
                    self.monitor.publish(MonitorEvent::NodeExecutionUpdate {
                        execution_id,
                        node_id: node_id.clone(),
                        status: "completed".to_string(),
                        progress: progress_pct(index + 1, total),
                    });
                    for parent in schedule.dependencies.get(node_id).into_iter().flatten() {
                        self.monitor.publish(MonitorEvent::EdgeFlowUpdate {
                            execution_id,
                            from_node_id: parent.clone(),
                            to_node_id: node_id.clone(),
                            status: EdgeFlowStatus::Completed,
                        });
                    }
                    outputs.insert(node_id.clone(), output);
                }
                Err(err) => {
                    self.breaker.record_failure(&workflow_ctx).await?;
                    return self.fail_with_cleanup(execution_id, err).await;
                }
            }
        }

        // Step 7: full success.
        self.breaker.record_success(&workflow_ctx).await?;
        let outputs_json = serde_json::to_value(&outputs).unwrap_or(Value::Null);
        db::repository::executions::complete_execution(&self.pool, execution_id, outputs_json.clone()).await?;
        self.monitor.publish(MonitorEvent::ExecutionCompleted { execution_id, outputs: outputs_json });
        let _ = self.logger.info(execution_id, None, "execution_completed").await;
        info!(execution_id = %execution_id, "workflow execution completed");

        Ok(WorkflowExecutionResult { execution_id, status: ExecutionStatus::Completed, outputs, error: None })
    }

    /// Failure before any node started running: no cleanup of
    /// `BlockExecution` rows is needed because none were precreated yet.
    async fn fail(&self, execution_id: Uuid, err: EngineError) -> Result<WorkflowExecutionResult, EngineError> {
        let message = err.to_string();
        db::repository::executions::fail_execution(&self.pool, execution_id, &message).await?;
        self.monitor.publish(MonitorEvent::ExecutionFailed { execution_id, error: message.clone() });
        let _ = self.logger.error(execution_id, None, &message).await;
        Err(err)
    }

    /// Failure after the node loop started: apply the cleanup invariant
    /// (spec §4.5 — no `BlockExecution` is left `running`) before
    /// transitioning the execution and the breaker.
    async fn fail_with_cleanup(&self, execution_id: Uuid, err: EngineError) -> Result<WorkflowExecutionResult, EngineError> {
        let message = err.to_string();
        db::repository::block_executions::fail_all_running(&self.pool, execution_id, &message).await?;
        self.fail(execution_id, err).await
    }
}

fn progress_pct(completed: usize, total: usize) -> u8 {
    if total == 0 {
        100
    } else {
        ((completed as f64 / total as f64) * 100.0).round() as u8
    }
}

/// Bridges the sync `nodes::NodeLogger` contract handlers use to the async
/// `monitor::ExecutionLogger` — logging is fire-and-forget from a node's
/// point of view (spec §6 "Handlers may consult ctx.logger").
struct ExecutionLoggerAdapter {
    logger: ExecutionLogger,
    execution_id: Uuid,
    node_id: String,
}

impl NodeLogger for ExecutionLoggerAdapter {
    fn log(&self, level: NodeLogLevel, message: &str) {
        let logger = self.logger.clone();
        let execution_id = self.execution_id;
        let node_id = self.node_id.clone();
        let message = message.to_string();
        let db_level = match level {
            NodeLogLevel::Debug => db::models::LogLevel::Debug,
            NodeLogLevel::Info => db::models::LogLevel::Info,
            NodeLogLevel::Warn => db::models::LogLevel::Warn,
            NodeLogLevel::Error => db::models::LogLevel::Error,
        };
        tokio::spawn(async move {
            let _ = logger.log(execution_id, Some(&node_id), db_level, &message, Value::Null).await;
        });
    }
}
