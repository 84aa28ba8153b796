//! `QueueConsumer` (C8) — per-message protocol of spec §4.6: claim, cache,
//! quota-gate, execute, classify-and-route. Generalized from a single
//! Postgres SKIP-LOCKED poll loop into a `Broker`-trait consumer over
//! three logical queues, with a workflow/profile cache and quota gate a
//! bare polling loop never needed.

use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use tokio::sync::Mutex;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use db::models::{ExecutionStatus, WorkflowRow};
use db::DbPool;
use engine::WorkflowExecutor;

use crate::broker::{Broker, Delivery, QueueName};
use crate::cache::TtlCache;
use crate::classify::classify_error;
use crate::config::ConsumerConfig;
use crate::error::QueueError;
use crate::message::QueueMessage;

pub struct QueueConsumer {
    pool: DbPool,
    broker: Arc<dyn Broker>,
    executor: Arc<WorkflowExecutor>,
    config: ConsumerConfig,
    worker_id: String,
    workflow_cache: Mutex<TtlCache<Uuid, WorkflowRow>>,
    profile_cache: Mutex<TtlCache<Uuid, (i32, i32)>>,
}

impl QueueConsumer {
    pub fn new(pool: DbPool, broker: Arc<dyn Broker>, executor: Arc<WorkflowExecutor>, config: ConsumerConfig) -> Self {
        let worker_id = format!("worker-{}-{}", std::process::id(), rand::thread_rng().gen::<u32>());
        let workflow_cache = Mutex::new(TtlCache::new(config.cache_capacity, config.cache_ttl));
        let profile_cache = Mutex::new(TtlCache::new(config.cache_capacity, config.cache_ttl));
        Self { pool, broker, executor, config, worker_id, workflow_cache, profile_cache }
    }

    pub fn worker_id(&self) -> &str {
        &self.worker_id
    }

    /// Run forever: fetch up to `prefetch` deliveries, handle each in turn
    /// (spec §5: "sequential per execution"; concurrency across executions
    /// comes from running multiple `QueueConsumer`s, not from fanning out
    /// within one).
    pub async fn run(&self) -> ! {
        loop {
            match self.broker.consume(self.config.prefetch).await {
                Ok(deliveries) => {
                    let fetched_any = !deliveries.is_empty();
                    for delivery in deliveries {
                        self.handle_delivery(delivery).await;
                    }
                    if !fetched_any {
                        tokio::time::sleep(Duration::from_millis(200)).await;
                    }
                }
                Err(err) => {
                    error!(worker_id = %self.worker_id, "broker consume failed: {err}");
                    tokio::time::sleep(Duration::from_secs(1)).await;
                }
            }
        }
    }

    #[instrument(skip(self, delivery), fields(worker_id = %self.worker_id))]
    async fn handle_delivery(&self, delivery: Delivery) {
        let Delivery { tag, message } = delivery;

        match self.process(&message).await {
            Ok(Outcome::Ack) => {
                let _ = self.broker.ack(tag).await;
            }
            Ok(Outcome::Drop) => {
                let _ = self.broker.ack(tag).await;
            }
            Err(err) => {
                let classification = classify_error(&err.to_string());
                if classification.retryable && message.retry_count < self.config.max_retries {
                    let jitter = Duration::from_millis(rand::thread_rng().gen_range(0..250));
                    let delay = classification
                        .base_delay
                        .unwrap_or(Duration::from_secs(1))
                        .saturating_mul(2u32.saturating_pow(message.retry_count))
                        .saturating_add(jitter)
                        .min(self.config.retry_delay_cap);

                    let retried = message.with_retry_count(message.retry_count + 1);
                    if let Err(publish_err) = self.broker.publish(QueueName::Retry, retried, Some(delay)).await {
                        error!(worker_id = %self.worker_id, "failed to publish to retry queue: {publish_err}");
                    }
                    let _ = self.broker.ack(tag).await;
                } else {
                    warn!(worker_id = %self.worker_id, execution_id = %message.execution_id, kind = ?classification.kind, "dropping to dead-letter queue: {err}");
                    let _ = self.broker.nack(tag, false).await;
                }
            }
        }
    }

    /// One message's worth of spec §4.6 steps 4–9. Returns `Ok` for every
    /// outcome that should simply `ack`/drop, `Err` for anything that
    /// needs classification-based retry/DLQ routing.
    async fn process(&self, message: &QueueMessage) -> Result<Outcome, QueueError> {
        let execution = match db::repository::executions::get_execution(&self.pool, message.execution_id).await {
            Ok(execution) => execution,
            Err(db::DbError::NotFound) => return Ok(Outcome::Drop),
            Err(err) => return Err(err.into()),
        };

        let status: ExecutionStatus = execution.status.parse().map_err(|_| QueueError::Broker("unrecognized execution status".into()))?;
        if matches!(status, ExecutionStatus::Completed | ExecutionStatus::Failed) {
            return Ok(Outcome::Drop);
        }
        if matches!(status, ExecutionStatus::Paused) && !message.is_resume() {
            return Ok(Outcome::Drop);
        }

        let claimed = db::repository::executions::claim_execution(&self.pool, message.execution_id, &self.worker_id, self.config.lease_ttl_secs).await?;
        if !claimed {
            return Ok(Outcome::Drop);
        }

        let workflow_row = self.resolve_workflow(message.workflow_id).await?;
        if workflow_row.user_id != message.user_id {
            db::repository::executions::fail_execution(&self.pool, message.execution_id, "workflow ownership mismatch").await?;
            return Ok(Outcome::Ack);
        }

        let (count, quota) = self.resolve_profile(message.user_id).await?;
        if count >= quota {
            db::repository::executions::fail_execution(&self.pool, message.execution_id, "quota exceeded").await?;
            return Ok(Outcome::Ack);
        }
        db::repository::profiles::increment_execution_count(&self.pool, message.user_id).await?;

        let workflow = workflow_from_row(&workflow_row)?;
        info!(execution_id = %message.execution_id, workflow_id = %workflow.id, "dispatching execution to workflow executor");

        self.executor
            .execute_workflow(&workflow, message.execution_id, message.resume_from_node_id(), message.resume_data())
            .await?;

        Ok(Outcome::Ack)
    }

    async fn resolve_workflow(&self, workflow_id: Uuid) -> Result<WorkflowRow, QueueError> {
        if let Some(row) = self.workflow_cache.lock().await.get(&workflow_id) {
            return Ok(row);
        }
        let row = db::repository::workflows::get_workflow(&self.pool, workflow_id).await?;
        self.workflow_cache.lock().await.insert(workflow_id, row.clone());
        Ok(row)
    }

    async fn resolve_profile(&self, user_id: Uuid) -> Result<(i32, i32), QueueError> {
        if let Some(entry) = self.profile_cache.lock().await.get(&user_id) {
            return Ok(entry);
        }
        let profile = db::repository::profiles::get_profile(&self.pool, user_id).await?;
        let entry = (profile.monthly_execution_count, profile.monthly_execution_quota);
        self.profile_cache.lock().await.insert(user_id, entry);
        Ok(entry)
    }
}

enum Outcome {
    Ack,
    Drop,
}

/// `workflows.definition` stores the full serialized `engine::Workflow`;
/// the row-level `user_id`/`name`/`is_public`/`version`/`created_at`
/// columns are the indexed, authoritative copies, so they win over
/// whatever the JSON blob happens to carry.
fn workflow_from_row(row: &WorkflowRow) -> Result<engine::Workflow, QueueError> {
    let mut workflow: engine::Workflow =
        serde_json::from_value(row.definition.clone()).map_err(|err| QueueError::Broker(format!("malformed workflow definition: {err}")))?;
    workflow.id = row.id;
    workflow.user_id = row.user_id;
    workflow.name = row.name.clone();
    workflow.is_public = row.is_public;
    workflow.version = row.version;
    workflow.created_at = row.created_at;
    Ok(workflow)
}
