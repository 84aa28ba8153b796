//! `ExecutionLogger` (C7) — appends structured log entries to the durable
//! log and forwards the same event to the monitor channel.

use db::models::LogLevel;
use db::DbPool;
use serde_json::Value;
use uuid::Uuid;

use crate::events::MonitorEvent;
use crate::monitor::ExecutionMonitor;

#[derive(Clone)]
pub struct ExecutionLogger {
    pool: DbPool,
    monitor: ExecutionMonitor,
}

impl ExecutionLogger {
    pub fn new(pool: DbPool, monitor: ExecutionMonitor) -> Self {
        Self { pool, monitor }
    }

    pub async fn log(
        &self,
        execution_id: Uuid,
        node_id: Option<&str>,
        level: LogLevel,
        message: &str,
        metadata: Value,
    ) -> Result<(), db::DbError> {
        tracing::event!(
            tracing::Level::INFO,
            execution_id = %execution_id,
            node_id = node_id,
            %message,
            "execution_log"
        );

        db::repository::logs::append(&self.pool, execution_id, node_id, level.as_str(), message, metadata).await?;

        self.monitor.publish(MonitorEvent::ExecutionLog {
            execution_id,
            node_id: node_id.map(str::to_string),
            level: level.as_str().to_string(),
            message: message.to_string(),
        });

        Ok(())
    }

    pub async fn info(&self, execution_id: Uuid, node_id: Option<&str>, message: &str) -> Result<(), db::DbError> {
        self.log(execution_id, node_id, LogLevel::Info, message, Value::Null).await
    }

    pub async fn warn(&self, execution_id: Uuid, node_id: Option<&str>, message: &str) -> Result<(), db::DbError> {
        self.log(execution_id, node_id, LogLevel::Warn, message, Value::Null).await
    }

    pub async fn error(&self, execution_id: Uuid, node_id: Option<&str>, message: &str) -> Result<(), db::DbError> {
        self.log(execution_id, node_id, LogLevel::Error, message, Value::Null).await
    }
}
