use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde_json::Value;
use uuid::Uuid;

use db::repository::executions as exec_repo;
use queue::{QueueMessage, QueueName};

use super::AppState;

#[derive(serde::Deserialize)]
pub struct ExecuteWorkflowDto {
    pub user_id: Uuid,
    #[serde(default)]
    pub input: Value,
}

pub async fn execute(
    Path(workflow_id): Path<Uuid>,
    State(state): State<AppState>,
    Json(payload): Json<ExecuteWorkflowDto>,
) -> Result<(StatusCode, Json<db::models::ExecutionRow>), StatusCode> {
    let execution = match exec_repo::create_execution(&state.pool, workflow_id, payload.user_id, payload.input.clone(), Some("manual")).await {
        Ok(execution) => execution,
        Err(_) => return Err(StatusCode::INTERNAL_SERVER_ERROR),
    };

    let message = QueueMessage::new(execution.id, workflow_id, payload.user_id, payload.input);
    if state.broker.publish(QueueName::Main, message, None).await.is_err() {
        return Err(StatusCode::INTERNAL_SERVER_ERROR);
    }

    Ok((StatusCode::ACCEPTED, Json(execution)))
}
