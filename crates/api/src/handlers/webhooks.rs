use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde_json::Value;

use db::repository::{executions as exec_repo, workflows as wf_repo};
use engine::Trigger;
use queue::{QueueMessage, QueueName};

use super::AppState;

/// Find the workflow whose trigger is `Webhook { path }`, start a run for
/// it, and hand the run off to the broker. We only need the `trigger`
/// field of each candidate's `definition`, so a full `engine::Workflow`
/// deserialization isn't required here and a malformed node/edge payload
/// elsewhere in the definition doesn't block webhook routing.
pub async fn handle_webhook(
    Path(path): Path<String>,
    State(state): State<AppState>,
    Json(payload): Json<Value>,
) -> Result<(StatusCode, Json<Value>), StatusCode> {
    let workflows = match wf_repo::list_workflows(&state.pool).await {
        Ok(workflows) => workflows,
        Err(_) => return Err(StatusCode::INTERNAL_SERVER_ERROR),
    };

    let matched = workflows.into_iter().find(|row| {
        row.definition
            .get("trigger")
            .and_then(|t| serde_json::from_value::<Trigger>(t.clone()).ok())
            .map(|trigger| matches!(trigger, Trigger::Webhook { path: ref trigger_path } if trigger_path == &path))
            .unwrap_or(false)
    });

    let wf_row = match matched {
        Some(row) => row,
        None => return Err(StatusCode::NOT_FOUND),
    };

    let execution = match exec_repo::create_execution(&state.pool, wf_row.id, wf_row.user_id, payload.clone(), Some("webhook")).await {
        Ok(execution) => execution,
        Err(_) => return Err(StatusCode::INTERNAL_SERVER_ERROR),
    };

    let message = QueueMessage::new(execution.id, wf_row.id, wf_row.user_id, payload);
    if state.broker.publish(QueueName::Main, message, None).await.is_err() {
        return Err(StatusCode::INTERNAL_SERVER_ERROR);
    }

    Ok((StatusCode::ACCEPTED, Json(serde_json::json!({"executionId": execution.id, "message": "webhook accepted"}))))
}
