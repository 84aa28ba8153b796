use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde_json::Value;
use uuid::Uuid;

use db::repository::workflows as wf_repo;
use engine::{Edge, NodeDefinition, Trigger};

use super::AppState;

/// Identifies the caller for ownership checks on otherwise-anonymous
/// `GET`/`DELETE` routes. `Workflow.isPublic` (spec §2) only widens read
/// access — deletion always requires ownership.
#[derive(serde::Deserialize, Default)]
pub struct CallerQuery {
    pub user_id: Option<Uuid>,
}

/// Request body for `POST /workflows`. The server assigns `id`/`version`/
/// `created_at`; the caller supplies everything else that makes up a
/// `Workflow` (spec §2).
#[derive(serde::Deserialize)]
pub struct CreateWorkflowDto {
    pub user_id: Uuid,
    pub name: String,
    pub trigger: Trigger,
    pub nodes: Vec<NodeDefinition>,
    pub edges: Vec<Edge>,
    #[serde(default)]
    pub is_public: bool,
}

pub async fn list(State(state): State<AppState>) -> Result<Json<Vec<db::models::WorkflowRow>>, StatusCode> {
    match wf_repo::list_workflows(&state.pool).await {
        Ok(workflows) => Ok(Json(workflows)),
        Err(_) => Err(StatusCode::INTERNAL_SERVER_ERROR),
    }
}

/// A private workflow is invisible to everyone but its owner; non-owners
/// get `404` rather than `403` so the route doesn't leak that a private id
/// exists.
pub async fn get(
    Path(id): Path<Uuid>,
    Query(caller): Query<CallerQuery>,
    State(state): State<AppState>,
) -> Result<Json<db::models::WorkflowRow>, StatusCode> {
    let wf = match wf_repo::get_workflow(&state.pool, id).await {
        Ok(wf) => wf,
        Err(db::DbError::NotFound) => return Err(StatusCode::NOT_FOUND),
        Err(_) => return Err(StatusCode::INTERNAL_SERVER_ERROR),
    };

    if !wf.is_public && caller.user_id != Some(wf.user_id) {
        return Err(StatusCode::NOT_FOUND);
    }

    Ok(Json(wf))
}

pub async fn create(
    State(state): State<AppState>,
    Json(payload): Json<CreateWorkflowDto>,
) -> Result<(StatusCode, Json<db::models::WorkflowRow>), StatusCode> {
    if payload.nodes.is_empty() {
        return Err(StatusCode::BAD_REQUEST);
    }

    let workflow = engine::Workflow {
        id: Uuid::new_v4(),
        user_id: payload.user_id,
        name: payload.name.clone(),
        trigger: payload.trigger,
        nodes: payload.nodes,
        edges: payload.edges,
        is_public: payload.is_public,
        version: 1,
        created_at: chrono::Utc::now(),
    };

    let definition: Value = match serde_json::to_value(&workflow) {
        Ok(v) => v,
        Err(_) => return Err(StatusCode::INTERNAL_SERVER_ERROR),
    };

    match wf_repo::create_workflow(&state.pool, payload.user_id, &payload.name, definition, payload.is_public).await {
        Ok(wf) => Ok((StatusCode::CREATED, Json(wf))),
        Err(_) => Err(StatusCode::INTERNAL_SERVER_ERROR),
    }
}

/// Deletion requires the caller to name themselves as the owner
/// (`?user_id=`); `isPublic` never grants write access.
pub async fn delete(
    Path(id): Path<Uuid>,
    Query(caller): Query<CallerQuery>,
    State(state): State<AppState>,
) -> Result<StatusCode, StatusCode> {
    let wf = match wf_repo::get_workflow(&state.pool, id).await {
        Ok(wf) => wf,
        Err(db::DbError::NotFound) => return Err(StatusCode::NOT_FOUND),
        Err(_) => return Err(StatusCode::INTERNAL_SERVER_ERROR),
    };

    if caller.user_id != Some(wf.user_id) {
        return Err(StatusCode::FORBIDDEN);
    }

    match wf_repo::delete_workflow(&state.pool, id).await {
        Ok(_) => Ok(StatusCode::NO_CONTENT),
        Err(db::DbError::NotFound) => Err(StatusCode::NOT_FOUND),
        Err(_) => Err(StatusCode::INTERNAL_SERVER_ERROR),
    }
}
