//! `api` crate — HTTP REST API layer
//!
//! Exposes:
//!   GET    /api/v1/workflows
//!   POST   /api/v1/workflows
//!   GET    /api/v1/workflows/:id
//!   DELETE /api/v1/workflows/:id
//!   POST   /api/v1/workflows/:id/execute
//!   POST   /webhook/:path
//!
//! Workflow authoring and triggering only; the actual DAG execution happens
//! out-of-process in `queue::QueueConsumer` workers, reached by publishing
//! a `QueueMessage` onto the shared `Broker`.

pub mod handlers;

use std::sync::Arc;

use axum::{
    routing::{delete, get, post},
    Json, Router,
};
use db::DbPool;
use queue::Broker;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use handlers::AppState;

async fn healthz(axum::extract::State(state): axum::extract::State<AppState>) -> Json<serde_json::Value> {
    let db_ok = sqlx::query("SELECT 1").execute(&state.pool).await.is_ok();
    Json(serde_json::json!({ "status": if db_ok { "ok" } else { "degraded" }, "database": db_ok }))
}

pub async fn serve(bind: &str, pool: DbPool, broker: Arc<dyn Broker>) -> Result<(), std::io::Error> {
    let state = AppState { pool, broker };

    let cors = CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any);

    let api_router = Router::new()
        .route("/workflows", get(handlers::workflows::list).post(handlers::workflows::create))
        .route("/workflows/:id", get(handlers::workflows::get).delete(handlers::workflows::delete))
        .route("/workflows/:id/execute", post(handlers::executions::execute));

    let app = Router::new()
        .nest("/api/v1", api_router)
        .route("/webhook/:path", post(handlers::webhooks::handle_webhook))
        .route("/healthz", get(healthz))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(bind).await?;
    tracing::info!("Server listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await
}
