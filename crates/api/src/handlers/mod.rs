//! HTTP handlers, one module per resource.

pub mod executions;
pub mod webhooks;
pub mod workflows;

use std::sync::Arc;

use db::DbPool;
use queue::Broker;

#[derive(Clone)]
pub struct AppState {
    pub pool: DbPool,
    pub broker: Arc<dyn Broker>,
}
