//! `engine` crate — core domain models, DAG validation/scheduling, and the
//! node- and workflow-level execution orchestrators.

pub mod config;
pub mod dag;
pub mod error;
pub mod executor;
pub mod models;
pub mod node_executor;
pub mod validate;

pub use config::ExecutorConfig;
pub use error::EngineError;
pub use executor::WorkflowExecutor;
pub use models::{Edge, NodeDefinition, Trigger, Workflow};
pub use node_executor::NodeExecutor;
pub use validate::GraphValidator;

#[cfg(test)]
mod executor_tests;
