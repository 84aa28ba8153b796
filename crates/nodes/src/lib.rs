//! `nodes` crate — the `ExecutableNode` trait and built-in node implementations.
//!
//! Every node — built-in and plugin alike — must implement [`ExecutableNode`].
//! The engine crate dispatches execution through this trait object.

pub mod blocktype;
pub mod categorize;
pub mod condition;
pub mod error;
pub mod http_stub;
pub mod mock;
pub mod prepare;
pub mod registry;
pub mod schema;
pub mod traits;

pub use error::NodeError;
pub use registry::NodeRegistry;
pub use traits::{ExecutableNode, ExecutionContext, NodeLogLevel, NodeLogger, NullLogger};
