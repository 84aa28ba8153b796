//! Multi-level circuit breaking for node and workflow execution (C3/C4).

pub mod config;
pub mod error;
pub mod multilevel;
pub mod state;
pub mod store;

pub use config::BreakerConfig;
pub use error::BreakerError;
pub use multilevel::{AdmissionResult, BreakerContext, MultiLevelBreaker};
pub use state::{BreakerState, CircuitState};
pub use store::{BreakerStore, InMemoryBreakerStore, PgBreakerStore};
