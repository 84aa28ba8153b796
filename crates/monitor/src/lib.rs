//! `monitor` crate — real-time progress view (C10) and durable log writer
//! (C7) for running executions.

pub mod events;
pub mod logger;
pub mod monitor;

pub use events::{EdgeFlowStatus, MonitorEvent};
pub use logger::ExecutionLogger;
pub use monitor::{ExecutionMonitor, ExecutionSnapshot};
