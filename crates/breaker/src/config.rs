//! Tunable thresholds for the circuit breaker state machine (spec §4.3).

use std::time::Duration;

#[derive(Debug, Clone, Copy)]
pub struct BreakerConfig {
    /// Failures within `monitor_window` before `CLOSED → OPEN`.
    pub failure_threshold: u32,
    /// How long `OPEN` must elapse before allowing a `HALF_OPEN` probe.
    pub reset_timeout: Duration,
    /// Consecutive successes in `HALF_OPEN` before `→ CLOSED`.
    pub half_open_success_threshold: u32,
    /// Window beyond which a prior failure no longer counts toward
    /// `failure_threshold`.
    pub monitor_window: Duration,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            reset_timeout: Duration::from_secs(30),
            half_open_success_threshold: 2,
            monitor_window: Duration::from_secs(120),
        }
    }
}

impl BreakerConfig {
    /// Read overrides from the environment, falling back to spec defaults.
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            failure_threshold: std::env::var("CB_FAILURE_THRESHOLD")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.failure_threshold),
            reset_timeout: std::env::var("CB_RESET_TIMEOUT_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .map(Duration::from_millis)
                .unwrap_or(default.reset_timeout),
            half_open_success_threshold: std::env::var("CB_HALF_OPEN_SUCCESS_THRESHOLD")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.half_open_success_threshold),
            monitor_window: std::env::var("CB_MONITOR_WINDOW_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .map(Duration::from_millis)
                .unwrap_or(default.monitor_window),
        }
    }
}
