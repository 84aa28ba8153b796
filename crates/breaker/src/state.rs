//! The per-circuit state machine (spec §4.3):
//!
//! ```text
//! CLOSED    → OPEN       when failureCount ≥ failureThreshold within monitorWindow
//! OPEN      → HALF_OPEN  when now − lastFailureTime ≥ resetTimeout
//! HALF_OPEN → CLOSED     when successive successes ≥ halfOpenSuccessThreshold
//! HALF_OPEN → OPEN       on any failure, immediate
//! ```
//!
//! This module is pure — no I/O, no clock reads beyond the `now` passed in —
//! so the transition logic is exhaustively unit-testable and the async
//! store (`store.rs`) is a thin persistence shell around it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::BreakerConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

impl CircuitState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Closed => "closed",
            Self::Open => "open",
            Self::HalfOpen => "half_open",
        }
    }
}

impl std::str::FromStr for CircuitState {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "closed" => Ok(Self::Closed),
            "open" => Ok(Self::Open),
            "half_open" => Ok(Self::HalfOpen),
            other => Err(format!("unknown circuit state: {other}")),
        }
    }
}

/// In-memory snapshot of a single circuit's state — the value the store
/// reads, mutates via the functions below, and writes back.
#[derive(Debug, Clone, PartialEq)]
pub struct BreakerState {
    pub circuit_id: String,
    pub state: CircuitState,
    pub failure_count: u32,
    pub success_count: u32,
    pub last_failure_time: Option<DateTime<Utc>>,
    pub last_success_time: Option<DateTime<Utc>>,
    pub last_half_open_time: Option<DateTime<Utc>>,
}

impl BreakerState {
    pub fn new(circuit_id: impl Into<String>) -> Self {
        Self {
            circuit_id: circuit_id.into(),
            state: CircuitState::Closed,
            failure_count: 0,
            success_count: 0,
            last_failure_time: None,
            last_success_time: None,
            last_half_open_time: None,
        }
    }
}

/// Apply the `OPEN → HALF_OPEN` timeout transition if due. Called before
/// every admission check so `shouldAllowExecution` observes an up-to-date
/// state (spec §4.3: "admission decisions must observe state changes").
pub fn apply_timeout(state: &mut BreakerState, config: &BreakerConfig, now: DateTime<Utc>) {
    if state.state == CircuitState::Open {
        if let Some(last_failure) = state.last_failure_time {
            let elapsed = now.signed_duration_since(last_failure);
            if elapsed >= chrono::Duration::from_std(config.reset_timeout).unwrap_or_default() {
                state.state = CircuitState::HalfOpen;
                state.last_half_open_time = Some(now);
                state.success_count = 0;
            }
        }
    }
}

/// Whether the circuit currently admits an operation. Does not mutate
/// `state` — call [`apply_timeout`] first if a fresh decision is needed.
pub fn is_admitting(state: &BreakerState) -> bool {
    matches!(state.state, CircuitState::Closed | CircuitState::HalfOpen)
}

/// Record a success, per the transition table above.
pub fn record_success(state: &mut BreakerState, config: &BreakerConfig, now: DateTime<Utc>) {
    state.last_success_time = Some(now);

    match state.state {
        CircuitState::Closed => {
            // Successes don't reset the failure count by themselves; only
            // an explicit CLOSED transition resets counters (spec §4.3
            // "Counters reset to zero on state change into CLOSED").
        }
        CircuitState::HalfOpen => {
            state.success_count += 1;
            if state.success_count >= config.half_open_success_threshold {
                transition_to_closed(state);
            }
        }
        CircuitState::Open => {
            // A success can't reach the handler while OPEN in normal
            // operation (admission is denied first) — recorded defensively
            // with no transition.
        }
    }
}

/// Record a failure, per the transition table above. `L2` in spec §8:
/// `recordFailure` on a `CLOSED` breaker with `failureThreshold = 1`
/// leaves it `OPEN` with `failureCount = 1, successCount = 0`.
pub fn record_failure(state: &mut BreakerState, config: &BreakerConfig, now: DateTime<Utc>) {
    // Stale-failure reset: failures older than monitor_window don't count
    // toward the threshold (spec §4.3).
    let window_expired = state
        .last_failure_time
        .map(|last| {
            now.signed_duration_since(last)
                > chrono::Duration::from_std(config.monitor_window).unwrap_or_default()
        })
        .unwrap_or(false);

    match state.state {
        CircuitState::HalfOpen => {
            // Any failure in HALF_OPEN reopens immediately.
            state.failure_count = 1;
            state.last_failure_time = Some(now);
            state.success_count = 0;
            state.state = CircuitState::Open;
            return;
        }
        CircuitState::Closed | CircuitState::Open => {
            if window_expired {
                state.failure_count = 1;
            } else {
                state.failure_count += 1;
            }
            state.last_failure_time = Some(now);
        }
    }

    if state.state == CircuitState::Closed && state.failure_count >= config.failure_threshold {
        state.state = CircuitState::Open;
    }
}

fn transition_to_closed(state: &mut BreakerState) {
    state.state = CircuitState::Closed;
    state.failure_count = 0;
    state.success_count = 0;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg(failure_threshold: u32) -> BreakerConfig {
        BreakerConfig {
            failure_threshold,
            ..BreakerConfig::default()
        }
    }

    #[test]
    fn b2_first_failure_opens_circuit_when_threshold_is_one() {
        let mut state = BreakerState::new("node-type:email");
        let config = cfg(1);
        record_failure(&mut state, &config, Utc::now());
        assert_eq!(state.state, CircuitState::Open);
        assert_eq!(state.failure_count, 1);
    }

    #[test]
    fn l2_recordsuccess_then_recordfailure_with_threshold_one() {
        let mut state = BreakerState::new("c");
        let config = cfg(1);
        let now = Utc::now();
        record_success(&mut state, &config, now);
        record_failure(&mut state, &config, now);
        assert_eq!(state.state, CircuitState::Open);
        assert_eq!(state.failure_count, 1);
        assert_eq!(state.success_count, 0);
    }

    #[test]
    fn five_failures_open_default_threshold() {
        let mut state = BreakerState::new("node-type:T");
        let config = BreakerConfig::default();
        let now = Utc::now();
        for _ in 0..4 {
            record_failure(&mut state, &config, now);
        }
        assert_eq!(state.state, CircuitState::Closed);
        record_failure(&mut state, &config, now);
        assert_eq!(state.state, CircuitState::Open);
    }

    #[test]
    fn open_transitions_to_half_open_after_reset_timeout() {
        let mut state = BreakerState::new("c");
        let config = BreakerConfig {
            failure_threshold: 1,
            reset_timeout: std::time::Duration::from_secs(30),
            ..BreakerConfig::default()
        };
        let t0 = Utc::now();
        record_failure(&mut state, &config, t0);
        assert_eq!(state.state, CircuitState::Open);

        apply_timeout(&mut state, &config, t0 + chrono::Duration::seconds(10));
        assert_eq!(state.state, CircuitState::Open, "too early to half-open");

        apply_timeout(&mut state, &config, t0 + chrono::Duration::seconds(31));
        assert_eq!(state.state, CircuitState::HalfOpen);
    }

    #[test]
    fn half_open_closes_after_success_threshold() {
        let mut state = BreakerState::new("c");
        let config = BreakerConfig {
            half_open_success_threshold: 2,
            ..BreakerConfig::default()
        };
        state.state = CircuitState::HalfOpen;
        let now = Utc::now();
        record_success(&mut state, &config, now);
        assert_eq!(state.state, CircuitState::HalfOpen);
        record_success(&mut state, &config, now);
        assert_eq!(state.state, CircuitState::Closed);
        assert_eq!(state.failure_count, 0);
    }

    #[test]
    fn half_open_reopens_on_any_failure() {
        let mut state = BreakerState::new("c");
        let config = BreakerConfig::default();
        state.state = CircuitState::HalfOpen;
        state.success_count = 1;
        record_failure(&mut state, &config, Utc::now());
        assert_eq!(state.state, CircuitState::Open);
    }

    #[test]
    fn failures_outside_monitor_window_reset_count() {
        let mut state = BreakerState::new("c");
        let config = BreakerConfig {
            failure_threshold: 5,
            monitor_window: std::time::Duration::from_secs(120),
            ..BreakerConfig::default()
        };
        let t0 = Utc::now();
        record_failure(&mut state, &config, t0);
        record_failure(&mut state, &config, t0 + chrono::Duration::seconds(10));
        assert_eq!(state.failure_count, 2);

        // A failure long after the window resets the count to 1.
        record_failure(&mut state, &config, t0 + chrono::Duration::seconds(200));
        assert_eq!(state.failure_count, 1);
    }
}
