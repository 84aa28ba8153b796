//! `ErrorClassifier` (C9) — tags an error message with a retry kind,
//! whether it's retryable, and a base delay (spec §4.6). Distinct from
//! `nodes::categorize`, which only feeds the logger; this one drives
//! `QueueConsumer`'s retry-vs-DLQ routing decision.

use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Network,
    RateLimit,
    Authentication,
    Configuration,
    Quota,
    Circuit,
    External5xx,
    Unknown,
}

#[derive(Debug, Clone, Copy)]
pub struct Classification {
    pub kind: ErrorKind,
    pub retryable: bool,
    pub base_delay: Option<Duration>,
}

/// Substring → kind/retryable/baseDelay, reproduced verbatim from the
/// table in spec §4.6. Checked in table order so a message matching more
/// than one pattern (unlikely in practice) resolves to the earliest row.
pub fn classify_error(message: &str) -> Classification {
    let patterns: &[(&[&str], ErrorKind, bool, Option<u64>)] = &[
        (&["fetch failed", "ENOTFOUND", "ECONNREFUSED", "ETIMEDOUT"], ErrorKind::Network, true, Some(2)),
        (&["rate limit", "429", "too many requests"], ErrorKind::RateLimit, true, Some(5)),
        (&["unauthorized", "401", "403", "invalid token"], ErrorKind::Authentication, false, None),
        (&["missing", "required", "invalid configuration"], ErrorKind::Configuration, false, None),
        (&["quota exceeded", "limit exceeded"], ErrorKind::Quota, false, None),
        (&["Circuit breaker is OPEN"], ErrorKind::Circuit, true, Some(30)),
        (&["HTTP 5", "Internal Server Error"], ErrorKind::External5xx, true, Some(3)),
    ];

    for (needles, kind, retryable, delay_secs) in patterns {
        if needles.iter().any(|needle| message.contains(needle)) {
            return Classification { kind: *kind, retryable: *retryable, base_delay: delay_secs.map(Duration::from_secs) };
        }
    }

    Classification { kind: ErrorKind::Unknown, retryable: true, base_delay: Some(Duration::from_secs(1)) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn network_errors_are_retryable() {
        let c = classify_error("fetch failed: connection reset");
        assert_eq!(c.kind, ErrorKind::Network);
        assert!(c.retryable);
        assert_eq!(c.base_delay, Some(Duration::from_secs(2)));
    }

    #[test]
    fn quota_exceeded_is_not_retryable() {
        let c = classify_error("quota exceeded for this user");
        assert_eq!(c.kind, ErrorKind::Quota);
        assert!(!c.retryable);
        assert_eq!(c.base_delay, None);
    }

    #[test]
    fn circuit_open_is_retryable_with_thirty_second_delay() {
        let c = classify_error("Circuit breaker is OPEN for node-type:http");
        assert_eq!(c.kind, ErrorKind::Circuit);
        assert_eq!(c.base_delay, Some(Duration::from_secs(30)));
    }

    #[test]
    fn unrecognized_message_defaults_to_unknown_retryable() {
        let c = classify_error("the goose escaped the farm");
        assert_eq!(c.kind, ErrorKind::Unknown);
        assert!(c.retryable);
    }
}
