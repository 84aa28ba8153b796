//! Deterministic error categorization for logging (spec §4.4): this tags an
//! error message for the logger only, it never changes retry control flow
//! (that's `queue::classify`, which classifies at the queue-message level
//! instead).

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    QuotaExceeded,
    Unauthorized,
    NotFound,
    ValidationError,
    UnknownError,
}

impl ErrorCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::QuotaExceeded => "QuotaExceeded",
            Self::Unauthorized => "Unauthorized",
            Self::NotFound => "NotFound",
            Self::ValidationError => "ValidationError",
            Self::UnknownError => "UnknownError",
        }
    }
}

/// Categorize an error message by substring, case-insensitively.
pub fn categorize(message: &str) -> ErrorCategory {
    let lower = message.to_lowercase();
    if lower.contains("quota") {
        ErrorCategory::QuotaExceeded
    } else if lower.contains("permission") {
        ErrorCategory::Unauthorized
    } else if lower.contains("not found") {
        ErrorCategory::NotFound
    } else if lower.contains("validation") {
        ErrorCategory::ValidationError
    } else {
        ErrorCategory::UnknownError
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn categorizes_known_substrings() {
        assert_eq!(categorize("quota exceeded for user"), ErrorCategory::QuotaExceeded);
        assert_eq!(categorize("missing permission to act"), ErrorCategory::Unauthorized);
        assert_eq!(categorize("resource not found"), ErrorCategory::NotFound);
        assert_eq!(categorize("validation failed: bad input"), ErrorCategory::ValidationError);
        assert_eq!(categorize("something else broke"), ErrorCategory::UnknownError);
    }
}
