//! `ExecutorConfig` — env-var tunables for `NodeExecutor`/`WorkflowExecutor`
//! (spec §6 "Configuration (environment)").

use std::collections::HashSet;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    pub max_retries: u32,
    pub retry_backoff_ms: u64,
    pub retry_jitter_ms: u64,
    pub node_execution_timeout: Duration,
    pub terminal_allowed_categories: HashSet<String>,
    /// Open Question resolution (spec §9): promote lenient schema
    /// validation to hard failures. Default `false`.
    pub strict_schema_validation: bool,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            retry_backoff_ms: 1000,
            retry_jitter_ms: 500,
            node_execution_timeout: Duration::from_millis(300_000),
            terminal_allowed_categories: ["ACTION", "TRIGGER"].into_iter().map(String::from).collect(),
            strict_schema_validation: false,
        }
    }
}

impl ExecutorConfig {
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            max_retries: env_parsed("NODE_MAX_RETRIES").unwrap_or(default.max_retries),
            retry_backoff_ms: env_parsed("NODE_RETRY_BACKOFF_MS").unwrap_or(default.retry_backoff_ms),
            retry_jitter_ms: env_parsed("NODE_RETRY_JITTER_MS").unwrap_or(default.retry_jitter_ms),
            node_execution_timeout: env_parsed::<u64>("NODE_EXECUTION_TIMEOUT")
                .map(Duration::from_millis)
                .unwrap_or(default.node_execution_timeout),
            terminal_allowed_categories: std::env::var("TERMINAL_ALLOWED_CATEGORIES")
                .ok()
                .map(|v| v.split(',').map(|s| s.trim().to_uppercase()).collect())
                .unwrap_or(default.terminal_allowed_categories),
            strict_schema_validation: env_parsed("STRICT_SCHEMA_VALIDATION").unwrap_or(default.strict_schema_validation),
        }
    }
}

fn env_parsed<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.parse().ok())
}
