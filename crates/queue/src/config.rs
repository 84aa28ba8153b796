//! `ConsumerConfig` — env-var tunables for `QueueConsumer` (spec §6
//! "Broker connection string, queue names, prefetch count, lease TTL").

use std::time::Duration;

#[derive(Debug, Clone)]
pub struct ConsumerConfig {
    /// Caps in-flight work per worker (spec §4.6 step 1, "small N, e.g.
    /// 10").
    pub prefetch: usize,
    /// `lockedBy` lease lifetime before another worker may reclaim the
    /// execution (spec §5).
    pub lease_ttl_secs: i64,
    /// Retry budget per message before routing to the dead-letter queue.
    pub max_retries: u32,
    /// Upper bound on `baseDelay * 2^retryCount + jitter` (spec §4.6
    /// step 10).
    pub retry_delay_cap: Duration,
    pub cache_capacity: usize,
    pub cache_ttl: Duration,
}

impl Default for ConsumerConfig {
    fn default() -> Self {
        Self {
            prefetch: 10,
            lease_ttl_secs: 300,
            max_retries: 3,
            retry_delay_cap: Duration::from_secs(30),
            cache_capacity: 100,
            cache_ttl: Duration::from_secs(3600),
        }
    }
}

impl ConsumerConfig {
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            prefetch: env_parsed("QUEUE_PREFETCH").unwrap_or(default.prefetch),
            lease_ttl_secs: env_parsed("EXECUTION_LEASE_TTL_SECS").unwrap_or(default.lease_ttl_secs),
            max_retries: env_parsed("QUEUE_MAX_RETRIES").unwrap_or(default.max_retries),
            retry_delay_cap: env_parsed::<u64>("QUEUE_RETRY_DELAY_CAP_MS").map(Duration::from_millis).unwrap_or(default.retry_delay_cap),
            cache_capacity: env_parsed("WORKFLOW_CACHE_CAPACITY").unwrap_or(default.cache_capacity),
            cache_ttl: env_parsed::<u64>("WORKFLOW_CACHE_TTL_SECS").map(Duration::from_secs).unwrap_or(default.cache_ttl),
        }
    }
}

fn env_parsed<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.parse().ok())
}
