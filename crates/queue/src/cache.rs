//! A small bounded, TTL'd cache — `QueueConsumer`'s workflow/profile
//! lookup cache (spec §4.6 step 6: "a small LRU cache, ttl ≈ 1h, cap ≈
//! 100"). Plain-stdlib: the shape here (cap + ttl, no access-frequency
//! tracking) is simple enough not to warrant pulling in a caching crate.

use std::collections::HashMap;
use std::hash::Hash;
use std::time::{Duration, Instant};

struct Entry<V> {
    value: V,
    inserted_at: Instant,
}

/// Insertion-order eviction once `capacity` is exceeded, plus a uniform
/// TTL per entry. Not a true LRU (no access-order bump) — recency of
/// insertion is what the workflow/profile lookup pattern actually needs,
/// since hot entries get re-inserted on every cache miss anyway.
pub struct TtlCache<K, V> {
    capacity: usize,
    ttl: Duration,
    entries: HashMap<K, Entry<V>>,
    order: std::collections::VecDeque<K>,
}

impl<K: Eq + Hash + Clone, V: Clone> TtlCache<K, V> {
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self { capacity, ttl, entries: HashMap::new(), order: std::collections::VecDeque::new() }
    }

    pub fn get(&mut self, key: &K) -> Option<V> {
        let expired = self.entries.get(key).map(|e| e.inserted_at.elapsed() > self.ttl).unwrap_or(false);
        if expired {
            self.entries.remove(key);
        }
        self.entries.get(key).map(|e| e.value.clone())
    }

    pub fn insert(&mut self, key: K, value: V) {
        if !self.entries.contains_key(&key) {
            self.order.push_back(key.clone());
        }
        self.entries.insert(key, Entry { value, inserted_at: Instant::now() });
        while self.entries.len() > self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.entries.remove(&oldest);
            } else {
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn evicts_oldest_entry_past_capacity() {
        let mut cache: TtlCache<u32, &str> = TtlCache::new(2, Duration::from_secs(3600));
        cache.insert(1, "a");
        cache.insert(2, "b");
        cache.insert(3, "c");
        assert!(cache.get(&1).is_none());
        assert_eq!(cache.get(&2), Some("b"));
        assert_eq!(cache.get(&3), Some("c"));
    }

    #[test]
    fn expires_entries_past_ttl() {
        let mut cache: TtlCache<u32, &str> = TtlCache::new(10, Duration::from_millis(1));
        cache.insert(1, "a");
        std::thread::sleep(Duration::from_millis(5));
        assert!(cache.get(&1).is_none());
    }
}
