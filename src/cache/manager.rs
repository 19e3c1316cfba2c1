/// Shared TTL response cache
///
/// Thread-safe, generic over the payload type. Each public operation takes
/// the internal lock exactly once and never holds it across I/O. Expiry is
/// lazy: the caller supplies the TTL on every read, and a stale entry is
/// reported as a miss but left in place until it is overwritten, evicted or
/// swept by `purge_older_than`.
use super::key::{CacheKey, RequestDescriptor};
use crate::logger::{self, LogTag};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::Instant;

pub const DEFAULT_CAPACITY: usize = 2000;

struct CacheEntry<V> {
    value: V,
    stored_at: Instant,
}

impl<V> CacheEntry<V> {
    fn new(value: V) -> Self {
        Self {
            value,
            stored_at: Instant::now(),
        }
    }

    fn age(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.stored_at)
    }
}

/// Cache metrics for monitoring
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheMetrics {
    pub hits: u64,
    pub misses: u64,
    pub expirations: u64,
    pub inserts: u64,
    pub evictions: u64,
}

impl CacheMetrics {
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

struct CacheState<V> {
    entries: HashMap<CacheKey, CacheEntry<V>>,
    metrics: CacheMetrics,
}

pub struct ResponseCache<V: Clone> {
    capacity: usize,
    state: Mutex<CacheState<V>>,
}

impl<V: Clone> ResponseCache<V> {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Capacity is clamped to at least one entry
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            state: Mutex::new(CacheState {
                entries: HashMap::new(),
                metrics: CacheMetrics::default(),
            }),
        }
    }

    /// Value stored for `descriptor` if it is younger than `ttl`
    ///
    /// A zero TTL never hits.
    pub fn get(&self, descriptor: &RequestDescriptor, ttl: Duration) -> Option<V> {
        let key = descriptor.cache_key();
        let now = Instant::now();
        let mut state = self.state.lock();

        let lookup = match state.entries.get(&key) {
            Some(entry) if entry.age(now) < ttl => Lookup::Hit(entry.value.clone()),
            Some(_) => Lookup::Expired,
            None => Lookup::Missing,
        };

        match lookup {
            Lookup::Hit(value) => {
                state.metrics.hits += 1;
                drop(state);
                logger::debug(LogTag::Cache, &format!("HIT {}", key));
                Some(value)
            }
            Lookup::Expired => {
                state.metrics.misses += 1;
                state.metrics.expirations += 1;
                drop(state);
                logger::debug(LogTag::Cache, &format!("EXPIRED {}", key));
                None
            }
            Lookup::Missing => {
                state.metrics.misses += 1;
                drop(state);
                logger::debug(LogTag::Cache, &format!("MISS {}", key));
                None
            }
        }
    }

    /// Store `value` under the canonical key of `descriptor`, stamped now
    pub fn set(&self, descriptor: &RequestDescriptor, value: V) {
        let key = descriptor.cache_key();
        let mut state = self.state.lock();

        if state.entries.len() >= self.capacity && !state.entries.contains_key(&key) {
            Self::evict_oldest(&mut state);
        }

        state.entries.insert(key, CacheEntry::new(value));
        state.metrics.inserts += 1;
    }

    pub fn remove(&self, descriptor: &RequestDescriptor) -> bool {
        let key = descriptor.cache_key();
        self.state.lock().entries.remove(&key).is_some()
    }

    /// Drop every entry; used by the manual full refresh
    pub fn clear(&self) {
        let removed = {
            let mut state = self.state.lock();
            let removed = state.entries.len();
            state.entries.clear();
            removed
        };
        logger::debug(LogTag::Cache, &format!("Cleared {} entries", removed));
    }

    /// Remove entries at least `max_age` old, returning how many went
    pub fn purge_older_than(&self, max_age: Duration) -> usize {
        let now = Instant::now();
        let mut state = self.state.lock();
        let before = state.entries.len();
        state.entries.retain(|_, entry| entry.age(now) < max_age);
        let purged = before - state.entries.len();
        state.metrics.expirations += purged as u64;
        purged
    }

    pub fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn metrics(&self) -> CacheMetrics {
        self.state.lock().metrics.clone()
    }

    fn evict_oldest(state: &mut CacheState<V>) {
        let oldest = state
            .entries
            .iter()
            .min_by_key(|(_, entry)| entry.stored_at)
            .map(|(key, _)| key.clone());

        if let Some(key) = oldest {
            state.entries.remove(&key);
            state.metrics.evictions += 1;
        }
    }
}

impl<V: Clone> Default for ResponseCache<V> {
    fn default() -> Self {
        Self::new()
    }
}

enum Lookup<V> {
    Hit(V),
    Expired,
    Missing,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Arc;

    fn descriptor(func: &str) -> RequestDescriptor {
        RequestDescriptor::new(func)
    }

    #[tokio::test(start_paused = true)]
    async fn test_value_served_within_ttl() {
        let cache = ResponseCache::new();
        cache.set(&descriptor("x"), 42);

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(cache.get(&descriptor("x"), Duration::from_secs(5)), Some(42));
    }

    #[tokio::test(start_paused = true)]
    async fn test_value_absent_after_ttl() {
        let cache = ResponseCache::new();
        cache.set(&descriptor("x"), 42);

        tokio::time::sleep(Duration::from_secs(6)).await;
        assert_eq!(cache.get(&descriptor("x"), Duration::from_secs(5)), None);

        // A longer TTL still sees the entry: expiry is decided per read
        assert_eq!(cache.get(&descriptor("x"), Duration::from_secs(10)), Some(42));
    }

    #[tokio::test(start_paused = true)]
    async fn test_age_equal_to_ttl_is_expired() {
        let cache = ResponseCache::new();
        cache.set(&descriptor("x"), 1);

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(cache.get(&descriptor("x"), Duration::from_secs(5)), None);
    }

    #[test]
    fn test_zero_ttl_never_hits() {
        let cache = ResponseCache::new();
        cache.set(&descriptor("x"), "v".to_string());
        assert_eq!(cache.get(&descriptor("x"), Duration::ZERO), None);
    }

    #[test]
    fn test_normalized_keys_share_a_slot() {
        let cache = ResponseCache::new();
        let stored = RequestDescriptor::from_json(&json!({"func": "caps", "ids": [3, 1, 2]}));
        let lookup = RequestDescriptor::from_json(&json!({"func": "caps", "ids": [1, 2, 3]}));

        cache.set(&stored, vec![1u64, 2, 3]);
        assert_eq!(
            cache.get(&lookup, Duration::from_secs(60)),
            Some(vec![1u64, 2, 3])
        );
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_set_overwrites() {
        let cache = ResponseCache::new();
        cache.set(&descriptor("x"), 1);
        cache.set(&descriptor("x"), 2);
        assert_eq!(cache.get(&descriptor("x"), Duration::from_secs(60)), Some(2));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_clear_empties_everything() {
        let cache = ResponseCache::new();
        cache.set(&descriptor("a"), 1);
        cache.set(&descriptor("b"), 2);
        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.get(&descriptor("a"), Duration::from_secs(60)), None);
    }

    #[test]
    fn test_metrics() {
        let cache = ResponseCache::new();
        cache.set(&descriptor("a"), 1);
        cache.get(&descriptor("a"), Duration::from_secs(60));
        cache.get(&descriptor("missing"), Duration::from_secs(60));

        let metrics = cache.metrics();
        assert_eq!(metrics.hits, 1);
        assert_eq!(metrics.misses, 1);
        assert_eq!(metrics.inserts, 1);
        assert!((metrics.hit_rate() - 0.5).abs() < f64::EPSILON);
    }

    #[tokio::test(start_paused = true)]
    async fn test_capacity_evicts_oldest() {
        let cache = ResponseCache::with_capacity(2);
        cache.set(&descriptor("a"), 1);
        tokio::time::sleep(Duration::from_millis(10)).await;
        cache.set(&descriptor("b"), 2);
        tokio::time::sleep(Duration::from_millis(10)).await;
        cache.set(&descriptor("c"), 3);

        let ttl = Duration::from_secs(60);
        assert_eq!(cache.get(&descriptor("a"), ttl), None);
        assert_eq!(cache.get(&descriptor("b"), ttl), Some(2));
        assert_eq!(cache.get(&descriptor("c"), ttl), Some(3));
        assert_eq!(cache.metrics().evictions, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_purge_older_than() {
        let cache = ResponseCache::new();
        cache.set(&descriptor("old"), 1);
        tokio::time::sleep(Duration::from_secs(400)).await;
        cache.set(&descriptor("new"), 2);

        assert_eq!(cache.purge_older_than(Duration::from_secs(300)), 1);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get(&descriptor("new"), Duration::from_secs(60)), Some(2));
    }

    #[test]
    fn test_concurrent_access() {
        let cache = Arc::new(ResponseCache::new());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let cache = Arc::clone(&cache);
                std::thread::spawn(move || {
                    for j in 0..100 {
                        let d = RequestDescriptor::new("t").param("n", (i * 100 + j) as i64);
                        cache.set(&d, j);
                        assert_eq!(cache.get(&d, Duration::from_secs(60)), Some(j));
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(cache.len(), 800);
    }
}
