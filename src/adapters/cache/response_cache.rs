//! Response cache with TTL expiry and bulk eviction.
//!
//! A single mutex guards the map. It is held only for the map operation itself
//! and never across an `.await`, so a slow backend call cannot stall lookups
//! for unrelated requests.
//!
//! Eviction is by insertion time, not last access: when a new key would push
//! the map past capacity, the oldest fifth of the entries is dropped in one
//! pass. Lookups do not refresh an entry's age.

use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::domain::models::Generation;

/// Hex SHA-256 digest identifying a `(prompt, model)` pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    /// Derive the key for a prompt and model.
    ///
    /// Both inputs are length-prefixed so that `("a_b", "c")` and `("a", "b_c")`
    /// hash differently.
    pub fn derive(prompt: &str, model: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update((prompt.len() as u64).to_le_bytes());
        hasher.update(prompt.as_bytes());
        hasher.update((model.len() as u64).to_le_bytes());
        hasher.update(model.as_bytes());
        Self(format!("{:x}", hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First eight hex characters, for log lines.
    pub fn short(&self) -> &str {
        &self.0[..8]
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

struct CacheEntry {
    value: Generation,
    inserted_at: Instant,
    /// Tie-breaker for entries inserted at the same instant.
    seq: u64,
}

#[derive(Default)]
struct CacheState {
    entries: HashMap<CacheKey, CacheEntry>,
    next_seq: u64,
}

impl CacheState {
    /// Remove the `count` entries with the oldest insertion time.
    fn evict_oldest(&mut self, count: usize) -> usize {
        let mut by_age: Vec<(Instant, u64, CacheKey)> = self
            .entries
            .iter()
            .map(|(key, entry)| (entry.inserted_at, entry.seq, key.clone()))
            .collect();
        by_age.sort_unstable_by(|a, b| (a.0, a.1).cmp(&(b.0, b.1)));

        let mut evicted = 0;
        for (_, _, key) in by_age.into_iter().take(count) {
            if self.entries.remove(&key).is_some() {
                evicted += 1;
            }
        }
        evicted
    }
}

/// Point-in-time view of the cache for the performance endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct CacheStats {
    pub entries: usize,
    pub max_entries: usize,
    pub ttl_secs: u64,
    pub hits: u64,
    pub misses: u64,
}

impl CacheStats {
    /// Hit rate in `0.0..=1.0`; `0.0` before the first lookup.
    #[allow(clippy::cast_precision_loss)]
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// Concurrency-safe response cache.
pub struct ResponseCache {
    state: Mutex<CacheState>,
    ttl: Duration,
    max_entries: usize,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl ResponseCache {
    /// Create a cache. `max_entries` is clamped to at least 1.
    pub fn new(ttl: Duration, max_entries: usize) -> Self {
        Self {
            state: Mutex::new(CacheState::default()),
            ttl,
            max_entries: max_entries.max(1),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Shorthand for [`CacheKey::derive`].
    pub fn key(prompt: &str, model: &str) -> CacheKey {
        CacheKey::derive(prompt, model)
    }

    /// Look up a live entry.
    ///
    /// An entry whose age has reached the TTL is removed and reported absent.
    pub fn get(&self, key: &CacheKey) -> Option<Generation> {
        let now = Instant::now();
        let mut state = self.lock();

        let expired = state
            .entries
            .get(key)
            .map(|entry| now.duration_since(entry.inserted_at) >= self.ttl);

        let found = match expired {
            Some(false) => state.entries.get(key).map(|entry| entry.value.clone()),
            Some(true) => {
                state.entries.remove(key);
                debug!(key = %key.short(), "cache entry expired");
                None
            }
            None => None,
        };
        drop(state);

        if found.is_some() {
            self.hits.fetch_add(1, Ordering::Relaxed);
            debug!(key = %key.short(), "cache hit");
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
        }
        found
    }

    /// Insert or overwrite an entry stamped with the current instant.
    ///
    /// A new key arriving at capacity first evicts the oldest fifth of the
    /// entries (at least one), so the size never exceeds `max_entries`.
    pub fn put(&self, key: CacheKey, value: Generation) {
        let now = Instant::now();
        let mut state = self.lock();

        let mut evicted = 0;
        if !state.entries.contains_key(&key) && state.entries.len() >= self.max_entries {
            evicted = state.evict_oldest(self.eviction_batch());
        }

        let seq = state.next_seq;
        state.next_seq += 1;
        let short = key.short().to_string();
        state.entries.insert(
            key,
            CacheEntry {
                value,
                inserted_at: now,
                seq,
            },
        );
        let size = state.entries.len();
        drop(state);

        if evicted > 0 {
            info!(evicted, size, "evicted oldest cached responses");
        }
        debug!(key = %short, "cached response");
    }

    /// Number of stored entries, including ones that expired but were not
    /// looked up since.
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every entry.
    pub fn clear(&self) {
        self.lock().entries.clear();
    }

    pub const fn ttl(&self) -> Duration {
        self.ttl
    }

    pub const fn max_entries(&self) -> usize {
        self.max_entries
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.len(),
            max_entries: self.max_entries,
            ttl_secs: self.ttl.as_secs(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }

    const fn eviction_batch(&self) -> usize {
        let batch = self.max_entries / 5;
        if batch == 0 {
            1
        } else {
            batch
        }
    }

    // Poison is recovered: no critical section leaves the map half-updated.
    fn lock(&self) -> MutexGuard<'_, CacheState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn generation(text: &str) -> Generation {
        Generation {
            text: text.to_string(),
            model: "gemma:2b".to_string(),
        }
    }

    #[test]
    fn test_key_is_deterministic() {
        let a = ResponseCache::key("What is 2+2?", "gemma:2b");
        let b = ResponseCache::key("What is 2+2?", "gemma:2b");
        assert_eq!(a, b);
        assert_eq!(a.as_str().len(), 64);
        assert!(a.as_str().chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_key_separates_prompt_and_model() {
        assert_ne!(
            ResponseCache::key("a_b", "c"),
            ResponseCache::key("a", "b_c")
        );
        assert_ne!(
            ResponseCache::key("What is 2+2?", "gemma:2b"),
            ResponseCache::key("What is 2+2?", "llama3")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_get_within_ttl_returns_value() {
        let cache = ResponseCache::new(Duration::from_secs(60), 10);
        let key = ResponseCache::key("hi", "gemma:2b");
        cache.put(key.clone(), generation("hello"));

        tokio::time::advance(Duration::from_millis(59_999)).await;
        assert_eq!(cache.get(&key), Some(generation("hello")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_get_at_ttl_is_absent_and_removes_entry() {
        let cache = ResponseCache::new(Duration::from_secs(60), 10);
        let key = ResponseCache::key("hi", "gemma:2b");
        cache.put(key.clone(), generation("hello"));

        tokio::time::advance(Duration::from_secs(60)).await;
        assert_eq!(cache.get(&key), None);
        assert!(cache.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_get_does_not_refresh_age() {
        let cache = ResponseCache::new(Duration::from_secs(10), 10);
        let key = ResponseCache::key("hi", "gemma:2b");
        cache.put(key.clone(), generation("hello"));

        tokio::time::advance(Duration::from_secs(6)).await;
        assert!(cache.get(&key).is_some());
        tokio::time::advance(Duration::from_secs(6)).await;
        assert!(cache.get(&key).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_overflow_evicts_oldest_fifth() {
        let cache = ResponseCache::new(Duration::from_secs(3600), 10);
        let keys: Vec<CacheKey> = (0..10)
            .map(|i| ResponseCache::key(&format!("prompt {i}"), "gemma:2b"))
            .collect();
        for (i, key) in keys.iter().enumerate() {
            cache.put(key.clone(), generation(&format!("answer {i}")));
            tokio::time::advance(Duration::from_secs(1)).await;
        }
        assert_eq!(cache.len(), 10);

        let newest = ResponseCache::key("prompt 10", "gemma:2b");
        cache.put(newest.clone(), generation("answer 10"));

        assert_eq!(cache.len(), 9);
        assert!(cache.get(&keys[0]).is_none());
        assert!(cache.get(&keys[1]).is_none());
        for key in &keys[2..] {
            assert!(cache.get(key).is_some());
        }
        assert!(cache.get(&newest).is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_eviction_uses_insertion_order_not_access() {
        let cache = ResponseCache::new(Duration::from_secs(3600), 5);
        let keys: Vec<CacheKey> = (0..5)
            .map(|i| ResponseCache::key(&format!("p{i}"), "m"))
            .collect();
        for key in &keys {
            cache.put(key.clone(), generation("x"));
            tokio::time::advance(Duration::from_secs(1)).await;
        }

        // Reading the oldest entry does not protect it.
        assert!(cache.get(&keys[0]).is_some());
        cache.put(ResponseCache::key("p5", "m"), generation("y"));

        assert!(cache.get(&keys[0]).is_none());
        assert!(cache.get(&keys[1]).is_some());
    }

    #[test]
    fn test_same_instant_inserts_evict_in_insertion_order() {
        let cache = ResponseCache::new(Duration::from_secs(3600), 5);
        let keys: Vec<CacheKey> = (0..6)
            .map(|i| ResponseCache::key(&format!("p{i}"), "m"))
            .collect();
        for key in &keys {
            cache.put(key.clone(), generation("x"));
        }
        assert_eq!(cache.len(), 5);
        assert!(cache.get(&keys[0]).is_none());
        assert!(cache.get(&keys[5]).is_some());
    }

    #[test]
    fn test_overwrite_at_capacity_does_not_evict() {
        let cache = ResponseCache::new(Duration::from_secs(3600), 3);
        for i in 0..3 {
            cache.put(ResponseCache::key(&format!("p{i}"), "m"), generation("x"));
        }
        cache.put(ResponseCache::key("p1", "m"), generation("updated"));

        assert_eq!(cache.len(), 3);
        assert_eq!(
            cache.get(&ResponseCache::key("p1", "m")),
            Some(generation("updated"))
        );
    }

    #[test]
    fn test_small_capacity_still_evicts_one() {
        let cache = ResponseCache::new(Duration::from_secs(3600), 2);
        for i in 0..5 {
            cache.put(ResponseCache::key(&format!("p{i}"), "m"), generation("x"));
            assert!(cache.len() <= 2);
        }
    }

    #[test]
    fn test_stats_track_hits_and_misses() {
        let cache = ResponseCache::new(Duration::from_secs(3600), 10);
        let key = ResponseCache::key("p", "m");
        assert!(cache.get(&key).is_none());
        cache.put(key.clone(), generation("x"));
        assert!(cache.get(&key).is_some());
        assert!(cache.get(&key).is_some());

        let stats = cache.stats();
        assert_eq!(stats.entries, 1);
        assert_eq!(stats.max_entries, 10);
        assert_eq!(stats.ttl_secs, 3600);
        assert_eq!(stats.hits, 2);
        assert_eq!(stats.misses, 1);
        assert!((stats.hit_rate() - 2.0 / 3.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_concurrent_puts_respect_capacity() {
        let cache = Arc::new(ResponseCache::new(Duration::from_secs(3600), 50));
        let workers: Vec<_> = (0..8)
            .map(|worker| {
                let cache = Arc::clone(&cache);
                std::thread::spawn(move || {
                    for i in 0..200 {
                        let key = ResponseCache::key(&format!("w{worker}-{i}"), "m");
                        cache.put(key.clone(), generation("x"));
                        let _ = cache.get(&key);
                        assert!(cache.len() <= 50);
                    }
                })
            })
            .collect();
        for worker in workers {
            worker.join().expect("worker panicked");
        }
        assert!(cache.len() <= 50);
    }
}
