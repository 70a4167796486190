// src/client/cache.rs
//! Read-through query cache with explicit invalidation
//!
//! Lists are fetched once and served from memory until they go stale or a
//! mutation invalidates them. Mutations never patch cached lists.

use ahash::HashMap;
use std::hash::Hash;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

struct Entry<V> {
    value: V,
    fetched_at: Instant,
}

struct State<K, V> {
    entries: HashMap<K, Entry<V>>,
    // Bumped by every invalidation of the key
    generations: HashMap<K, u64>,
    // Bumped by `invalidate_all`
    epoch: u64,
}

impl<K: Eq + Hash, V> State<K, V> {
    fn generation(&self, key: &K) -> u64 {
        self.epoch + self.generations.get(key).copied().unwrap_or(0)
    }
}

/// Keyed store of `(value, freshness)`
///
/// Each key also carries a generation that moves forward on invalidation.
/// A fetch records the generation before it starts and hands it back to
/// [`QueryCache::insert_if_current`], so a response that raced with a
/// mutation is never cached.
pub struct QueryCache<K, V> {
    state: RwLock<State<K, V>>,
    stale_after: Duration,
}

impl<K, V> QueryCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    /// Entries older than `stale_after` are treated as missing
    pub fn new(stale_after: Duration) -> Self {
        Self {
            state: RwLock::new(State {
                entries: HashMap::default(),
                generations: HashMap::default(),
                epoch: 0,
            }),
            stale_after,
        }
    }

    /// Fresh value for `key`, if any
    pub async fn get(&self, key: &K) -> Option<V> {
        let state = self.state.read().await;
        state
            .entries
            .get(key)
            .filter(|entry| entry.fetched_at.elapsed() < self.stale_after)
            .map(|entry| entry.value.clone())
    }

    pub async fn insert(&self, key: K, value: V) {
        self.state.write().await.entries.insert(
            key,
            Entry {
                value,
                fetched_at: Instant::now(),
            },
        );
    }

    /// Current generation of `key`
    pub async fn generation(&self, key: &K) -> u64 {
        self.state.read().await.generation(key)
    }

    /// Insert only if `key` was not invalidated since `generation` was read.
    /// Returns whether the value was stored.
    pub async fn insert_if_current(&self, key: K, value: V, generation: u64) -> bool {
        let mut state = self.state.write().await;
        if state.generation(&key) != generation {
            return false;
        }
        state.entries.insert(
            key,
            Entry {
                value,
                fetched_at: Instant::now(),
            },
        );
        true
    }

    /// Drop `key` so the next read refetches. Returns whether it was cached.
    pub async fn invalidate(&self, key: &K) -> bool {
        let mut state = self.state.write().await;
        *state.generations.entry(key.clone()).or_insert(0) += 1;
        state.entries.remove(key).is_some()
    }

    pub async fn invalidate_all(&self) {
        let mut state = self.state.write().await;
        state.epoch += 1;
        state.entries.clear();
    }

    pub async fn is_fresh(&self, key: &K) -> bool {
        self.get(key).await.is_some()
    }

    pub fn stale_after(&self) -> Duration {
        self.stale_after
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_insert_get_invalidate() {
        let cache: QueryCache<&'static str, u32> = QueryCache::new(Duration::from_secs(60));

        assert_eq!(cache.get(&"rules").await, None);
        cache.insert("rules", 3).await;
        assert_eq!(cache.get(&"rules").await, Some(3));
        assert!(cache.is_fresh(&"rules").await);

        assert!(cache.invalidate(&"rules").await);
        assert!(!cache.invalidate(&"rules").await);
        assert_eq!(cache.get(&"rules").await, None);
    }

    #[tokio::test]
    async fn test_zero_window_is_always_stale() {
        let cache: QueryCache<&'static str, u32> = QueryCache::new(Duration::ZERO);
        cache.insert("rules", 1).await;
        assert_eq!(cache.get(&"rules").await, None);
    }

    #[tokio::test]
    async fn test_invalidate_all() {
        let cache: QueryCache<String, u32> = QueryCache::new(Duration::from_secs(60));
        cache.insert("a".to_string(), 1).await;
        cache.insert("b".to_string(), 2).await;
        cache.invalidate_all().await;
        assert!(!cache.is_fresh(&"a".to_string()).await);
        assert!(!cache.is_fresh(&"b".to_string()).await);
    }

    #[tokio::test]
    async fn test_insert_after_invalidation_is_dropped() {
        let cache: QueryCache<&'static str, u32> = QueryCache::new(Duration::from_secs(60));

        let before = cache.generation(&"rules").await;
        cache.invalidate(&"rules").await;
        assert!(!cache.insert_if_current("rules", 1, before).await);
        assert_eq!(cache.get(&"rules").await, None);

        let current = cache.generation(&"rules").await;
        assert!(cache.insert_if_current("rules", 2, current).await);
        assert_eq!(cache.get(&"rules").await, Some(2));

        let profiles = cache.generation(&"profiles").await;
        cache.invalidate(&"rules").await;
        assert!(cache.insert_if_current("profiles", 3, profiles).await);

        cache.invalidate_all().await;
        assert!(!cache.insert_if_current("profiles", 4, profiles).await);
    }
}
