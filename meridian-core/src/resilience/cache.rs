//! Bounded, TTL'd cache with a pluggable eviction policy and a
//! single-flight loader.
//!
//! Backed by `DashMap` for lock-striped concurrent access. A background
//! sweep (driven by the caller via [`BoundedCache::sweep_expired`], since
//! this module owns no runtime) removes expired entries; eviction under
//! capacity pressure is delegated to the configured [`EvictionPolicy`].

use dashmap::DashMap;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex as AsyncMutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EvictionPolicy {
    Lru,
    Lfu,
    ShortestTtl,
    Random,
}

struct Entry<V> {
    value: V,
    expires_at: Instant,
    last_accessed: AtomicU64,
    access_count: AtomicU64,
}

/// `last_accessed` is stored as millis-since-cache-creation so it can
/// live in an `AtomicU64` without an `Instant`'s niche issues.
pub struct BoundedCache<K, V> {
    entries: DashMap<K, Entry<V>>,
    loaders: DashMap<K, Arc<AsyncMutex<()>>>,
    created_at: Instant,
    max_size: usize,
    default_ttl: Duration,
    policy: EvictionPolicy,
}

impl<K, V> BoundedCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new(max_size: usize, default_ttl: Duration, policy: EvictionPolicy) -> Self {
        Self {
            entries: DashMap::new(),
            loaders: DashMap::new(),
            created_at: Instant::now(),
            max_size,
            default_ttl,
            policy,
        }
    }

    fn now_marker(&self) -> u64 {
        self.created_at.elapsed().as_millis() as u64
    }

    pub fn get(&self, key: &K) -> Option<V> {
        let entry = self.entries.get(key)?;
        if entry.expires_at <= Instant::now() {
            drop(entry);
            self.entries.remove(key);
            return None;
        }
        entry.last_accessed.store(self.now_marker(), Ordering::Relaxed);
        entry.access_count.fetch_add(1, Ordering::Relaxed);
        Some(entry.value.clone())
    }

    pub fn insert(&self, key: K, value: V) {
        self.insert_with_ttl(key, value, self.default_ttl);
    }

    pub fn insert_with_ttl(&self, key: K, value: V, ttl: Duration) {
        if self.entries.len() >= self.max_size && !self.entries.contains_key(&key) {
            self.evict_one();
        }
        self.entries.insert(
            key,
            Entry {
                value,
                expires_at: Instant::now() + ttl,
                last_accessed: AtomicU64::new(self.now_marker()),
                access_count: AtomicU64::new(0),
            },
        );
    }

    fn evict_one(&self) {
        let victim = match self.policy {
            EvictionPolicy::Lru => self
                .entries
                .iter()
                .min_by_key(|e| e.last_accessed.load(Ordering::Relaxed))
                .map(|e| e.key().clone()),
            EvictionPolicy::Lfu => self
                .entries
                .iter()
                .min_by_key(|e| e.access_count.load(Ordering::Relaxed))
                .map(|e| e.key().clone()),
            EvictionPolicy::ShortestTtl => self
                .entries
                .iter()
                .min_by_key(|e| e.expires_at)
                .map(|e| e.key().clone()),
            EvictionPolicy::Random => self.entries.iter().next().map(|e| e.key().clone()),
        };
        if let Some(key) = victim {
            self.entries.remove(&key);
        }
    }

    /// Remove every expired entry. Call periodically (every 60s per the
    /// design) from a background task.
    pub fn sweep_expired(&self) -> usize {
        let now = Instant::now();
        let expired: Vec<K> = self
            .entries
            .iter()
            .filter(|e| e.expires_at <= now)
            .map(|e| e.key().clone())
            .collect();
        let count = expired.len();
        for key in expired {
            self.entries.remove(&key);
        }
        count
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Get-or-load with an at-most-one-concurrent-loader guarantee per
    /// key. A failed load leaves no entry behind so the next caller tries
    /// again rather than caching the failure.
    pub async fn get_with_loader<F, Fut, E>(&self, key: K, loader: F) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<V, E>>,
    {
        if let Some(v) = self.get(&key) {
            return Ok(v);
        }

        let lock = self
            .loaders
            .entry(key.clone())
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone();
        let _guard = lock.lock().await;

        // Another caller may have populated the entry while we waited.
        if let Some(v) = self.get(&key) {
            self.loaders.remove(&key);
            return Ok(v);
        }

        let result = loader().await;
        self.loaders.remove(&key);
        match result {
            Ok(value) => {
                self.insert(key, value.clone());
                Ok(value)
            }
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn expired_entries_are_not_returned() {
        let cache: BoundedCache<&str, i32> =
            BoundedCache::new(10, Duration::from_millis(5), EvictionPolicy::Lru);
        cache.insert("k", 1);
        std::thread::sleep(Duration::from_millis(20));
        assert_eq!(cache.get(&"k"), None);
    }

    #[test]
    fn lru_eviction_drops_least_recently_used() {
        let cache: BoundedCache<i32, i32> =
            BoundedCache::new(2, Duration::from_secs(60), EvictionPolicy::Lru);
        cache.insert(1, 1);
        cache.insert(2, 2);
        cache.get(&1); // touch 1, making 2 the LRU victim
        cache.insert(3, 3);
        assert!(cache.get(&1).is_some());
        assert!(cache.get(&2).is_none());
        assert!(cache.get(&3).is_some());
    }

    #[test]
    fn sweep_removes_only_expired() {
        let cache: BoundedCache<i32, i32> =
            BoundedCache::new(10, Duration::from_millis(5), EvictionPolicy::Lru);
        cache.insert_with_ttl(1, 1, Duration::from_secs(60));
        cache.insert_with_ttl(2, 2, Duration::from_millis(5));
        std::thread::sleep(Duration::from_millis(20));
        assert_eq!(cache.sweep_expired(), 1);
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn get_with_loader_is_single_flight() {
        let cache: Arc<BoundedCache<&str, i32>> =
            Arc::new(BoundedCache::new(10, Duration::from_secs(60), EvictionPolicy::Lru));
        let calls = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let cache = cache.clone();
            let calls = calls.clone();
            handles.push(tokio::spawn(async move {
                cache
                    .get_with_loader("k", || {
                        let calls = calls.clone();
                        async move {
                            calls.fetch_add(1, Ordering::SeqCst);
                            tokio::time::sleep(Duration::from_millis(20)).await;
                            Ok::<_, std::convert::Infallible>(7)
                        }
                    })
                    .await
                    .unwrap()
            }));
        }
        for h in handles {
            assert_eq!(h.await.unwrap(), 7);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failed_load_does_not_poison_the_cache() {
        let cache: BoundedCache<&str, i32> =
            BoundedCache::new(10, Duration::from_secs(60), EvictionPolicy::Lru);
        let first: Result<i32, &str> = cache.get_with_loader("k", || async { Err("boom") }).await;
        assert!(first.is_err());
        let second = cache.get_with_loader("k", || async { Ok::<_, &str>(9) }).await;
        assert_eq!(second, Ok(9));
    }
}
