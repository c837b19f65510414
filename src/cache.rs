//! Bounded TTL cache for producer results.
//!
//! Entries expire a fixed duration after insertion regardless of reads; reads
//! refresh LRU recency only. `get_or_fetch` lets concurrent misses on one key
//! share a single upstream fetch.

use lru::LruCache;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

struct CacheEntry<V> {
    value: V,
    inserted_at: Instant,
}

type Gate = Arc<tokio::sync::Mutex<()>>;

pub struct TtlCache<K, V> {
    entries: Mutex<LruCache<K, CacheEntry<V>>>,
    inflight: Mutex<HashMap<K, Gate>>,
    ttl: Duration,
}

/// Holds one caller's claim on a key's gate. Dropping it, including when the
/// caller's future is cancelled, removes the gate once no one else holds it.
struct InflightSlot<'a, K: Hash + Eq> {
    inflight: &'a Mutex<HashMap<K, Gate>>,
    key: K,
    gate: Gate,
}

impl<K: Hash + Eq> Drop for InflightSlot<'_, K> {
    fn drop(&mut self) {
        let mut inflight = self.inflight.lock();
        // map + this caller
        if Arc::strong_count(&self.gate) <= 2 {
            inflight.remove(&self.key);
        }
    }
}

impl<K, V> TtlCache<K, V>
where
    K: Hash + Eq + Clone,
    V: Clone,
{
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        let cap = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(cap)),
            inflight: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    pub fn get(&self, key: &K) -> Option<V> {
        let mut entries = self.entries.lock();
        let expired = match entries.get(key) {
            Some(e) if e.inserted_at.elapsed() < self.ttl => return Some(e.value.clone()),
            Some(_) => true,
            None => false,
        };
        if expired {
            entries.pop(key);
        }
        None
    }

    /// Insert or replace; evicts the least recently used entry when full.
    pub fn set(&self, key: K, value: V) {
        self.entries.lock().put(
            key,
            CacheEntry {
                value,
                inserted_at: Instant::now(),
            },
        );
    }

    /// Cached value, or run `fetch` once for all concurrent callers of `key`.
    /// Errors are returned to the caller that fetched and are not cached;
    /// waiting callers then fetch for themselves.
    pub async fn get_or_fetch<F, Fut, E>(&self, key: K, fetch: F) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        if let Some(v) = self.get(&key) {
            return Ok(v);
        }

        let gate = self
            .inflight
            .lock()
            .entry(key.clone())
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone();
        let slot = InflightSlot {
            inflight: &self.inflight,
            key,
            gate,
        };
        let _guard = slot.gate.lock().await;

        match self.get(&slot.key) {
            Some(v) => Ok(v),
            None => {
                let fetched = fetch().await;
                if let Ok(v) = &fetched {
                    self.set(slot.key.clone(), v.clone());
                }
                fetched
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn entry_expires_after_ttl() {
        let ttl = Duration::from_secs(900);
        let cache = TtlCache::new(4, ttl);
        cache.set("k".to_string(), 7u32);

        tokio::time::advance(ttl - Duration::from_millis(1)).await;
        assert_eq!(cache.get(&"k".to_string()), Some(7));

        tokio::time::advance(Duration::from_millis(2)).await;
        assert_eq!(cache.get(&"k".to_string()), None);
        assert!(cache.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn reads_do_not_extend_expiry() {
        let ttl = Duration::from_secs(60);
        let cache = TtlCache::new(4, ttl);
        cache.set(1u8, "a");
        for _ in 0..5 {
            tokio::time::advance(Duration::from_secs(11)).await;
            assert_eq!(cache.get(&1), Some("a"));
        }
        tokio::time::advance(Duration::from_secs(6)).await;
        assert_eq!(cache.get(&1), None);
    }

    fn inflight_len<K: Hash + Eq + Clone, V: Clone>(cache: &TtlCache<K, V>) -> usize {
        cache.inflight.lock().len()
    }

    #[tokio::test(start_paused = true)]
    async fn aborted_fetches_release_their_gates() {
        let cache = Arc::new(TtlCache::<String, u32>::new(16, Duration::from_secs(60)));
        let mut handles = Vec::new();
        for i in 0..20 {
            let c = cache.clone();
            handles.push(tokio::spawn(async move {
                c.get_or_fetch(format!("k{i}"), || async {
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                    Ok::<u32, ()>(1)
                })
                .await
            }));
        }
        while inflight_len(&cache) < 20 {
            tokio::task::yield_now().await;
        }

        for h in &handles {
            h.abort();
        }
        for h in handles {
            assert!(h.await.unwrap_err().is_cancelled());
        }
        assert_eq!(inflight_len(&cache), 0);
        assert!(cache.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn waiter_fetches_after_fetcher_is_aborted() {
        let cache = Arc::new(TtlCache::<&str, u32>::new(16, Duration::from_secs(60)));
        let c = cache.clone();
        let slow = tokio::spawn(async move {
            c.get_or_fetch("k", || async {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok::<u32, ()>(1)
            })
            .await
        });
        while inflight_len(&cache) < 1 {
            tokio::task::yield_now().await;
        }
        let c = cache.clone();
        let waiter = tokio::spawn(async move { c.get_or_fetch("k", || async { Ok::<u32, ()>(2) }).await });
        for _ in 0..4 {
            tokio::task::yield_now().await;
        }

        slow.abort();
        assert_eq!(waiter.await.unwrap(), Ok(2));
        assert_eq!(inflight_len(&cache), 0);
        assert_eq!(cache.get(&"k"), Some(2));
    }

    #[test]
    fn evicts_least_recently_used() {
        let cache = TtlCache::new(2, Duration::from_secs(60));
        cache.set("a", 1);
        cache.set("b", 2);
        assert_eq!(cache.get(&"a"), Some(1));
        cache.set("c", 3);
        assert_eq!(cache.get(&"b"), None);
        assert_eq!(cache.get(&"a"), Some(1));
        assert_eq!(cache.get(&"c"), Some(3));
        assert_eq!(cache.len(), 2);
    }
}
