use futures::future::{BoxFuture, FutureExt, Shared};
use lru::LruCache;
use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use crate::metrics;
use crate::services::consumet::ApiError;

type SharedFetch<V> = Shared<BoxFuture<'static, Result<Arc<V>, ApiError>>>;

/// Cached value with absolute expiry (unix millis)
struct CachedEntry<V> {
    value: Arc<V>,
    expires_at: i64,
}

struct Inner<K: Hash + Eq, V> {
    entries: LruCache<K, CachedEntry<V>>,
    in_flight: HashMap<K, SharedFetch<V>>,
}

/// In-memory cache for upstream lookups
///
/// Successful results live for `ttl`, bounded by an LRU cap. Concurrent
/// lookups of a key that is already being fetched wait on the same request.
/// Failures are handed to every waiter and never stored.
pub struct RequestCache<K: Hash + Eq, V> {
    name: &'static str,
    ttl_ms: i64,
    inner: Arc<Mutex<Inner<K, V>>>,
}

impl<K, V> RequestCache<K, V>
where
    K: Hash + Eq + Clone + Send + 'static,
    V: Send + Sync + 'static,
{
    pub fn new(name: &'static str, ttl: Duration, max_entries: usize) -> Self {
        let capacity = NonZeroUsize::new(max_entries).unwrap_or(NonZeroUsize::MIN);
        Self {
            name,
            ttl_ms: ttl.as_millis() as i64,
            inner: Arc::new(Mutex::new(Inner {
                entries: LruCache::new(capacity),
                in_flight: HashMap::new(),
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner<K, V>> {
        // Critical sections never panic midway, so a poisoned lock is still consistent
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Return the cached value for `key`, or run `loader` once for all concurrent callers
    pub async fn get_or_fetch<F, Fut>(&self, key: K, loader: F) -> Result<Arc<V>, ApiError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, ApiError>> + Send + 'static,
    {
        let fetch = {
            let mut inner = self.lock();
            let now = chrono::Utc::now().timestamp_millis();

            let cached = inner
                .entries
                .get(&key)
                .map(|entry| (Arc::clone(&entry.value), entry.expires_at));
            match cached {
                Some((value, expires_at)) if expires_at > now => {
                    tracing::debug!(cache = self.name, "cache hit");
                    metrics::CACHE_LOOKUPS
                        .with_label_values(&[self.name, "hit"])
                        .inc();
                    return Ok(value);
                }
                Some(_) => {
                    inner.entries.pop(&key);
                }
                None => {}
            }

            if let Some(fetch) = inner.in_flight.get(&key) {
                tracing::debug!(cache = self.name, "joining in-flight request");
                metrics::CACHE_LOOKUPS
                    .with_label_values(&[self.name, "shared"])
                    .inc();
                fetch.clone()
            } else {
                metrics::CACHE_LOOKUPS
                    .with_label_values(&[self.name, "miss"])
                    .inc();
                let fetch = loader().map(|r| r.map(Arc::new)).boxed().shared();
                inner.in_flight.insert(key.clone(), fetch.clone());
                fetch
            }
        };

        let result = fetch.clone().await;

        // The first waiter to finish settles the entry; later ones find it gone
        let mut inner = self.lock();
        let owns_slot = inner
            .in_flight
            .get(&key)
            .map_or(false, |current| current.ptr_eq(&fetch));
        if owns_slot {
            inner.in_flight.remove(&key);
            if let Ok(value) = &result {
                let expires_at = chrono::Utc::now().timestamp_millis() + self.ttl_ms;
                inner.entries.put(
                    key,
                    CachedEntry {
                        value: Arc::clone(value),
                        expires_at,
                    },
                );
            }
        }

        result
    }

    /// Remove expired entries, returning how many were dropped
    pub fn purge_expired(&self) -> usize {
        let mut inner = self.lock();
        let now = chrono::Utc::now().timestamp_millis();
        let expired: Vec<K> = inner
            .entries
            .iter()
            .filter(|(_, entry)| entry.expires_at <= now)
            .map(|(key, _)| key.clone())
            .collect();

        for key in &expired {
            inner.entries.pop(key);
        }
        expired.len()
    }

    /// Number of stored entries (expired ones included until purged)
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting_loader(
        calls: &Arc<AtomicUsize>,
        value: &'static str,
    ) -> impl Future<Output = Result<String, ApiError>> + Send + 'static {
        let calls = Arc::clone(calls);
        async move {
            calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            Ok(value.to_string())
        }
    }

    #[tokio::test]
    async fn test_second_lookup_is_served_from_cache() {
        let cache: RequestCache<String, String> =
            RequestCache::new("test", Duration::from_secs(60), 10);
        let calls = Arc::new(AtomicUsize::new(0));

        let first = cache
            .get_or_fetch("ep-1".to_string(), || counting_loader(&calls, "a"))
            .await
            .unwrap();
        let second = cache
            .get_or_fetch("ep-1".to_string(), || counting_loader(&calls, "b"))
            .await
            .unwrap();

        assert_eq!(*first, "a");
        assert_eq!(*second, "a");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_lookups_share_one_fetch() {
        let cache: RequestCache<String, String> =
            RequestCache::new("test", Duration::from_secs(60), 10);
        let calls = Arc::new(AtomicUsize::new(0));

        let (a, b, c) = tokio::join!(
            cache.get_or_fetch("ep-1".to_string(), || counting_loader(&calls, "a")),
            cache.get_or_fetch("ep-1".to_string(), || counting_loader(&calls, "b")),
            cache.get_or_fetch("ep-2".to_string(), || counting_loader(&calls, "c")),
        );

        assert_eq!(*a.unwrap(), "a");
        assert_eq!(*b.unwrap(), "a");
        assert_eq!(*c.unwrap(), "c");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_errors_are_not_cached() {
        let cache: RequestCache<String, String> =
            RequestCache::new("test", Duration::from_secs(60), 10);

        let err = cache
            .get_or_fetch("ep-1".to_string(), || async { Err(ApiError::Timeout) })
            .await
            .unwrap_err();
        assert_eq!(err, ApiError::Timeout);
        assert_eq!(cache.len(), 0);

        let ok = cache
            .get_or_fetch("ep-1".to_string(), || async { Ok("fresh".to_string()) })
            .await
            .unwrap();
        assert_eq!(*ok, "fresh");
    }

    #[tokio::test]
    async fn test_expired_entries_are_refetched_and_purged() {
        let cache: RequestCache<String, String> = RequestCache::new("test", Duration::ZERO, 10);
        let calls = Arc::new(AtomicUsize::new(0));

        cache
            .get_or_fetch("ep-1".to_string(), || counting_loader(&calls, "a"))
            .await
            .unwrap();
        assert_eq!(cache.purge_expired(), 1);
        assert_eq!(cache.len(), 0);

        cache
            .get_or_fetch("ep-1".to_string(), || counting_loader(&calls, "a"))
            .await
            .unwrap();
        cache
            .get_or_fetch("ep-1".to_string(), || counting_loader(&calls, "a"))
            .await
            .unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_lru_cap_evicts_oldest() {
        let cache: RequestCache<u32, u32> = RequestCache::new("test", Duration::from_secs(60), 2);
        let calls = Arc::new(AtomicUsize::new(0));
        for key in [0u32, 1, 2, 2, 1] {
            let calls = calls.clone();
            cache
                .get_or_fetch(key, move || async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(key)
                })
                .await
                .unwrap();
        }
        assert_eq!(cache.len(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 3);

        // 0 was evicted when 2 arrived
        let calls_before = calls.load(Ordering::SeqCst);
        let calls_again = calls.clone();
        cache
            .get_or_fetch(0, move || async move {
                calls_again.fetch_add(1, Ordering::SeqCst);
                Ok(0)
            })
            .await
            .unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), calls_before + 1);
    }
}
