//! Response caching for the connection adapter.
//!
//! The connection never owns cache storage or eviction itself; it talks to a
//! [`ResponseCache`] capability. Hosts with their own cache facility
//! implement the trait, everyone else gets the in-process [`MemoryCache`].

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use moka::Expiry;
use moka::future::Cache;
use serde_json::Value;

use crate::error::WeatherError;

/// Deterministic key derived from an operation name and its resolved call
/// parameters.
///
/// The credential is deliberately not part of the key: two connections with
/// different AppIDs sharing one cache can observe each other's entries.
/// Callers that need isolation should give each connection its own cache.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn new(operation: &str, components: &[&str]) -> Self {
        // "|" keeps adjacent components from running into each other.
        CacheKey(format!("{operation}|{}", components.join("|")))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Future produced by a [`Compute`] closure.
pub type ComputeFuture = Pin<Box<dyn Future<Output = Result<Value, WeatherError>> + Send>>;

/// Deferred fetch, run only when the cache holds no live entry for the key.
pub type Compute = Box<dyn FnOnce() -> ComputeFuture + Send>;

/// Injected caching capability.
#[async_trait]
pub trait ResponseCache: Send + Sync + fmt::Debug {
    /// Returns the cached value for `key`, or runs `compute` and stores the
    /// result for `ttl`. `None` defers to the implementation's default
    /// retention policy.
    ///
    /// Implementations must run `compute` at most once per key at a time;
    /// concurrent callers with the same key wait for the winner's result.
    /// Failed computations are not stored.
    async fn get_or_compute(
        &self,
        key: CacheKey,
        ttl: Option<Duration>,
        compute: Compute,
    ) -> Result<Value, WeatherError>;
}

const DEFAULT_MAX_ENTRIES: u64 = 1024;

#[derive(Debug, Clone)]
struct CacheEntry {
    body: Value,
    ttl: Option<Duration>,
}

/// Reads each entry's time-to-live from the entry itself; entries cached
/// without one never expire on their own and only leave through eviction.
struct PerEntryTtl;

impl Expiry<CacheKey, CacheEntry> for PerEntryTtl {
    fn expire_after_create(
        &self,
        _key: &CacheKey,
        entry: &CacheEntry,
        _created_at: Instant,
    ) -> Option<Duration> {
        entry.ttl
    }
}

/// In-process [`ResponseCache`] backed by a moka future cache.
///
/// `try_get_with` provides the at-most-one-computation-per-key guarantee:
/// concurrent lookups of the same key share a single in-flight fetch.
#[derive(Clone)]
pub struct MemoryCache {
    inner: Cache<CacheKey, CacheEntry>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::with_max_entries(DEFAULT_MAX_ENTRIES)
    }

    pub fn with_max_entries(max_entries: u64) -> Self {
        let inner = Cache::builder()
            .max_capacity(max_entries)
            .expire_after(PerEntryTtl)
            .build();

        Self { inner }
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for MemoryCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryCache")
            .field("entries", &self.inner.entry_count())
            .finish()
    }
}

#[async_trait]
impl ResponseCache for MemoryCache {
    async fn get_or_compute(
        &self,
        key: CacheKey,
        ttl: Option<Duration>,
        compute: Compute,
    ) -> Result<Value, WeatherError> {
        let entry = self
            .inner
            .try_get_with(key, async move {
                let body = compute().await?;
                Ok::<_, WeatherError>(CacheEntry { body, ttl })
            })
            .await;

        match entry {
            Ok(entry) => Ok(entry.body),
            Err(shared) => Err(Arc::try_unwrap(shared)
                .unwrap_or_else(|e| WeatherError::Cache(e.to_string()))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting_compute(counter: Arc<AtomicUsize>, value: Value) -> Compute {
        Box::new(move || {
            Box::pin(async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(value)
            })
        })
    }

    fn failing_compute() -> Compute {
        Box::new(|| Box::pin(async { Err(WeatherError::Cache("boom".to_string())) }))
    }

    #[test]
    fn cache_key_is_deterministic() {
        let a = CacheKey::new("current", &["q:London", "metric", "en"]);
        let b = CacheKey::new("current", &["q:London", "metric", "en"]);
        assert_eq!(a, b);
    }

    #[test]
    fn cache_key_differs_per_component() {
        let a = CacheKey::new("current", &["q:London", "metric", "en"]);
        let b = CacheKey::new("current", &["q:London", "imperial", "en"]);
        let c = CacheKey::new("forecast", &["q:London", "metric", "en"]);
        assert_ne!(a, b);
        assert_ne!(a, c);
    }

    #[tokio::test]
    async fn computes_once_per_key() {
        let cache = MemoryCache::new();
        let counter = Arc::new(AtomicUsize::new(0));
        let key = CacheKey::new("current", &["q:London"]);

        let first = cache
            .get_or_compute(
                key.clone(),
                Some(Duration::from_secs(60)),
                counting_compute(counter.clone(), json!({"cod": 200})),
            )
            .await
            .expect("first call should compute");

        let second = cache
            .get_or_compute(
                key,
                Some(Duration::from_secs(60)),
                counting_compute(counter.clone(), json!({"cod": 500})),
            )
            .await
            .expect("second call should hit the cache");

        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert_eq!(first, second);
        assert_eq!(second["cod"], 200);
    }

    #[tokio::test]
    async fn distinct_keys_compute_separately() {
        let cache = MemoryCache::new();
        let counter = Arc::new(AtomicUsize::new(0));

        for city in ["q:London", "q:Kyiv"] {
            cache
                .get_or_compute(
                    CacheKey::new("current", &[city]),
                    None,
                    counting_compute(counter.clone(), json!({})),
                )
                .await
                .expect("computation should succeed");
        }

        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn entry_expires_after_its_ttl() {
        let cache = MemoryCache::new();
        let counter = Arc::new(AtomicUsize::new(0));
        let key = CacheKey::new("current", &["q:London"]);

        for _ in 0..2 {
            cache
                .get_or_compute(
                    key.clone(),
                    Some(Duration::from_millis(100)),
                    counting_compute(counter.clone(), json!({})),
                )
                .await
                .expect("computation should succeed");
        }
        assert_eq!(counter.load(Ordering::SeqCst), 1);

        tokio::time::sleep(Duration::from_millis(500)).await;

        cache
            .get_or_compute(
                key,
                Some(Duration::from_millis(100)),
                counting_compute(counter.clone(), json!({})),
            )
            .await
            .expect("computation should succeed");

        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn failed_computation_is_not_stored() {
        let cache = MemoryCache::new();
        let counter = Arc::new(AtomicUsize::new(0));
        let key = CacheKey::new("current", &["q:Nowhere"]);

        let err = cache
            .get_or_compute(key.clone(), None, failing_compute())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("boom"));

        cache
            .get_or_compute(key, None, counting_compute(counter.clone(), json!({})))
            .await
            .expect("retry should compute fresh");

        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }
}
