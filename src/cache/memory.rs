//! In-process cache driver.

use super::CacheDriver;
use crate::error::Result;
use crate::types::CachedResponse;
use async_trait::async_trait;
use lru::LruCache;
use parking_lot::Mutex;
use std::num::NonZeroUsize;
use std::time::{Duration, Instant};

const DEFAULT_CAPACITY: usize = 1024;

#[derive(Debug, Clone)]
struct Entry {
    value: CachedResponse,
    /// `None` when the TTL is too large to represent as an `Instant`
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        match self.expires_at {
            Some(expires_at) => expires_at > now,
            None => true,
        }
    }
}

/// LRU cache with per-entry expiry.
///
/// When full, the least recently used entry is evicted. Expired entries are
/// dropped on the first read that finds them.
///
/// # Examples
///
/// ```
/// use endpoint_http::cache::{CacheDriver, MemoryCacheDriver};
/// use endpoint_http::CachedResponse;
/// use std::collections::BTreeMap;
/// use std::time::Duration;
///
/// # tokio_test::block_on(async {
/// let driver = MemoryCacheDriver::new(16);
/// let value = CachedResponse { status: 200, headers: BTreeMap::new(), body: "ok".into() };
///
/// driver.set("key", value.clone(), Duration::from_secs(60)).await.unwrap();
/// assert_eq!(driver.get("key").await.unwrap(), Some(value));
/// # });
/// ```
#[derive(Debug)]
pub struct MemoryCacheDriver {
    entries: Mutex<LruCache<String, Entry>>,
}

impl MemoryCacheDriver {
    /// Create a driver holding at most `capacity` entries (minimum 1).
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        MemoryCacheDriver {
            entries: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Number of stored entries, including expired ones not yet read.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Whether the driver holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

impl Default for MemoryCacheDriver {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

#[async_trait]
impl CacheDriver for MemoryCacheDriver {
    async fn get(&self, key: &str) -> Result<Option<CachedResponse>> {
        let mut entries = self.entries.lock();
        let expired = match entries.get(key) {
            None => return Ok(None),
            Some(entry) if entry.is_live(Instant::now()) => {
                return Ok(Some(entry.value.clone()));
            }
            Some(_) => true,
        };
        if expired {
            entries.pop(key);
        }
        Ok(None)
    }

    async fn set(&self, key: &str, value: CachedResponse, ttl: Duration) -> Result<()> {
        let expires_at = Instant::now().checked_add(ttl);
        self.entries
            .lock()
            .put(key.to_string(), Entry { value, expires_at });
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<bool> {
        Ok(self.entries.lock().pop(key).is_some())
    }

    async fn clear(&self) -> Result<()> {
        self.entries.lock().clear();
        Ok(())
    }

    fn name(&self) -> &str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use std::collections::BTreeMap;

    fn snapshot(body: &'static str) -> CachedResponse {
        CachedResponse {
            status: 200,
            headers: BTreeMap::new(),
            body: Bytes::from_static(body.as_bytes()),
        }
    }

    #[tokio::test]
    async fn test_get_missing() {
        let driver = MemoryCacheDriver::default();
        assert!(driver.get("nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_expired_entry_is_not_returned() {
        let driver = MemoryCacheDriver::new(4);
        driver
            .set("k", snapshot("a"), Duration::from_millis(20))
            .await
            .unwrap();
        assert!(driver.get("k").await.unwrap().is_some());

        tokio::time::sleep(Duration::from_millis(40)).await;

        assert!(driver.get("k").await.unwrap().is_none());
        assert!(driver.is_empty());
    }

    #[tokio::test]
    async fn test_zero_ttl_never_hits() {
        let driver = MemoryCacheDriver::new(4);
        driver.set("k", snapshot("a"), Duration::ZERO).await.unwrap();
        assert!(driver.get("k").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_max_ttl_never_expires() {
        let driver = MemoryCacheDriver::new(4);
        driver.set("k", snapshot("a"), Duration::MAX).await.unwrap();
        assert_eq!(driver.get("k").await.unwrap(), Some(snapshot("a")));
    }

    #[tokio::test]
    async fn test_lru_eviction() {
        let driver = MemoryCacheDriver::new(2);
        let ttl = Duration::from_secs(60);
        driver.set("a", snapshot("a"), ttl).await.unwrap();
        driver.set("b", snapshot("b"), ttl).await.unwrap();
        driver.get("a").await.unwrap();
        driver.set("c", snapshot("c"), ttl).await.unwrap();

        assert!(driver.get("a").await.unwrap().is_some());
        assert!(driver.get("b").await.unwrap().is_none());
        assert!(driver.get("c").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_remove_and_clear() {
        let driver = MemoryCacheDriver::new(4);
        let ttl = Duration::from_secs(60);
        driver.set("a", snapshot("a"), ttl).await.unwrap();
        driver.set("b", snapshot("b"), ttl).await.unwrap();

        assert!(driver.remove("a").await.unwrap());
        assert!(!driver.remove("a").await.unwrap());

        driver.clear().await.unwrap();
        assert_eq!(driver.len(), 0);
    }
}
