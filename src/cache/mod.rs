//! Response caching for GET requests.
//!
//! The endpoint implements cache-aside on top of a pluggable [`CacheDriver`]:
//! a cacheable GET first looks its key up in the driver, and only on a miss
//! goes to the network, storing the successful response afterwards.
//!
//! Keys are built by [`cache_key`] from the base URL, the request path and the
//! JSON-serialized query parameters, so the same path with different
//! parameters caches separately.
//!
//! # Drivers
//!
//! | Driver | Description |
//! |--------|-------------|
//! | [`MemoryCacheDriver`] | In-process LRU with per-entry expiry |
//! | custom | Implement [`CacheDriver`] for Redis, disk, ... |

mod memory;

pub use memory::MemoryCacheDriver;

use crate::error::Result;
use crate::types::CachedResponse;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

/// Storage for cached responses.
///
/// Implementations must never return an entry whose `ttl` has elapsed.
#[async_trait]
pub trait CacheDriver: Send + Sync {
    /// Look up a live entry.
    async fn get(&self, key: &str) -> Result<Option<CachedResponse>>;

    /// Store `value` under `key` for `ttl`.
    async fn set(&self, key: &str, value: CachedResponse, ttl: Duration) -> Result<()>;

    /// Remove the entry under `key`, returning whether one existed.
    async fn remove(&self, key: &str) -> Result<bool>;

    /// Remove every entry.
    async fn clear(&self) -> Result<()>;

    /// Driver name, for logs.
    fn name(&self) -> &str {
        "cache"
    }
}

#[async_trait]
impl<T: CacheDriver + ?Sized> CacheDriver for Arc<T> {
    async fn get(&self, key: &str) -> Result<Option<CachedResponse>> {
        (**self).get(key).await
    }

    async fn set(&self, key: &str, value: CachedResponse, ttl: Duration) -> Result<()> {
        (**self).set(key, value, ttl).await
    }

    async fn remove(&self, key: &str) -> Result<bool> {
        (**self).remove(key).await
    }

    async fn clear(&self) -> Result<()> {
        (**self).clear().await
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

/// Build the cache key for a GET request.
///
/// The key is the concatenation of the base URL, the path and the JSON text of
/// the query parameters (empty when there are none).
///
/// # Examples
///
/// ```
/// use endpoint_http::cache::cache_key;
/// use serde_json::json;
///
/// let a = cache_key("https://api.example.com", "/users", Some(&json!({ "page": 1 })));
/// let b = cache_key("https://api.example.com", "/users", Some(&json!({ "page": 2 })));
/// assert_ne!(a, b);
/// assert_eq!(a, r#"https://api.example.com/users{"page":1}"#);
/// ```
pub fn cache_key(base_url: &str, path: &str, params: Option<&Value>) -> String {
    let params = match params {
        Some(Value::Null) | None => String::new(),
        Some(params) => params.to_string(),
    };
    format!("{}{}{}", base_url, path, params)
}
