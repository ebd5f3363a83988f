//! Main endpoint client implementation.
//!
//! Provides [`Endpoint`], an HTTP client that runs every request through the
//! request interceptor, announces it on the endpoint's [`EventBus`], sends it
//! with `reqwest` and, for cacheable GET requests, serves and stores responses
//! through the configured cache driver.
//!
//! # Examples
//!
//! ## Simple GET request
//!
//! ```ignore
//! use endpoint_http::Endpoint;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let endpoint = Endpoint::new("https://api.example.com");
//!     let response = endpoint.get("/users").await?;
//!     println!("Status: {}", response.status);
//!     Ok(())
//! }
//! ```
//!
//! ## Cached GET with query parameters
//!
//! ```ignore
//! use endpoint_http::cache::MemoryCacheDriver;
//! use endpoint_http::client::{CacheOptions, EndpointConfig};
//! use endpoint_http::{Endpoint, RequestOptions};
//! use serde_json::json;
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! let config = EndpointConfig::new("https://api.example.com").with_cache(
//!     CacheOptions::new(Arc::new(MemoryCacheDriver::default()))
//!         .expires_after(Duration::from_secs(300)),
//! );
//! let endpoint = Endpoint::with_config(config);
//!
//! // Second call is served from the cache
//! endpoint.get_with("/users", Some(json!({ "page": 1 })), RequestOptions::new()).await?;
//! endpoint.get_with("/users", Some(json!({ "page": 1 })), RequestOptions::new()).await?;
//! ```
//!
//! ## Cancelling the latest request
//!
//! ```ignore
//! let pending = tokio::spawn({
//!     let endpoint = endpoint.clone();
//!     async move { endpoint.get("/slow").await }
//! });
//!
//! if let Some(handle) = endpoint.last_request() {
//!     handle.abort();
//! }
//! assert!(pending.await?.unwrap_err().is_aborted());
//! ```

use crate::cache::{cache_key, CacheDriver};
use crate::client::cancel::{CancelHandle, LastRequest};
use crate::client::config::{ConfigOverrides, EndpointConfig};
use crate::client::interceptor;
use crate::error::{EndpointError, Result};
use crate::events::EventBus;
use crate::types::{Request, RequestBody, RequestOptions, Response};
use http::Method;
use parking_lot::RwLock;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

struct State {
    config: Arc<EndpointConfig>,
    client: reqwest::Client,
}

/// Where a cacheable GET is looked up and stored.
struct CacheTarget {
    driver: Arc<dyn CacheDriver>,
    key: String,
    ttl: Duration,
}

impl CacheTarget {
    /// Report a driver failure as [`EndpointError::Cache`].
    fn driver_error(&self, err: EndpointError) -> EndpointError {
        match err {
            EndpointError::Cache(_) => err,
            other => EndpointError::Cache(format!("{} driver: {}", self.driver.name(), other)),
        }
    }
}

/// The endpoint HTTP client
///
/// Cloning is cheap and every clone shares configuration, event listeners and
/// the last-request slot.
///
/// # Features
///
/// - PUT-to-POST rewriting with a marker field
/// - JSON and multipart body encoding
/// - Authorization header injection
/// - Lifecycle events (`sending`, `complete`, `success`, `error`)
/// - Cache-aside for GET requests
/// - Cancellation of the most recent request
#[derive(Clone)]
pub struct Endpoint {
    id: Uuid,
    state: Arc<RwLock<State>>,
    events: EventBus,
    last_request: Arc<LastRequest>,
}

impl Endpoint {
    /// Create an endpoint for `base_url` with default configuration
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_config(EndpointConfig::new(base_url))
    }

    /// Create an endpoint with custom configuration
    pub fn with_config(config: EndpointConfig) -> Self {
        let client = build_client(&config);

        Endpoint {
            id: Uuid::new_v4(),
            state: Arc::new(RwLock::new(State {
                config: Arc::new(config),
                client,
            })),
            events: EventBus::new(),
            last_request: Arc::new(LastRequest::default()),
        }
    }

    /// Unique id of this endpoint, used in log output.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Snapshot of the current configuration.
    pub fn config(&self) -> Arc<EndpointConfig> {
        self.state.read().config.clone()
    }

    /// Replace the configuration.
    pub fn set_config(&self, config: EndpointConfig) {
        let client = build_client(&config);
        let mut state = self.state.write();
        state.config = Arc::new(config);
        state.client = client;
    }

    /// Merge `overrides` into the current configuration.
    pub fn configure(&self, overrides: ConfigOverrides) {
        let config = self.config().merged(overrides);
        self.set_config(config);
    }

    /// Edit a copy of the current configuration and install it.
    ///
    /// ```
    /// use endpoint_http::Endpoint;
    ///
    /// let endpoint = Endpoint::new("https://api.example.com");
    /// endpoint.update_config(|config| {
    ///     config.put_to_post = true;
    ///     config.default_headers.insert("X-Locale".into(), "en".into());
    /// });
    /// assert!(endpoint.config().put_to_post);
    /// ```
    pub fn update_config<F>(&self, f: F)
    where
        F: FnOnce(&mut EndpointConfig),
    {
        let mut config = EndpointConfig::clone(&self.config());
        f(&mut config);
        self.set_config(config);
    }

    /// The endpoint's event bus.
    ///
    /// # Examples
    /// ```ignore
    /// let _subscription = endpoint.events().on_error(|err| {
    ///     eprintln!("request failed: {}", err);
    /// });
    /// ```
    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// Handle of the most recently dispatched request that has not settled.
    pub fn last_request(&self) -> Option<CancelHandle> {
        self.last_request.get()
    }

    /// Abort the most recently dispatched request. Returns whether one was
    /// in flight.
    pub fn abort_last_request(&self) -> bool {
        match self.last_request() {
            Some(handle) => {
                handle.abort();
                true
            }
            None => false,
        }
    }

    /// GET `path`
    pub async fn get(&self, path: &str) -> Result<Response> {
        self.request(Request::get(path)).await
    }

    /// GET `path` with query parameters and per-call options
    pub async fn get_with(
        &self,
        path: &str,
        params: Option<Value>,
        options: RequestOptions,
    ) -> Result<Response> {
        let mut request = Request::get(path).with_options(options);
        request.params = params;
        self.request(request).await
    }

    /// POST `body` to `path`
    pub async fn post(&self, path: &str, body: impl Into<RequestBody>) -> Result<Response> {
        self.request(Request::new(Method::POST, path).with_body(body))
            .await
    }

    /// PUT `body` to `path`
    pub async fn put(&self, path: &str, body: impl Into<RequestBody>) -> Result<Response> {
        self.request(Request::new(Method::PUT, path).with_body(body))
            .await
    }

    /// PATCH `path` with `body`
    pub async fn patch(&self, path: &str, body: impl Into<RequestBody>) -> Result<Response> {
        self.request(Request::new(Method::PATCH, path).with_body(body))
            .await
    }

    /// DELETE `path`
    pub async fn delete(&self, path: &str) -> Result<Response> {
        self.request(Request::new(Method::DELETE, path)).await
    }

    /// Send a request
    ///
    /// Cacheable GET requests are answered from the cache when a live entry
    /// exists; otherwise the request goes through the interceptors and, on
    /// success, is stored in the cache.
    ///
    /// # Arguments
    ///
    /// * `request` - The request descriptor
    ///
    /// # Errors
    ///
    /// - [`EndpointError::Status`](crate::EndpointError::Status) for non-2xx responses
    /// - [`EndpointError::Aborted`](crate::EndpointError::Aborted) if the request was cancelled
    /// - [`EndpointError::Http`](crate::EndpointError::Http) for transport failures
    /// - [`EndpointError::Cache`](crate::EndpointError::Cache) if the cache driver fails
    pub async fn request(&self, request: Request) -> Result<Response> {
        let (config, client) = {
            let state = self.state.read();
            (state.config.clone(), state.client.clone())
        };

        let cache = cache_target(&config, &request);

        if let Some(target) = &cache {
            let hit = target
                .driver
                .get(&target.key)
                .await
                .map_err(|e| target.driver_error(e))?;
            if let Some(hit) = hit {
                if config.enable_logging {
                    tracing::debug!(endpoint = %self.id, key = %target.key, "cache hit");
                }
                return Ok(Response::from(hit));
            }
            if config.enable_logging {
                tracing::debug!(endpoint = %self.id, key = %target.key, "cache miss");
            }
        }

        let response = self.dispatch(&config, &client, request).await?;

        if let Some(target) = cache {
            target
                .driver
                .set(&target.key, response.to_cached(), target.ttl)
                .await
                .map_err(|e| target.driver_error(e))?;
        }

        Ok(response)
    }

    /// Run the interceptors around one network call.
    async fn dispatch(
        &self,
        config: &EndpointConfig,
        client: &reqwest::Client,
        request: Request,
    ) -> Result<Response> {
        let outgoing = interceptor::prepare(config, request)?;
        let signal = outgoing.signal.clone();

        let tracked = self.last_request.track(&signal);

        if config.enable_logging {
            tracing::debug!(
                endpoint = %self.id,
                request = %signal.id(),
                method = %outgoing.method,
                url = %outgoing.url,
                "sending request"
            );
        }
        self.events.emit_sending(&outgoing);

        let result = interceptor::send(client, &outgoing, &signal).await;

        drop(tracked);

        if config.enable_logging {
            match &result {
                Ok(response) => tracing::debug!(
                    endpoint = %self.id,
                    request = %signal.id(),
                    status = response.status,
                    "request completed"
                ),
                Err(e) => tracing::warn!(
                    endpoint = %self.id,
                    request = %signal.id(),
                    url = %outgoing.url,
                    "request failed: {}",
                    e
                ),
            }
        }

        self.events.emit_settled(result.as_ref());

        result
    }
}

impl fmt::Debug for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Endpoint")
            .field("id", &self.id)
            .field("config", &self.config())
            .field("events", &self.events)
            .finish()
    }
}

/// Cache location for `request`, if it is a cacheable GET.
fn cache_target(config: &EndpointConfig, request: &Request) -> Option<CacheTarget> {
    if request.method != Method::GET {
        return None;
    }

    let enabled = match request.options.cache {
        Some(enabled) => enabled,
        None => config.cache,
    };
    if !enabled {
        return None;
    }

    let options = config.cache_options.as_ref()?;

    Some(CacheTarget {
        driver: options.driver.clone(),
        key: cache_key(&config.base_url, &request.path, request.params.as_ref()),
        ttl: request
            .options
            .cache_expires_after
            .unwrap_or(options.expires_after),
    })
}

fn build_client(config: &EndpointConfig) -> reqwest::Client {
    let mut builder = reqwest::Client::builder()
        .timeout(config.request_timeout())
        .pool_idle_timeout(Duration::from_secs(90))
        .pool_max_idle_per_host(config.max_total_connections as usize);

    if !config.proxy_url.is_empty() {
        match reqwest::Proxy::all(&config.proxy_url) {
            Ok(proxy) => builder = builder.proxy(proxy),
            Err(e) => tracing::warn!("ignoring invalid proxy URL {}: {}", config.proxy_url, e),
        }
    }

    builder.build().unwrap_or_else(|e| {
        tracing::warn!("falling back to default HTTP client: {}", e);
        reqwest::Client::new()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCacheDriver;
    use crate::client::config::CacheOptions;
    use crate::types::CachedResponse;
    use async_trait::async_trait;
    use serde_json::json;

    struct UnreachableDriver;

    #[async_trait]
    impl CacheDriver for UnreachableDriver {
        async fn get(&self, _key: &str) -> Result<Option<CachedResponse>> {
            Err(EndpointError::InvalidHeader("connection refused".to_string()))
        }

        async fn set(&self, _key: &str, _value: CachedResponse, _ttl: Duration) -> Result<()> {
            Err(EndpointError::Cache("read-only".to_string()))
        }

        async fn remove(&self, _key: &str) -> Result<bool> {
            Ok(false)
        }

        async fn clear(&self) -> Result<()> {
            Ok(())
        }

        fn name(&self) -> &str {
            "unreachable"
        }
    }

    fn cached_config() -> EndpointConfig {
        EndpointConfig::new("http://localhost")
            .with_cache(CacheOptions::new(Arc::new(MemoryCacheDriver::default())))
    }

    #[test]
    fn test_endpoint_creation() {
        let endpoint = Endpoint::new("http://localhost");
        assert_eq!(endpoint.config().base_url, "http://localhost");
        assert!(endpoint.last_request().is_none());
        assert!(!endpoint.abort_last_request());
    }

    #[test]
    fn test_clones_share_state() {
        let endpoint = Endpoint::new("http://localhost");
        let clone = endpoint.clone();
        clone.configure(ConfigOverrides {
            put_to_post: Some(true),
            ..Default::default()
        });
        assert!(endpoint.config().put_to_post);
        assert_eq!(endpoint.id(), clone.id());
    }

    #[test]
    fn test_update_config_keeps_other_fields() {
        let endpoint = Endpoint::with_config(cached_config());
        endpoint.update_config(|config| config.request_timeout_ms = 1_000);

        let config = endpoint.config();
        assert_eq!(config.request_timeout_ms, 1_000);
        assert!(config.cache);
        assert!(config.cache_options.is_some());
    }

    #[test]
    fn test_cache_target_only_for_get() {
        let config = cached_config();
        let post = Request::new(Method::POST, "/users");
        assert!(cache_target(&config, &post).is_none());
        assert!(cache_target(&config, &Request::get("/users")).is_some());
    }

    #[test]
    fn test_cache_target_per_call_overrides() {
        let mut config = cached_config();

        let disabled = Request::get("/users").with_options(RequestOptions::new().with_cache(false));
        assert!(cache_target(&config, &disabled).is_none());

        config.cache = false;
        assert!(cache_target(&config, &Request::get("/users")).is_none());

        let forced = Request::get("/users").with_options(
            RequestOptions::new()
                .with_cache(true)
                .with_cache_expires_after(Duration::from_secs(5)),
        );
        let target = cache_target(&config, &forced).unwrap();
        assert_eq!(target.ttl, Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_cache_driver_failure_is_cache_error() {
        let endpoint = Endpoint::with_config(
            EndpointConfig::new("http://localhost")
                .with_cache(CacheOptions::new(Arc::new(UnreachableDriver))),
        );

        match endpoint.get("/users").await {
            Err(EndpointError::Cache(message)) => {
                assert!(message.starts_with("unreachable driver:"), "{}", message);
                assert!(message.contains("connection refused"));
            }
            other => panic!("expected cache error, got {:?}", other),
        }
        assert!(endpoint.last_request().is_none());
    }

    #[test]
    fn test_driver_error_keeps_cache_errors() {
        let target = CacheTarget {
            driver: Arc::new(UnreachableDriver),
            key: "k".to_string(),
            ttl: Duration::from_secs(1),
        };
        match target.driver_error(EndpointError::Cache("read-only".to_string())) {
            EndpointError::Cache(message) => assert_eq!(message, "read-only"),
            other => panic!("expected cache error, got {:?}", other),
        }
    }

    #[test]
    fn test_cache_target_requires_driver() {
        let config = EndpointConfig {
            cache: true,
            ..EndpointConfig::new("http://localhost")
        };
        assert!(cache_target(&config, &Request::get("/users")).is_none());
    }

    #[test]
    fn test_cache_target_key_includes_params() {
        let config = cached_config();
        let a = cache_target(&config, &Request::get("/users").with_params(json!({ "page": 1 })))
            .unwrap();
        let b = cache_target(&config, &Request::get("/users").with_params(json!({ "page": 2 })))
            .unwrap();
        assert_ne!(a.key, b.key);
    }
}
