//! Endpoint configuration.
//!
//! [`EndpointConfig`] holds every setting the endpoint consults while
//! transforming and dispatching requests. Plain settings deserialize with
//! `serde`, so a config can be loaded from JSON and then completed at runtime
//! with the pieces that cannot be serialized (cache driver, authorization
//! supplier, form serializer):
//!
//! ```
//! use endpoint_http::client::{Authorization, EndpointConfig};
//!
//! let mut config: EndpointConfig = serde_json::from_str(
//!     r#"{ "base_url": "https://api.example.com", "put_to_post": true }"#,
//! ).unwrap();
//! config.authorization = Some(Authorization::bearer("secret"));
//!
//! assert_eq!(config.put_method_key, "_method");
//! assert!(config.put_to_post);
//! ```

use crate::cache::CacheDriver;
use crate::protocol;
use crate::types::{FormData, OutgoingRequest};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Default field name carrying the original method when PUT is sent as POST.
pub const DEFAULT_PUT_METHOD_KEY: &str = "_method";

/// Default cache entry lifetime.
pub const DEFAULT_CACHE_EXPIRY: Duration = Duration::from_secs(60 * 60);

/// Custom form-to-JSON serializer.
pub type FormSerializer = Arc<dyn Fn(&FormData) -> Value + Send + Sync>;

/// Source of the `Authorization` header.
#[derive(Clone)]
pub enum Authorization {
    /// Fixed header value
    Static(String),
    /// Header value computed per request
    Dynamic(Arc<dyn Fn(&OutgoingRequest) -> String + Send + Sync>),
}

impl Authorization {
    /// Fixed header value, sent verbatim.
    pub fn new(value: impl Into<String>) -> Self {
        Authorization::Static(value.into())
    }

    /// `Bearer <token>`
    pub fn bearer(token: impl AsRef<str>) -> Self {
        Authorization::Static(protocol::format_bearer(token.as_ref()))
    }

    /// `Basic <base64(user:password)>`
    pub fn basic(user: impl AsRef<str>, password: impl AsRef<str>) -> Self {
        Authorization::Static(protocol::format_basic(user.as_ref(), password.as_ref()))
    }

    /// Header value computed from the outgoing request.
    pub fn from_fn<F>(f: F) -> Self
    where
        F: Fn(&OutgoingRequest) -> String + Send + Sync + 'static,
    {
        Authorization::Dynamic(Arc::new(f))
    }

    pub(crate) fn resolve(&self, request: &OutgoingRequest) -> String {
        match self {
            Authorization::Static(value) => value.clone(),
            Authorization::Dynamic(f) => f(request),
        }
    }
}

impl fmt::Debug for Authorization {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Authorization::Static(_) => f.write_str("Authorization::Static(..)"),
            Authorization::Dynamic(_) => f.write_str("Authorization::Dynamic(..)"),
        }
    }
}

/// Cache driver and default expiry for cacheable GET requests.
#[derive(Clone)]
pub struct CacheOptions {
    /// Storage for cached responses
    pub driver: Arc<dyn CacheDriver>,
    /// Lifetime of stored entries
    pub expires_after: Duration,
}

impl CacheOptions {
    /// Use `driver` with the default one hour expiry.
    pub fn new(driver: Arc<dyn CacheDriver>) -> Self {
        CacheOptions {
            driver,
            expires_after: DEFAULT_CACHE_EXPIRY,
        }
    }

    /// Set the entry lifetime.
    pub fn expires_after(mut self, ttl: Duration) -> Self {
        self.expires_after = ttl;
        self
    }
}

impl fmt::Debug for CacheOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheOptions")
            .field("driver", &self.driver.name())
            .field("expires_after", &self.expires_after)
            .finish()
    }
}

/// Endpoint configuration.
///
/// # Examples
///
/// ```
/// use endpoint_http::client::EndpointConfig;
///
/// let config = EndpointConfig {
///     base_url: "https://api.example.com".to_string(),
///     put_to_post: true,
///     ..Default::default()
/// };
/// assert_eq!(config.request_timeout_ms, 30_000);
/// ```
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EndpointConfig {
    /// Prefix for every relative request path
    pub base_url: String,

    /// Send PUT requests as POST with a `put_method_key = "PUT"` field
    pub put_to_post: bool,

    /// Field name of the PUT marker
    pub put_method_key: String,

    /// Cache GET requests by default
    pub cache: bool,

    /// Cache driver and expiry; caching is inactive without it
    #[serde(skip)]
    pub cache_options: Option<CacheOptions>,

    /// Value for the `Authorization` header when the request has none
    #[serde(skip)]
    pub authorization: Option<Authorization>,

    /// Send form bodies as JSON objects instead of multipart
    pub form_data_to_json: bool,

    /// Replaces [`FormData::to_json`] when `form_data_to_json` is set
    #[serde(skip)]
    pub form_data_serializer: Option<FormSerializer>,

    /// Headers added to every request; per-request headers win
    pub default_headers: BTreeMap<String, String>,

    /// Client-wide request timeout
    pub request_timeout_ms: u64,

    /// Proxy for all requests; empty for none
    pub proxy_url: String,

    /// Idle connections kept per host
    pub max_total_connections: u32,

    /// Emit `tracing` events for requests
    pub enable_logging: bool,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        EndpointConfig {
            base_url: String::new(),
            put_to_post: false,
            put_method_key: DEFAULT_PUT_METHOD_KEY.to_string(),
            cache: false,
            cache_options: None,
            authorization: None,
            form_data_to_json: false,
            form_data_serializer: None,
            default_headers: BTreeMap::new(),
            request_timeout_ms: 30_000,
            proxy_url: String::new(),
            max_total_connections: 100,
            enable_logging: true,
        }
    }
}

impl EndpointConfig {
    /// Default config with the given base URL.
    pub fn new(base_url: impl Into<String>) -> Self {
        EndpointConfig {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    /// Enable PUT-to-POST rewriting.
    pub fn with_put_to_post(mut self, enabled: bool) -> Self {
        self.put_to_post = enabled;
        self
    }

    /// Enable caching of GET requests with the given driver.
    pub fn with_cache(mut self, options: CacheOptions) -> Self {
        self.cache = true;
        self.cache_options = Some(options);
        self
    }

    /// Set the authorization supplier.
    pub fn with_authorization(mut self, authorization: Authorization) -> Self {
        self.authorization = Some(authorization);
        self
    }

    /// Add a default header.
    pub fn with_default_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.default_headers.insert(name.into(), value.into());
        self
    }

    /// Apply the set fields of `overrides` on top of this config.
    pub fn merge(&mut self, overrides: ConfigOverrides) {
        let ConfigOverrides {
            base_url,
            put_to_post,
            put_method_key,
            cache,
            cache_options,
            authorization,
            form_data_to_json,
            default_headers,
            request_timeout_ms,
            proxy_url,
            max_total_connections,
            enable_logging,
        } = overrides;

        if let Some(v) = base_url {
            self.base_url = v;
        }
        if let Some(v) = put_to_post {
            self.put_to_post = v;
        }
        if let Some(v) = put_method_key {
            self.put_method_key = v;
        }
        if let Some(v) = cache {
            self.cache = v;
        }
        if let Some(v) = cache_options {
            self.cache_options = Some(v);
        }
        if let Some(v) = authorization {
            self.authorization = Some(v);
        }
        if let Some(v) = form_data_to_json {
            self.form_data_to_json = v;
        }
        if let Some(headers) = default_headers {
            self.default_headers.extend(headers);
        }
        if let Some(v) = request_timeout_ms {
            self.request_timeout_ms = v;
        }
        if let Some(v) = proxy_url {
            self.proxy_url = v;
        }
        if let Some(v) = max_total_connections {
            self.max_total_connections = v;
        }
        if let Some(v) = enable_logging {
            self.enable_logging = v;
        }
    }

    /// Copy of this config with `overrides` applied.
    pub fn merged(&self, overrides: ConfigOverrides) -> Self {
        let mut config = self.clone();
        config.merge(overrides);
        config
    }

    pub(crate) fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

impl fmt::Debug for EndpointConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EndpointConfig")
            .field("base_url", &self.base_url)
            .field("put_to_post", &self.put_to_post)
            .field("put_method_key", &self.put_method_key)
            .field("cache", &self.cache)
            .field("cache_options", &self.cache_options)
            .field("authorization", &self.authorization)
            .field("form_data_to_json", &self.form_data_to_json)
            .field("default_headers", &self.default_headers)
            .field("request_timeout_ms", &self.request_timeout_ms)
            .field("proxy_url", &self.proxy_url)
            .field("max_total_connections", &self.max_total_connections)
            .field("enable_logging", &self.enable_logging)
            .finish_non_exhaustive()
    }
}

/// Partial configuration merged over an existing [`EndpointConfig`].
///
/// Unset fields leave the current value alone; `default_headers` are added to
/// the existing ones.
#[derive(Clone, Default, Deserialize)]
#[serde(default)]
#[allow(missing_docs)]
pub struct ConfigOverrides {
    pub base_url: Option<String>,
    pub put_to_post: Option<bool>,
    pub put_method_key: Option<String>,
    pub cache: Option<bool>,
    #[serde(skip)]
    pub cache_options: Option<CacheOptions>,
    #[serde(skip)]
    pub authorization: Option<Authorization>,
    pub form_data_to_json: Option<bool>,
    pub default_headers: Option<BTreeMap<String, String>>,
    pub request_timeout_ms: Option<u64>,
    pub proxy_url: Option<String>,
    pub max_total_connections: Option<u32>,
    pub enable_logging: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EndpointConfig::default();
        assert!(!config.put_to_post);
        assert_eq!(config.put_method_key, "_method");
        assert!(!config.cache);
        assert!(config.cache_options.is_none());
        assert!(config.enable_logging);
    }

    #[test]
    fn test_merge_keeps_unset_fields() {
        let mut config = EndpointConfig::new("https://api.example.com")
            .with_default_header("X-App", "demo");

        config.merge(ConfigOverrides {
            put_to_post: Some(true),
            default_headers: Some(BTreeMap::from([("X-Locale".to_string(), "en".to_string())])),
            ..Default::default()
        });

        assert_eq!(config.base_url, "https://api.example.com");
        assert!(config.put_to_post);
        assert_eq!(config.default_headers.len(), 2);
    }

    #[test]
    fn test_overrides_deserialize() {
        let overrides: ConfigOverrides =
            serde_json::from_str(r#"{ "put_method_key": "__method", "cache": true }"#).unwrap();
        let config = EndpointConfig::default().merged(overrides);
        assert_eq!(config.put_method_key, "__method");
        assert!(config.cache);
    }

    #[test]
    fn test_authorization_helpers() {
        match Authorization::bearer("abc") {
            Authorization::Static(value) => assert_eq!(value, "Bearer abc"),
            Authorization::Dynamic(_) => panic!("expected static authorization"),
        }

        match Authorization::basic("user", "pass") {
            Authorization::Static(value) => assert_eq!(value, "Basic dXNlcjpwYXNz"),
            Authorization::Dynamic(_) => panic!("expected static authorization"),
        }
    }
}
