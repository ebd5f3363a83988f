//! Endpoint HTTP client implementation.
//!
//! This module provides the [`Endpoint`] client, enabling callers to:
//!
//! - **Resolve paths** against a configured base URL
//! - **Rewrite PUT as POST** with a marker field for servers that only parse POST bodies
//! - **Serialize bodies** as JSON or multipart forms
//! - **Inject authorization** headers from a static value or a per-request function
//! - **Cache GET responses** through a pluggable driver
//! - **Cancel** the most recently dispatched request
//!
//! # Module Organization
//!
//! ```text
//! client/
//! ├── endpoint    - Endpoint and its HTTP operations
//! ├── interceptor - Request/response transformation
//! ├── cancel      - Cancellation handles and last-request tracking
//! ├── config      - Endpoint configuration
//! └── utils       - Route and URL helpers
//! ```
//!
//! # Key Types
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Endpoint`] | Main HTTP client |
//! | [`EndpointConfig`] | Endpoint configuration options |
//! | [`ConfigOverrides`] | Partial configuration merged over an existing one |
//! | [`Authorization`] | Source of the `Authorization` header |
//! | [`CacheOptions`] | Cache driver and expiry |
//! | [`CancelHandle`] | Cancellation handle of one request |
//!
//! # Examples
//!
//! ## Creating an Endpoint
//!
//! ```
//! use endpoint_http::client::{Authorization, Endpoint, EndpointConfig};
//!
//! // Default configuration
//! let endpoint = Endpoint::new("https://api.example.com");
//!
//! // Custom configuration
//! let config = EndpointConfig {
//!     put_to_post: true,
//!     request_timeout_ms: 5_000,
//!     ..EndpointConfig::new("https://api.example.com")
//! }
//! .with_authorization(Authorization::bearer("secret"));
//! let endpoint = Endpoint::with_config(config);
//! assert!(endpoint.config().put_to_post);
//! ```
//!
//! ## Utility Functions
//!
//! ```
//! use endpoint_http::client::{concat_route, is_success_status};
//!
//! assert_eq!(concat_route(&["/api/", "/users"]), "/api/users");
//! assert!(is_success_status(204));
//! ```

mod cancel;
mod config;
mod endpoint;
mod interceptor;
mod utils;

pub use cancel::CancelHandle;
pub use config::{
    Authorization, CacheOptions, ConfigOverrides, EndpointConfig, FormSerializer,
    DEFAULT_CACHE_EXPIRY, DEFAULT_PUT_METHOD_KEY,
};
pub use endpoint::Endpoint;
pub use utils::*;
