#![warn(missing_docs)]

//! # endpoint_http: a configurable HTTP endpoint client
//!
//! This crate wraps [`reqwest`] with the conveniences a typical REST frontend
//! needs: request/response interceptors, lifecycle events, GET response
//! caching and a CRUD helper for resource routes.
//!
//! ## Key Features
//!
//! - **PUT-to-POST rewriting**: send PUT as POST with a `_method=PUT` marker, for
//!   servers that only parse multipart bodies on POST
//! - **Body normalization**: JSON values are serialized with
//!   `Content-Type: application/json`; forms are sent as multipart or, optionally, as JSON
//! - **Authorization injection**: static value, bearer/basic helpers, or a
//!   function of the outgoing request
//! - **Lifecycle events**: `sending`, `complete`, `success` and `error`
//!   listeners scoped to one endpoint
//! - **Cache-aside GET**: pluggable [`CacheDriver`] with an in-memory LRU driver
//! - **Cancellation**: abort the most recently dispatched request
//! - **RESTful helper**: `list/get/create/update/patch/delete/bulk_delete/publish`
//!
//! ## Usage
//!
//! ```ignore
//! use endpoint_http::cache::MemoryCacheDriver;
//! use endpoint_http::client::{Authorization, CacheOptions, EndpointConfig};
//! use endpoint_http::{Endpoint, RestfulEndpoint};
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = EndpointConfig::new("https://api.example.com")
//!         .with_put_to_post(true)
//!         .with_authorization(Authorization::bearer("secret"))
//!         .with_cache(CacheOptions::new(Arc::new(MemoryCacheDriver::default())));
//!
//!     let endpoint = Endpoint::with_config(config);
//!
//!     let _errors = endpoint.events().on_error(|err| {
//!         eprintln!("request failed: {}", err);
//!     });
//!
//!     let users = RestfulEndpoint::new(endpoint.clone(), "/users");
//!     let list = users.list(Some(json!({ "page": 1 }))).await?;
//!     println!("{:?}", list.data);
//!
//!     users.update(1, json!({ "name": "Ada" })).await?; // sent as POST /users/1
//!     Ok(())
//! }
//! ```
//!
//! ## Module Structure
//!
//! - **[types]** - Request, response and body types
//! - **[error]** - Error types and result handling
//! - **[client]** - The endpoint client, its configuration and interceptors
//! - **[events]** - Per-endpoint lifecycle events
//! - **[cache]** - Cache drivers and key construction
//! - **[restful]** - CRUD helper for resource routes
//! - **[protocol]** - Header constants and formatting

pub mod cache;
pub mod client;
pub mod error;
pub mod events;
pub mod protocol;
pub mod restful;
pub mod types;

pub use cache::{CacheDriver, MemoryCacheDriver};
pub use client::{Authorization, CancelHandle, Endpoint, EndpointConfig};
pub use error::{EndpointError, Result};
pub use events::{EventBus, EventKind, Subscription};
pub use restful::{Publish, RestfulEndpoint};
pub use types::{
    CachedResponse, FormData, FormValue, OutgoingRequest, Request, RequestBody, RequestOptions,
    Response,
};
