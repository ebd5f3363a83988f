//! RESTful resource helper.
//!
//! [`RestfulEndpoint`] maps the usual CRUD operations on a resource route to
//! HTTP calls on an injected [`Endpoint`]:
//!
//! | Operation | Request |
//! |-----------|---------|
//! | `list(params)` | `GET route?params` |
//! | `get(id, params)` | `GET route/id?params` |
//! | `create(data)` | `POST route` |
//! | `update(id, data)` | `PUT route/id` |
//! | `patch(id, data)` | `PATCH route/id` |
//! | `delete(id)` | `DELETE route/id` |
//! | `bulk_delete(data)` | `DELETE route` with body |
//! | `publish(id, flag)` | `PATCH route/id` with `{ "published": flag }` |
//!
//! ```ignore
//! use endpoint_http::{Endpoint, RestfulEndpoint};
//! use serde_json::json;
//!
//! let endpoint = Endpoint::new("https://api.example.com");
//! let users = RestfulEndpoint::new(endpoint, "/users");
//!
//! let page = users.list(Some(json!({ "page": 2 }))).await?;
//! let created = users.create(json!({ "name": "Ada" })).await?;
//! users.publish(7, false).await?;
//! ```

use crate::client::{concat_route, Endpoint};
use crate::error::Result;
use crate::types::{Request, RequestBody, RequestOptions, Response};
use http::Method;
use serde_json::{Map, Value};
use std::fmt::Display;

/// Default field name sent by [`RestfulEndpoint::publish`].
pub const DEFAULT_PUBLISH_KEY: &str = "published";

/// Payload of a publish request: either a flag or a full object.
#[derive(Debug, Clone, PartialEq)]
pub enum Publish {
    /// Sent as `{ publish_key: flag }`
    Flag(bool),
    /// Sent as-is when it is an object, otherwise wrapped like a flag
    Data(Value),
}

impl From<bool> for Publish {
    fn from(flag: bool) -> Self {
        Publish::Flag(flag)
    }
}

impl From<Value> for Publish {
    fn from(data: Value) -> Self {
        Publish::Data(data)
    }
}

impl Publish {
    fn into_body(self, publish_key: &str) -> Value {
        let value = match self {
            Publish::Data(object @ Value::Object(_)) => return object,
            Publish::Data(value) => value,
            Publish::Flag(flag) => Value::Bool(flag),
        };
        let mut object = Map::new();
        object.insert(publish_key.to_string(), value);
        Value::Object(object)
    }
}

/// CRUD facade over one resource route.
#[derive(Debug, Clone)]
pub struct RestfulEndpoint {
    endpoint: Endpoint,
    route: String,
    list_params: Option<Value>,
    publish_key: String,
}

impl RestfulEndpoint {
    /// Create a helper for `route` using `endpoint`.
    pub fn new(endpoint: Endpoint, route: impl Into<String>) -> Self {
        RestfulEndpoint {
            endpoint,
            route: route.into(),
            list_params: None,
            publish_key: DEFAULT_PUBLISH_KEY.to_string(),
        }
    }

    /// Params sent by [`list`](Self::list) when the caller passes none.
    pub fn with_list_params(mut self, params: Value) -> Self {
        self.list_params = Some(params);
        self
    }

    /// Field name used by [`publish`](Self::publish) for flag payloads.
    pub fn with_publish_key(mut self, key: impl Into<String>) -> Self {
        self.publish_key = key.into();
        self
    }

    /// Base route.
    pub fn route(&self) -> &str {
        &self.route
    }

    /// Underlying endpoint.
    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Join the route with `suffix`.
    ///
    /// Leading slashes of the suffix are ignored; an empty suffix yields the
    /// route itself.
    ///
    /// # Examples
    ///
    /// ```
    /// use endpoint_http::{Endpoint, RestfulEndpoint};
    ///
    /// let users = RestfulEndpoint::new(Endpoint::new("http://localhost"), "/users");
    /// assert_eq!(users.path(""), "/users");
    /// assert_eq!(users.path(42), "/users/42");
    /// assert_eq!(users.path("/42/roles"), "/users/42/roles");
    /// ```
    pub fn path(&self, suffix: impl Display) -> String {
        let suffix = suffix.to_string();
        let suffix = suffix.trim_start_matches('/');
        if suffix.is_empty() {
            self.route.clone()
        } else {
            concat_route(&[self.route.as_str(), suffix])
        }
    }

    /// Fetch the resource list.
    pub async fn list(&self, params: Option<Value>) -> Result<Response> {
        self.list_with(params, RequestOptions::default()).await
    }

    /// [`list`](Self::list) with per-call options.
    pub async fn list_with(&self, params: Option<Value>, options: RequestOptions) -> Result<Response> {
        let params = params.or_else(|| self.list_params.clone());
        self.send(Method::GET, self.route.clone(), RequestBody::Empty, params, options)
            .await
    }

    /// Fetch one record.
    pub async fn get(&self, id: impl Display, params: Option<Value>) -> Result<Response> {
        self.get_with(id, params, RequestOptions::default()).await
    }

    /// [`get`](Self::get) with per-call options.
    pub async fn get_with(
        &self,
        id: impl Display,
        params: Option<Value>,
        options: RequestOptions,
    ) -> Result<Response> {
        self.send(Method::GET, self.path(id), RequestBody::Empty, params, options)
            .await
    }

    /// Create a record.
    pub async fn create(&self, data: impl Into<RequestBody>) -> Result<Response> {
        self.create_with(data, RequestOptions::default()).await
    }

    /// [`create`](Self::create) with per-call options.
    pub async fn create_with(
        &self,
        data: impl Into<RequestBody>,
        options: RequestOptions,
    ) -> Result<Response> {
        self.send(Method::POST, self.route.clone(), data.into(), None, options)
            .await
    }

    /// Replace a record.
    pub async fn update(&self, id: impl Display, data: impl Into<RequestBody>) -> Result<Response> {
        self.update_with(id, data, RequestOptions::default()).await
    }

    /// [`update`](Self::update) with per-call options.
    pub async fn update_with(
        &self,
        id: impl Display,
        data: impl Into<RequestBody>,
        options: RequestOptions,
    ) -> Result<Response> {
        self.send(Method::PUT, self.path(id), data.into(), None, options)
            .await
    }

    /// Partially update a record.
    pub async fn patch(&self, id: impl Display, data: impl Into<RequestBody>) -> Result<Response> {
        self.patch_with(id, data, RequestOptions::default()).await
    }

    /// [`patch`](Self::patch) with per-call options.
    pub async fn patch_with(
        &self,
        id: impl Display,
        data: impl Into<RequestBody>,
        options: RequestOptions,
    ) -> Result<Response> {
        self.send(Method::PATCH, self.path(id), data.into(), None, options)
            .await
    }

    /// Delete a record.
    pub async fn delete(&self, id: impl Display) -> Result<Response> {
        self.delete_with(id, RequestOptions::default()).await
    }

    /// [`delete`](Self::delete) with per-call options.
    pub async fn delete_with(&self, id: impl Display, options: RequestOptions) -> Result<Response> {
        self.send(Method::DELETE, self.path(id), RequestBody::Empty, None, options)
            .await
    }

    /// Delete several records, described by `data`, in one request.
    pub async fn bulk_delete(&self, data: impl Into<RequestBody>) -> Result<Response> {
        self.bulk_delete_with(data, RequestOptions::default()).await
    }

    /// [`bulk_delete`](Self::bulk_delete) with per-call options.
    pub async fn bulk_delete_with(
        &self,
        data: impl Into<RequestBody>,
        options: RequestOptions,
    ) -> Result<Response> {
        self.send(Method::DELETE, self.route.clone(), data.into(), None, options)
            .await
    }

    /// Publish or unpublish a record.
    ///
    /// An object is sent unchanged; a flag or any other value is sent as
    /// `{ publish_key: value }`.
    pub async fn publish(&self, id: impl Display, published: impl Into<Publish>) -> Result<Response> {
        self.publish_with(id, published, RequestOptions::default())
            .await
    }

    /// [`publish`](Self::publish) with per-call options.
    pub async fn publish_with(
        &self,
        id: impl Display,
        published: impl Into<Publish>,
        options: RequestOptions,
    ) -> Result<Response> {
        let body = published.into().into_body(&self.publish_key);
        self.patch_with(id, body, options).await
    }

    async fn send(
        &self,
        method: Method,
        path: String,
        body: RequestBody,
        params: Option<Value>,
        options: RequestOptions,
    ) -> Result<Response> {
        let mut request = Request::new(method, path)
            .with_body(body)
            .with_options(options);
        request.params = params;
        self.endpoint.request(request).await
    }
}
