//! Core request and response types.
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Request`] | Request descriptor: method, path, body, headers, query params, options |
//! | [`RequestOptions`] | Per-call overrides (cache, expiry, cancellation, timeout) |
//! | [`RequestBody`] | Tagged union over the recognized body kinds |
//! | [`FormData`] | Ordered multipart form fields |
//! | [`OutgoingRequest`] | The request as it leaves the request interceptor |
//! | [`Response`] | Response descriptor with decoded JSON data |
//! | [`CachedResponse`] | Serializable response snapshot stored by cache drivers |

use crate::client::{is_success_status, CancelHandle};
use crate::error::Result;
use bytes::Bytes;
use http::{HeaderMap, Method};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::time::Duration;
use url::Url;

/// Body of an outgoing request.
///
/// The body kind is decided once, when the request is built, and drives every
/// later transformation (PUT marker injection, JSON serialization, multipart
/// encoding).
#[derive(Debug, Clone, Default, PartialEq)]
pub enum RequestBody {
    /// No body
    #[default]
    Empty,
    /// Raw text, sent as-is
    Text(String),
    /// Raw bytes, sent as-is
    Bytes(Bytes),
    /// Structured data, serialized to JSON text on dispatch
    Json(Value),
    /// Form fields, sent as `multipart/form-data`
    Form(FormData),
}

impl RequestBody {
    /// Serialize any `Serialize` value into a JSON body.
    pub fn json<T: Serialize + ?Sized>(value: &T) -> Result<Self> {
        Ok(RequestBody::Json(serde_json::to_value(value)?))
    }

    /// Whether the body is [`RequestBody::Empty`].
    pub fn is_empty(&self) -> bool {
        matches!(self, RequestBody::Empty)
    }
}

impl From<Value> for RequestBody {
    fn from(value: Value) -> Self {
        RequestBody::Json(value)
    }
}

impl From<FormData> for RequestBody {
    fn from(form: FormData) -> Self {
        RequestBody::Form(form)
    }
}

impl From<String> for RequestBody {
    fn from(text: String) -> Self {
        RequestBody::Text(text)
    }
}

impl From<&str> for RequestBody {
    fn from(text: &str) -> Self {
        RequestBody::Text(text.to_string())
    }
}

impl From<Bytes> for RequestBody {
    fn from(bytes: Bytes) -> Self {
        RequestBody::Bytes(bytes)
    }
}

impl From<Vec<u8>> for RequestBody {
    fn from(bytes: Vec<u8>) -> Self {
        RequestBody::Bytes(Bytes::from(bytes))
    }
}

/// A single form field value.
#[derive(Debug, Clone, PartialEq)]
pub enum FormValue {
    /// Plain text field
    Text(String),
    /// File upload
    File {
        /// File name reported to the server
        file_name: String,
        /// MIME type of the file, if known
        content_type: Option<String>,
        /// File contents
        bytes: Bytes,
    },
}

impl From<&str> for FormValue {
    fn from(text: &str) -> Self {
        FormValue::Text(text.to_string())
    }
}

impl From<String> for FormValue {
    fn from(text: String) -> Self {
        FormValue::Text(text)
    }
}

/// Ordered multipart form fields. Names may repeat.
///
/// # Examples
///
/// ```
/// use endpoint_http::FormData;
///
/// let form = FormData::new()
///     .with("name", "Ada")
///     .with("tags", "math")
///     .with("tags", "poetry");
///
/// assert_eq!(form.get_all("tags").count(), 2);
/// assert_eq!(form.to_json()["tags"][1], "poetry");
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormData {
    fields: Vec<(String, FormValue)>,
}

impl FormData {
    /// Create an empty form.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a field, keeping any previous values with the same name.
    pub fn append(&mut self, name: impl Into<String>, value: impl Into<FormValue>) {
        self.fields.push((name.into(), value.into()));
    }

    /// Builder-style [`append`](Self::append).
    pub fn with(mut self, name: impl Into<String>, value: impl Into<FormValue>) -> Self {
        self.append(name, value);
        self
    }

    /// Append a file field.
    pub fn with_file(
        mut self,
        name: impl Into<String>,
        file_name: impl Into<String>,
        content_type: Option<&str>,
        bytes: impl Into<Bytes>,
    ) -> Self {
        self.fields.push((
            name.into(),
            FormValue::File {
                file_name: file_name.into(),
                content_type: content_type.map(str::to_string),
                bytes: bytes.into(),
            },
        ));
        self
    }

    /// First value stored under `name`.
    pub fn get(&self, name: &str) -> Option<&FormValue> {
        self.fields
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value)
    }

    /// All values stored under `name`, in insertion order.
    pub fn get_all<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a FormValue> + 'a {
        self.fields
            .iter()
            .filter(move |(key, _)| key == name)
            .map(|(_, value)| value)
    }

    /// Whether any field is named `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.fields.iter().any(|(key, _)| key == name)
    }

    /// Iterate over all fields in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &FormValue)> {
        self.fields.iter().map(|(key, value)| (key.as_str(), value))
    }

    /// Number of fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether the form has no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Convert the form into a JSON object.
    ///
    /// A name seen once maps to its value; a repeated name maps to an array of
    /// all its values. File fields contribute their file name.
    pub fn to_json(&self) -> Value {
        let mut object = Map::new();

        for (key, value) in &self.fields {
            let value = match value {
                FormValue::Text(text) => Value::String(text.clone()),
                FormValue::File { file_name, .. } => Value::String(file_name.clone()),
            };

            match object.get_mut(key) {
                None => {
                    object.insert(key.clone(), value);
                }
                Some(Value::Array(values)) => values.push(value),
                Some(existing) => {
                    let first = existing.take();
                    *existing = Value::Array(vec![first, value]);
                }
            }
        }

        Value::Object(object)
    }

    /// Encode the form as a `reqwest` multipart form.
    pub(crate) fn into_multipart(self) -> Result<reqwest::multipart::Form> {
        let mut form = reqwest::multipart::Form::new();

        for (key, value) in self.fields {
            form = match value {
                FormValue::Text(text) => form.text(key, text),
                FormValue::File {
                    file_name,
                    content_type,
                    bytes,
                } => {
                    let mut part = reqwest::multipart::Part::bytes(bytes.to_vec()).file_name(file_name);
                    if let Some(mime) = content_type {
                        part = part.mime_str(&mime)?;
                    }
                    form.part(key, part)
                }
            };
        }

        Ok(form)
    }
}

/// Per-call overrides for a single request.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    /// Force caching on (`Some(true)`) or off (`Some(false)`) for this GET,
    /// regardless of the endpoint's `cache` setting.
    pub cache: Option<bool>,

    /// Expiry for the entry stored by this request.
    pub cache_expires_after: Option<Duration>,

    /// Caller-supplied cancellation handle. When absent a fresh one is created.
    pub signal: Option<CancelHandle>,

    /// Per-request timeout, overriding the client timeout.
    pub timeout: Option<Duration>,
}

impl RequestOptions {
    /// Empty options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable or disable caching for this request.
    pub fn with_cache(mut self, enabled: bool) -> Self {
        self.cache = Some(enabled);
        self
    }

    /// Set the cache expiry for this request.
    pub fn with_cache_expires_after(mut self, ttl: Duration) -> Self {
        self.cache_expires_after = Some(ttl);
        self
    }

    /// Use the given cancellation handle for this request.
    pub fn with_signal(mut self, signal: CancelHandle) -> Self {
        self.signal = Some(signal);
        self
    }

    /// Set a timeout for this request.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// A request descriptor.
///
/// # Examples
///
/// ```
/// use endpoint_http::Request;
/// use http::Method;
/// use serde_json::json;
///
/// let request = Request::new(Method::POST, "/users")
///     .with_body(json!({ "name": "Ada" }))
///     .with_header("X-Trace", "abc");
///
/// assert_eq!(request.method, Method::POST);
/// assert_eq!(request.headers.len(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct Request {
    /// HTTP method
    pub method: Method,
    /// Path relative to the base URL, or an absolute URL
    pub path: String,
    /// Request body
    pub body: RequestBody,
    /// Extra headers (name → value)
    pub headers: BTreeMap<String, String>,
    /// Query parameters as a JSON object
    pub params: Option<Value>,
    /// Per-call overrides
    pub options: RequestOptions,
}

impl Request {
    /// Create a request with an empty body.
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Request {
            method,
            path: path.into(),
            body: RequestBody::Empty,
            headers: BTreeMap::new(),
            params: None,
            options: RequestOptions::default(),
        }
    }

    /// Shorthand for a GET request.
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    /// Set the body.
    pub fn with_body(mut self, body: impl Into<RequestBody>) -> Self {
        self.body = body.into();
        self
    }

    /// Add a header.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Set the query parameters.
    pub fn with_params(mut self, params: Value) -> Self {
        self.params = Some(params);
        self
    }

    /// Replace the per-call options.
    pub fn with_options(mut self, options: RequestOptions) -> Self {
        self.options = options;
        self
    }

    /// Whether a header with `name` is set (case-insensitive).
    pub fn has_header(&self, name: &str) -> bool {
        self.headers.keys().any(|key| key.eq_ignore_ascii_case(name))
    }
}

/// The request as produced by the request interceptor: final method, resolved
/// URL, headers and body. This is the payload of the `sending` event.
#[derive(Debug, Clone)]
pub struct OutgoingRequest {
    /// Method after PUT-to-POST rewriting
    pub method: Method,
    /// Fully resolved URL, without query string
    pub url: Url,
    /// Headers to send
    pub headers: HeaderMap,
    /// Query parameters
    pub params: Option<Value>,
    /// Body after transformation
    pub body: RequestBody,
    /// Handle that cancels this request
    pub signal: CancelHandle,
    /// Per-request timeout
    pub timeout: Option<Duration>,
}

/// A response descriptor.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    /// HTTP status code
    pub status: u16,
    /// Response headers, names lower-cased
    pub headers: BTreeMap<String, String>,
    /// Raw body
    pub body: Bytes,
    /// Body decoded as JSON, when it parses
    pub data: Option<Value>,
    /// Whether this response was served from the cache
    pub from_cache: bool,
}

impl Response {
    /// Build a response from raw parts, decoding the body as JSON if possible.
    pub fn new(status: u16, headers: BTreeMap<String, String>, body: Bytes) -> Self {
        let data = serde_json::from_slice(&body).ok();
        Response {
            status,
            headers,
            body,
            data,
            from_cache: false,
        }
    }

    /// Whether the status is 2xx.
    pub fn is_success(&self) -> bool {
        is_success_status(self.status)
    }

    /// Header value by name (case-insensitive).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// Body as UTF-8 text (lossy).
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Deserialize the body into `T`.
    pub fn json<T: serde::de::DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_slice(&self.body)?)
    }

    /// Snapshot for the cache.
    pub fn to_cached(&self) -> CachedResponse {
        CachedResponse {
            status: self.status,
            headers: self.headers.clone(),
            body: self.body.clone(),
        }
    }
}

impl From<CachedResponse> for Response {
    fn from(cached: CachedResponse) -> Self {
        let mut response = Response::new(cached.status, cached.headers, cached.body);
        response.from_cache = true;
        response
    }
}

/// Response snapshot stored by cache drivers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedResponse {
    /// HTTP status code
    pub status: u16,
    /// Response headers
    pub headers: BTreeMap<String, String>,
    /// Raw body
    pub body: Bytes,
}
