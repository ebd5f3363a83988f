//! Error types for endpoint operations.
//!
//! Every fallible operation in this crate returns [`Result`], whose error side is
//! [`EndpointError`]. Failures are propagated to the caller as-is: the endpoint
//! never retries and never swallows an error.
//!
//! When the server answered with a non-2xx status, the error carries the full
//! [`Response`] so callers can inspect the status, headers and decoded body:
//!
//! ```ignore
//! match endpoint.get("/users/42").await {
//!     Ok(response) => println!("{:?}", response.data),
//!     Err(err) => {
//!         if let Some(response) = err.response() {
//!             eprintln!("server said {}: {:?}", response.status, response.data);
//!         }
//!     }
//! }
//! ```

use crate::types::Response;
use thiserror::Error;

/// Result type for endpoint operations.
pub type Result<T> = std::result::Result<T, EndpointError>;

/// Errors produced while preparing, sending or caching a request.
#[derive(Debug, Error)]
pub enum EndpointError {
    /// Transport failure reported by the underlying HTTP client
    /// (connection refused, timeout, invalid query parameters, ...).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with a non-success status code.
    #[error("request failed with status {}", .response.status)]
    Status {
        /// The error response as received from the server.
        response: Box<Response>,
    },

    /// The request was cancelled through its [`CancelHandle`](crate::client::CancelHandle).
    #[error("request aborted")]
    Aborted,

    /// The base URL and path did not form a valid URL.
    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// A header name or value could not be encoded.
    #[error("invalid header: {0}")]
    InvalidHeader(String),

    /// JSON encoding or decoding failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The cache driver failed to read or store an entry. Errors of other
    /// kinds returned by a driver are wrapped here, prefixed by the driver name.
    #[error("cache error: {0}")]
    Cache(String),
}

impl EndpointError {
    /// The server response attached to this error, if the server answered at all.
    pub fn response(&self) -> Option<&Response> {
        match self {
            EndpointError::Status { response } => Some(response.as_ref()),
            _ => None,
        }
    }

    /// HTTP status of the failed request, when known.
    pub fn status(&self) -> Option<u16> {
        match self {
            EndpointError::Status { response } => Some(response.status),
            EndpointError::Http(err) => err.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Whether the request was cancelled by its issuer.
    pub fn is_aborted(&self) -> bool {
        matches!(self, EndpointError::Aborted)
    }
}

impl From<http::header::InvalidHeaderName> for EndpointError {
    fn from(err: http::header::InvalidHeaderName) -> Self {
        EndpointError::InvalidHeader(err.to_string())
    }
}

impl From<http::header::InvalidHeaderValue> for EndpointError {
    fn from(err: http::header::InvalidHeaderValue) -> Self {
        EndpointError::InvalidHeader(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use std::collections::BTreeMap;

    #[test]
    fn test_status_error_exposes_response() {
        let response = Response {
            status: 422,
            headers: BTreeMap::new(),
            body: Bytes::from_static(b"{\"error\":\"invalid\"}"),
            data: Some(serde_json::json!({"error": "invalid"})),
            from_cache: false,
        };
        let err = EndpointError::Status {
            response: Box::new(response),
        };

        assert_eq!(err.status(), Some(422));
        assert_eq!(err.response().unwrap().data.as_ref().unwrap()["error"], "invalid");
        assert_eq!(err.to_string(), "request failed with status 422");
    }

    #[test]
    fn test_aborted_has_no_response() {
        let err = EndpointError::Aborted;
        assert!(err.is_aborted());
        assert!(err.response().is_none());
        assert!(err.status().is_none());
    }
}
