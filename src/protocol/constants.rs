//! Header names and values shared by the request and response interceptors.

/// Header names
pub mod headers {
    use http::header::HeaderName;

    /// `Authorization`
    pub const AUTHORIZATION: HeaderName = http::header::AUTHORIZATION;

    /// `Content-Type`
    pub const CONTENT_TYPE: HeaderName = http::header::CONTENT_TYPE;
}

/// Media types
pub mod media_types {
    /// JSON request and response bodies
    pub const APPLICATION_JSON: &str = "application/json";
}

/// Literal value of the PUT marker field.
pub const PUT_MARKER_VALUE: &str = "PUT";
