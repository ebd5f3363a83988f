//! Header formatting and conversion.
//!
//! # Examples
//!
//! ```
//! use endpoint_http::protocol::{format_basic, format_bearer};
//!
//! assert_eq!(format_bearer("t0k3n"), "Bearer t0k3n");
//! assert_eq!(format_basic("aladdin", "opensesame"), "Basic YWxhZGRpbjpvcGVuc2VzYW1l");
//! ```

use crate::error::Result;
use base64::Engine;
use http::header::{HeaderMap, HeaderName, HeaderValue, SET_COOKIE};
use std::collections::BTreeMap;

/// Format a bearer token `Authorization` value.
#[inline]
pub fn format_bearer(token: &str) -> String {
    format!("Bearer {}", token)
}

/// Format a basic-auth `Authorization` value.
///
/// Credentials are joined as `user:password` and base64 encoded with the
/// standard alphabet, as required by RFC 7617.
pub fn format_basic(user: &str, password: &str) -> String {
    let encoded =
        base64::engine::general_purpose::STANDARD.encode(format!("{}:{}", user, password));
    format!("Basic {}", encoded)
}

/// Build a [`HeaderMap`] from name/value pairs.
///
/// Later pairs overwrite earlier ones with the same (case-insensitive) name.
///
/// # Errors
///
/// Returns [`EndpointError::InvalidHeader`](crate::EndpointError::InvalidHeader)
/// if a name or value is not a valid header.
pub fn build_header_map<'a, I>(pairs: I) -> Result<HeaderMap>
where
    I: IntoIterator<Item = (&'a String, &'a String)>,
{
    let mut map = HeaderMap::new();
    for (name, value) in pairs {
        let name = HeaderName::from_bytes(name.as_bytes())?;
        let value = HeaderValue::from_str(value)?;
        map.insert(name, value);
    }
    Ok(map)
}

/// Convert response headers into a lower-cased name → value map.
///
/// Repeated headers are joined with `", "`, except `set-cookie`, whose values
/// may themselves contain commas and are joined with `"\n"`. Values that are
/// not valid UTF-8 are skipped.
pub fn header_map_to_btree(headers: &HeaderMap) -> BTreeMap<String, String> {
    let mut map = BTreeMap::new();
    for name in headers.keys() {
        let separator = if *name == SET_COOKIE { "\n" } else { ", " };
        let values: Vec<&str> = headers
            .get_all(name)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .collect();
        if !values.is_empty() {
            map.insert(name.as_str().to_string(), values.join(separator));
        }
    }
    map
}

/// Whether `headers` contains a non-empty value for `name`.
pub fn has_header(headers: &HeaderMap, name: &HeaderName) -> bool {
    headers
        .get(name)
        .map(|value| !value.is_empty())
        .unwrap_or(false)
}
