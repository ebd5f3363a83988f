//! Utility functions for the endpoint client.
//!
//! This module provides helper functions for:
//! - Joining route segments into a single path
//! - Resolving request paths against the base URL
//! - Status code classification

use crate::error::Result;
use regex::Regex;
use std::sync::OnceLock;
use url::Url;

fn duplicate_slashes() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"([^:]|^)/{2,}").expect("valid regex"))
}

/// Join route segments with single slashes.
///
/// Empty segments are skipped, runs of slashes are collapsed and a trailing
/// slash is dropped. A scheme separator (`://`) is preserved.
///
/// # Examples
///
/// ```
/// use endpoint_http::client::concat_route;
///
/// assert_eq!(concat_route(&["/users", "42"]), "/users/42");
/// assert_eq!(concat_route(&["https://api.io/", "/v1/", "/users"]), "https://api.io/v1/users");
/// assert_eq!(concat_route(&["/users", ""]), "/users");
/// ```
pub fn concat_route(segments: &[&str]) -> String {
    let joined = segments
        .iter()
        .filter(|segment| !segment.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join("/");

    let collapsed = duplicate_slashes().replace_all(&joined, "$1/");
    let trimmed = collapsed.trim_end_matches('/');

    if trimmed.is_empty() && collapsed.starts_with('/') {
        "/".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Whether `path` is an absolute `http(s)` URL.
pub fn is_absolute_url(path: &str) -> bool {
    let lower = path.trim_start().to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

/// Resolve a request path against the base URL.
///
/// Absolute paths are used as-is; relative ones are appended to `base_url`.
///
/// # Errors
///
/// Returns [`EndpointError::InvalidUrl`](crate::EndpointError::InvalidUrl) if
/// the result is not a valid URL (for example when no base URL is configured
/// and the path is relative).
pub fn resolve_url(base_url: &str, path: &str) -> Result<Url> {
    let full = if is_absolute_url(path) {
        path.to_string()
    } else {
        concat_route(&[base_url, path])
    };
    Ok(Url::parse(&full)?)
}

/// Check if status code is 2xx
pub fn is_success_status(status: u16) -> bool {
    (200..300).contains(&status)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_concat_route_basic() {
        assert_eq!(concat_route(&["/users", "5"]), "/users/5");
        assert_eq!(concat_route(&["/users/", "/5"]), "/users/5");
        assert_eq!(concat_route(&["users", "5"]), "users/5");
    }

    #[test]
    fn test_concat_route_empty_segments() {
        assert_eq!(concat_route(&["", "/users"]), "/users");
        assert_eq!(concat_route(&["/users", ""]), "/users");
        assert_eq!(concat_route(&["", ""]), "");
        assert_eq!(concat_route(&["/"]), "/");
    }

    #[test]
    fn test_concat_route_keeps_scheme() {
        assert_eq!(
            concat_route(&["http://localhost:8080/", "/api"]),
            "http://localhost:8080/api"
        );
    }

    #[test]
    fn test_resolve_url_relative() {
        let url = resolve_url("https://api.example.com/v1", "/users").unwrap();
        assert_eq!(url.as_str(), "https://api.example.com/v1/users");
    }

    #[test]
    fn test_resolve_url_absolute_path_ignores_base() {
        let url = resolve_url("https://api.example.com", "http://other.io/x").unwrap();
        assert_eq!(url.as_str(), "http://other.io/x");
    }

    #[test]
    fn test_resolve_url_without_base_fails() {
        assert!(resolve_url("", "/users").is_err());
    }

    #[test]
    fn test_status_helpers() {
        assert!(is_success_status(204));
        assert!(!is_success_status(302));
    }
}
