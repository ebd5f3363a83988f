//! Request and response interceptors.
//!
//! The request interceptor turns a caller's [`Request`] into the
//! [`OutgoingRequest`] that is announced through the `sending` event and then
//! handed to `reqwest`:
//!
//! 1. Resolve the URL against the base URL
//! 2. Rewrite PUT to POST and inject the PUT marker (when `put_to_post` is on)
//! 3. Convert form bodies to JSON (when `form_data_to_json` is on)
//! 4. Merge default and per-request headers, set `Content-Type` for JSON
//! 5. Inject `Authorization` unless the request already carries one
//! 6. Attach the cancellation handle
//!
//! The response interceptor reads status, headers and body into a
//! [`Response`] and classifies non-2xx statuses as errors.

use crate::client::config::EndpointConfig;
use crate::client::utils::resolve_url;
use crate::client::CancelHandle;
use crate::error::{EndpointError, Result};
use crate::protocol::constants::{headers, media_types, PUT_MARKER_VALUE};
use crate::protocol::{build_header_map, has_header, header_map_to_btree};
use crate::types::{OutgoingRequest, Request, RequestBody, Response};
use http::header::HeaderValue;
use http::Method;
use serde_json::Value;

/// Apply the request interceptor to `request`.
pub(crate) fn prepare(config: &EndpointConfig, request: Request) -> Result<OutgoingRequest> {
    let Request {
        method,
        path,
        body,
        headers: request_headers,
        params,
        options,
    } = request;

    let url = resolve_url(&config.base_url, &path)?;

    let mut method = method;
    let mut body = body;

    if method == Method::PUT && config.put_to_post {
        method = Method::POST;
        inject_put_marker(&mut body, &config.put_method_key);
    }

    if config.form_data_to_json {
        if let RequestBody::Form(form) = &body {
            let json = match &config.form_data_serializer {
                Some(serializer) => serializer(form),
                None => form.to_json(),
            };
            body = RequestBody::Json(json);
        }
    }

    let mut header_map = build_header_map(&config.default_headers)?;
    header_map.extend(build_header_map(&request_headers)?);

    match &body {
        RequestBody::Json(_) => {
            header_map.insert(
                headers::CONTENT_TYPE,
                HeaderValue::from_static(media_types::APPLICATION_JSON),
            );
        }
        RequestBody::Form(_) => {
            // reqwest sets the multipart boundary itself
            header_map.remove(headers::CONTENT_TYPE);
        }
        _ => {}
    }

    let mut outgoing = OutgoingRequest {
        method,
        url,
        headers: header_map,
        params,
        body,
        signal: options.signal.unwrap_or_default(),
        timeout: options.timeout,
    };

    if !has_header(&outgoing.headers, &headers::AUTHORIZATION) {
        if let Some(authorization) = &config.authorization {
            let value = HeaderValue::from_str(&authorization.resolve(&outgoing))?;
            outgoing.headers.insert(headers::AUTHORIZATION, value);
        }
    }

    Ok(outgoing)
}

/// Add `key = "PUT"` to a JSON object or form body. Other bodies are left
/// untouched.
fn inject_put_marker(body: &mut RequestBody, key: &str) {
    if key.is_empty() {
        return;
    }

    match body {
        RequestBody::Json(Value::Object(object)) => {
            object.insert(key.to_string(), Value::String(PUT_MARKER_VALUE.to_string()));
        }
        RequestBody::Form(form) => form.append(key, PUT_MARKER_VALUE),
        _ => {}
    }
}

/// Build the `reqwest` request for an outgoing request.
pub(crate) fn to_reqwest(
    client: &reqwest::Client,
    outgoing: &OutgoingRequest,
) -> Result<reqwest::RequestBuilder> {
    let mut req_builder = client
        .request(outgoing.method.clone(), outgoing.url.clone())
        .headers(outgoing.headers.clone());

    if let Some(params) = &outgoing.params {
        req_builder = req_builder.query(params);
    }

    if let Some(timeout) = outgoing.timeout {
        req_builder = req_builder.timeout(timeout);
    }

    req_builder = match &outgoing.body {
        RequestBody::Empty => req_builder,
        RequestBody::Text(text) => req_builder.body(text.clone()),
        RequestBody::Bytes(bytes) => req_builder.body(bytes.clone()),
        RequestBody::Json(value) => req_builder.body(serde_json::to_vec(value)?),
        RequestBody::Form(form) => req_builder.multipart(form.clone().into_multipart()?),
    };

    Ok(req_builder)
}

/// Read a `reqwest` response into a [`Response`].
pub(crate) async fn read_response(response: reqwest::Response) -> Result<Response> {
    let status = response.status().as_u16();
    let headers = header_map_to_btree(response.headers());
    let body = response.bytes().await?;
    Ok(Response::new(status, headers, body))
}

/// Classify a response by status: 2xx is success, anything else an error
/// carrying the response.
pub(crate) fn check_status(response: Response) -> Result<Response> {
    if response.is_success() {
        Ok(response)
    } else {
        Err(EndpointError::Status {
            response: Box::new(response),
        })
    }
}

/// Send the request, racing it against its cancellation handle.
pub(crate) async fn send(
    client: &reqwest::Client,
    outgoing: &OutgoingRequest,
    signal: &CancelHandle,
) -> Result<Response> {
    let req_builder = to_reqwest(client, outgoing)?;
    let response = signal
        .run(async move {
            let response = req_builder.send().await?;
            read_response(response).await
        })
        .await?;
    check_status(response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::config::{Authorization, EndpointConfig};
    use crate::types::{FormData, FormValue, RequestOptions};
    use serde_json::json;

    fn config() -> EndpointConfig {
        EndpointConfig::new("https://api.example.com")
    }

    #[test]
    fn test_put_to_post_rewrites_json_body() {
        let config = config().with_put_to_post(true);
        let request = Request::new(Method::PUT, "/users/1").with_body(json!({ "name": "Ada" }));

        let outgoing = prepare(&config, request).unwrap();

        assert_eq!(outgoing.method, Method::POST);
        assert_eq!(
            outgoing.body,
            RequestBody::Json(json!({ "name": "Ada", "_method": "PUT" }))
        );
    }

    #[test]
    fn test_put_to_post_appends_to_form() {
        let mut config = config().with_put_to_post(true);
        config.put_method_key = "__verb".to_string();
        let request = Request::new(Method::PUT, "/users/1").with_body(FormData::new().with("a", "1"));

        let outgoing = prepare(&config, request).unwrap();

        match outgoing.body {
            RequestBody::Form(form) => {
                assert_eq!(form.get("__verb"), Some(&FormValue::Text("PUT".to_string())));
            }
            other => panic!("expected form body, got {:?}", other),
        }
    }

    #[test]
    fn test_put_untouched_when_disabled() {
        let request = Request::new(Method::PUT, "/users/1").with_body(json!({ "a": 1 }));
        let outgoing = prepare(&config(), request).unwrap();
        assert_eq!(outgoing.method, Method::PUT);
        assert_eq!(outgoing.body, RequestBody::Json(json!({ "a": 1 })));
    }

    #[test]
    fn test_put_text_body_gets_no_marker() {
        let config = config().with_put_to_post(true);
        let request = Request::new(Method::PUT, "/x").with_body("raw");
        let outgoing = prepare(&config, request).unwrap();
        assert_eq!(outgoing.method, Method::POST);
        assert_eq!(outgoing.body, RequestBody::Text("raw".to_string()));
    }

    #[test]
    fn test_json_body_sets_content_type() {
        let request = Request::new(Method::POST, "/users").with_body(json!({ "a": 1 }));
        let outgoing = prepare(&config(), request).unwrap();
        assert_eq!(
            outgoing.headers.get(headers::CONTENT_TYPE).unwrap(),
            "application/json"
        );
    }

    #[test]
    fn test_form_to_json_conversion() {
        let mut config = config().with_put_to_post(true);
        config.form_data_to_json = true;
        let form = FormData::new().with("tag", "a").with("tag", "b");

        let outgoing = prepare(&config, Request::new(Method::PUT, "/x").with_body(form)).unwrap();

        assert_eq!(
            outgoing.body,
            RequestBody::Json(json!({ "tag": ["a", "b"], "_method": "PUT" }))
        );
        assert_eq!(
            outgoing.headers.get(headers::CONTENT_TYPE).unwrap(),
            "application/json"
        );
    }

    #[test]
    fn test_static_authorization_injected() {
        let config = config().with_authorization(Authorization::bearer("t"));
        let outgoing = prepare(&config, Request::get("/me")).unwrap();
        assert_eq!(outgoing.headers.get(headers::AUTHORIZATION).unwrap(), "Bearer t");
    }

    #[test]
    fn test_existing_authorization_wins() {
        let config = config().with_authorization(Authorization::bearer("t"));
        let request = Request::get("/me").with_header("Authorization", "Token mine");
        let outgoing = prepare(&config, request).unwrap();
        assert_eq!(outgoing.headers.get(headers::AUTHORIZATION).unwrap(), "Token mine");
    }

    #[test]
    fn test_dynamic_authorization_sees_request() {
        let config = config().with_authorization(Authorization::from_fn(|req| {
            format!("Key {}", req.url.path())
        }));
        let outgoing = prepare(&config, Request::get("/me")).unwrap();
        assert_eq!(outgoing.headers.get(headers::AUTHORIZATION).unwrap(), "Key /me");
    }

    #[test]
    fn test_request_headers_override_defaults() {
        let config = config()
            .with_default_header("X-Locale", "en")
            .with_default_header("X-App", "demo");
        let request = Request::get("/").with_header("x-locale", "ar");
        let outgoing = prepare(&config, request).unwrap();
        assert_eq!(outgoing.headers.get("x-locale").unwrap(), "ar");
        assert_eq!(outgoing.headers.get("x-app").unwrap(), "demo");
    }

    #[test]
    fn test_caller_signal_is_kept() {
        let signal = CancelHandle::new();
        let request =
            Request::get("/").with_options(RequestOptions::new().with_signal(signal.clone()));
        let outgoing = prepare(&config(), request).unwrap();
        assert!(outgoing.signal.same_request(&signal));
    }

    #[test]
    fn test_invalid_url() {
        let result = prepare(&EndpointConfig::default(), Request::get("/relative"));
        assert!(matches!(result, Err(EndpointError::InvalidUrl(_))));
    }

    #[test]
    fn test_check_status() {
        use bytes::Bytes;
        use std::collections::BTreeMap;

        let ok = Response::new(201, BTreeMap::new(), Bytes::new());
        assert!(check_status(ok).is_ok());

        let not_found = Response::new(404, BTreeMap::new(), Bytes::new());
        let err = check_status(not_found).unwrap_err();
        assert_eq!(err.status(), Some(404));
    }
}
