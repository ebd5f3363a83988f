//! Walk through the RESTful helper against a JSON API.
//!
//! ```text
//! cargo run --example restful_users -- https://jsonplaceholder.typicode.com
//! ```

use endpoint_http::cache::MemoryCacheDriver;
use endpoint_http::client::{Authorization, CacheOptions, EndpointConfig};
use endpoint_http::{Endpoint, RestfulEndpoint};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    let base_url = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "https://jsonplaceholder.typicode.com".to_string());

    let config = EndpointConfig::new(base_url)
        .with_put_to_post(false)
        .with_authorization(Authorization::bearer("demo-token"))
        .with_cache(
            CacheOptions::new(Arc::new(MemoryCacheDriver::new(64)))
                .expires_after(Duration::from_secs(30)),
        );
    let endpoint = Endpoint::with_config(config);

    let _sending = endpoint.events().before_sending(|req| {
        tracing::info!("-> {} {}", req.method, req.url);
    });
    let _errors = endpoint.events().on_error(|err| {
        tracing::error!("request failed: {}", err);
    });

    let users = RestfulEndpoint::new(endpoint.clone(), "/users");

    let list = users.list(Some(json!({ "_limit": 3 }))).await?;
    tracing::info!("listed users (cached: {})", list.from_cache);

    let again = users.list(Some(json!({ "_limit": 3 }))).await?;
    tracing::info!("listed users again (cached: {})", again.from_cache);

    let created = users.create(json!({ "name": "Ada Lovelace" })).await?;
    tracing::info!("created: {}", created.text());

    users.update(1, json!({ "name": "Grace Hopper" })).await?;
    users.publish(1, true).await?;
    users.delete(1).await?;

    Ok(())
}
