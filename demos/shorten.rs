//! Shortens a URL and resolves the alias back.
//!
//! ```text
//! RUST_LOG=endpoint_http=debug cargo run --example shorten -- https://www.rust-lang.org
//! ```

use endpoint_http::{Endpoint, Headers, HttpMethod, RequestManager};
use serde::Deserialize;
use serde_json::json;
use tracing_subscriber::EnvFilter;

const BASE_URL: &str = "https://url-shortener-server.onrender.com";

enum ShortApi {
    Create { url: String },
    Resolve { alias: String },
}

impl Endpoint for ShortApi {
    fn path(&self) -> String {
        match self {
            Self::Create { .. } => "/api/alias".to_owned(),
            Self::Resolve { alias } => format!("/api/alias/{alias}"),
        }
    }

    fn method(&self) -> HttpMethod {
        match self {
            Self::Create { .. } => HttpMethod::Post,
            Self::Resolve { .. } => HttpMethod::Get,
        }
    }

    fn headers(&self) -> Option<Headers> {
        let mut headers = Headers::new();
        headers.insert("Accept".to_owned(), "application/json".to_owned());
        if let Self::Create { .. } = self {
            headers.insert("Content-Type".to_owned(), "application/json".to_owned());
        }
        Some(headers)
    }

    fn body(&self) -> Option<Vec<u8>> {
        match self {
            Self::Create { url } => serde_json::to_vec(&json!({ "url": url })).ok(),
            Self::Resolve { .. } => None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ShortenResponse {
    alias: String,
    #[serde(rename = "_links")]
    links: Links,
}

#[derive(Debug, Deserialize)]
struct Links {
    #[serde(rename = "self")]
    original: String,
    short: String,
}

#[derive(Debug, Deserialize)]
struct ResolveResponse {
    url: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let url = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "https://www.rust-lang.org".to_owned());
    let manager = RequestManager::new(BASE_URL);

    let created: ShortenResponse = manager.request(&ShortApi::Create { url }).await?;
    println!("{} -> {}", created.links.original, created.links.short);

    let resolved: ResolveResponse = manager
        .request(&ShortApi::Resolve {
            alias: created.alias.clone(),
        })
        .await?;
    println!("{} resolves to {}", created.alias, resolved.url);

    Ok(())
}
