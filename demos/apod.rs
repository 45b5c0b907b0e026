//! Fetches NASA's Astronomy Picture of the Day.
//!
//! Uses `NASA_API_KEY` when set and `DEMO_KEY` otherwise.
//!
//! ```text
//! cargo run --example apod -- 2024-01-01
//! ```

use endpoint_http::{Credentials, Endpoint, Error, QueryParams, RequestError, RequestManager};
use serde::Deserialize;
use tracing_subscriber::EnvFilter;

const BASE_URL: &str = "https://api.nasa.gov";

enum ApodEndpoint {
    ByDate(String),
    Random { count: u32 },
    ByRange {
        start: String,
        end: String,
        thumbs: bool,
    },
}

impl Endpoint for ApodEndpoint {
    fn path(&self) -> String {
        "/planetary/apod".to_owned()
    }

    fn query_parameters(&self) -> QueryParams {
        match self {
            Self::ByDate(date) => QueryParams::new().with("date", date.as_str()),
            Self::Random { count } => QueryParams::new().with("count", *count),
            Self::ByRange { start, end, thumbs } => QueryParams::new()
                .with("start_date", start.as_str())
                .with("end_date", end.as_str())
                .with("thumbs", *thumbs),
        }
    }

    fn requires_auth(&self) -> bool {
        true
    }
}

#[derive(Debug, Deserialize)]
struct Apod {
    date: String,
    title: String,
    url: Option<String>,
    media_type: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let key = std::env::var("NASA_API_KEY").unwrap_or_else(|_| "DEMO_KEY".to_owned());
    let manager = RequestManager::new(BASE_URL).with_credentials(Credentials::api_key(key));

    let date = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "2024-01-01".to_owned());
    match manager.request::<Apod, _>(&ApodEndpoint::ByDate(date)).await {
        Ok(apod) => println!(
            "{} {}: {}",
            apod.date,
            apod.title,
            apod.url.as_deref().unwrap_or("-")
        ),
        Err(Error::Request(err @ RequestError::Http { .. })) => {
            eprintln!("{err}");
            eprintln!("reason: {}", err.failure_reason());
            eprintln!("suggestion: {}", err.recovery_suggestion());
            return Ok(());
        }
        Err(err) => return Err(err.into()),
    }

    let random: Vec<Apod> = manager.request(&ApodEndpoint::Random { count: 3 }).await?;
    for apod in &random {
        println!(
            "random {} [{}] {}",
            apod.date,
            apod.media_type.as_deref().unwrap_or("unknown"),
            apod.title
        );
    }

    let week: Vec<Apod> = manager
        .request(&ApodEndpoint::ByRange {
            start: "2024-01-01".to_owned(),
            end: "2024-01-07".to_owned(),
            thumbs: true,
        })
        .await?;
    println!("{} pictures in the first week of 2024", week.len());

    Ok(())
}
