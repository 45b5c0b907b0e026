use std::fmt;

use crate::{
    transport::{PreparedRequest, RawResponse, TransportError},
    HttpMethod,
};

/// One request/response exchange, handed to a [`RequestLogger`] after every
/// attempt.
#[derive(Debug)]
pub struct Exchange<'a> {
    pub request: &'a PreparedRequest,
    pub response: Option<&'a RawResponse>,
    pub error: Option<&'a TransportError>,
}

impl Exchange<'_> {
    pub fn method(&self) -> HttpMethod {
        self.request.method
    }

    pub fn status(&self) -> Option<u16> {
        self.response.map(|response| response.status)
    }

    pub fn is_success(&self) -> bool {
        self.status().is_some_and(|status| (200..300).contains(&status))
    }

    /// Response body, pretty-printed when it is JSON and passed through
    /// otherwise. `None` when there is no UTF-8 body.
    pub fn pretty_body(&self) -> Option<String> {
        let body = self.response?.body.as_slice();
        if body.is_empty() {
            return None;
        }
        serde_json::from_slice::<serde_json::Value>(body)
            .ok()
            .and_then(|json| serde_json::to_string_pretty(&json).ok())
            .or_else(|| std::str::from_utf8(body).ok().map(str::to_owned))
    }
}

/// Side channel for request diagnostics. Must not fail or block the caller.
pub trait RequestLogger: Send + Sync {
    fn log_exchange(&self, exchange: &Exchange<'_>);
}

/// Emits every exchange as `tracing` events.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingLogger;

struct HeaderList<'a>(&'a [(String, String)]);

impl fmt::Display for HeaderList<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, (name, value)) in self.0.iter().enumerate() {
            if index > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{name}: {value}")?;
        }
        Ok(())
    }
}

impl RequestLogger for TracingLogger {
    fn log_exchange(&self, exchange: &Exchange<'_>) {
        let method = exchange.method();
        let url = exchange.request.url.as_str();

        if let Some(err) = exchange.error {
            tracing::warn!(%method, url, error = %err, "request failed before a response");
            return;
        }

        let Some(response) = exchange.response else {
            return;
        };
        let headers = HeaderList(&response.headers);
        let body = exchange.pretty_body();

        if exchange.is_success() {
            tracing::debug!(
                %method,
                url,
                status = response.status,
                %headers,
                body = body.as_deref(),
                "request completed"
            );
        } else {
            tracing::debug!(
                %method,
                url,
                status = response.status,
                %headers,
                body = body.as_deref(),
                "request returned error status"
            );
        }
    }
}

/// Discards everything.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopLogger;

impl RequestLogger for NoopLogger {
    fn log_exchange(&self, _exchange: &Exchange<'_>) {}
}

#[cfg(test)]
mod tests {
    use super::Exchange;
    use crate::{
        transport::{PreparedRequest, RawResponse},
        HttpMethod,
    };

    fn request() -> PreparedRequest {
        PreparedRequest::new(
            HttpMethod::Get,
            url::Url::parse("https://example.com/api").expect("valid url"),
        )
    }

    #[test]
    fn pretty_prints_json_bodies() {
        let request = request();
        let response = RawResponse::new(200, br#"{"alias":"abc"}"#.to_vec());
        let exchange = Exchange {
            request: &request,
            response: Some(&response),
            error: None,
        };
        assert_eq!(
            exchange.pretty_body().as_deref(),
            Some("{\n  \"alias\": \"abc\"\n}")
        );
        assert!(exchange.is_success());
    }

    #[test]
    fn passes_text_bodies_through() {
        let request = request();
        let response = RawResponse::new(502, b"Bad Gateway".to_vec());
        let exchange = Exchange {
            request: &request,
            response: Some(&response),
            error: None,
        };
        assert_eq!(exchange.pretty_body().as_deref(), Some("Bad Gateway"));
        assert!(!exchange.is_success());
    }
}
