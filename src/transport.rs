use std::error::Error as StdError;
use std::fmt;
use std::io;
use std::time::Duration;

use async_trait::async_trait;
use url::Url;

use crate::{Headers, HttpMethod};

/// A fully built request, ready to hand to a [`Transport`].
#[derive(Clone, Debug, PartialEq)]
pub struct PreparedRequest {
    pub method: HttpMethod,
    pub url: Url,
    pub headers: Headers,
    pub body: Option<Vec<u8>>,
    /// Per-request timeout enforced by the transport.
    pub timeout: Option<Duration>,
}

impl PreparedRequest {
    pub fn new(method: HttpMethod, url: Url) -> Self {
        Self {
            method,
            url,
            headers: Headers::new(),
            body: None,
            timeout: None,
        }
    }
}

/// Raw HTTP exchange result as seen by the transport.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl RawResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: body.into(),
        }
    }
}

/// Recognized causes of a transport-level failure.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum TransportErrorKind {
    TimedOut,
    Cancelled,
    ConnectionLost,
    NotConnected,
    CannotConnectToHost,
    HostNotFound,
    DnsFailure,
    CannotLoadFromNetwork,
    Other,
}

impl TransportErrorKind {
    /// Connection-level causes worth another attempt.
    pub fn is_retryable(self) -> bool {
        !matches!(self, Self::Cancelled | Self::Other)
    }
}

/// Failure reported by a [`Transport`] before any HTTP response was read.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransportError {
    pub kind: TransportErrorKind,
    pub message: String,
    /// Platform or client specific error code, when one exists.
    pub code: Option<i64>,
}

impl TransportError {
    pub fn new(kind: TransportErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            code: None,
        }
    }

    pub fn with_code(mut self, code: i64) -> Self {
        self.code = Some(code);
        self
    }

    /// Maps a `reqwest` failure onto a [`TransportErrorKind`].
    pub fn from_reqwest(err: &reqwest::Error) -> Self {
        let message = err.to_string();
        let kind = if err.is_timeout() {
            TransportErrorKind::TimedOut
        } else if err.is_connect() {
            if chain_mentions_dns(err) {
                TransportErrorKind::DnsFailure
            } else {
                TransportErrorKind::CannotConnectToHost
            }
        } else if chain_has_connection_drop(err) || err.is_request() || err.is_body() {
            TransportErrorKind::ConnectionLost
        } else if err.is_decode() {
            TransportErrorKind::CannotLoadFromNetwork
        } else {
            TransportErrorKind::Other
        };

        let code = err.status().map(|status| i64::from(status.as_u16()));
        Self {
            kind,
            message,
            code,
        }
    }
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.code {
            Some(code) => write!(f, "{:?} transport error ({code}): {}", self.kind, self.message),
            None => write!(f, "{:?} transport error: {}", self.kind, self.message),
        }
    }
}

impl StdError for TransportError {}

fn chain_mentions_dns(err: &reqwest::Error) -> bool {
    let mut source = err.source();
    while let Some(inner) = source {
        let text = inner.to_string().to_ascii_lowercase();
        if text.contains("dns error") || text.contains("failed to lookup address") {
            return true;
        }
        source = inner.source();
    }
    false
}

fn chain_has_connection_drop(err: &reqwest::Error) -> bool {
    let mut source = err.source();
    while let Some(inner) = source {
        if let Some(io_err) = inner.downcast_ref::<io::Error>() {
            if matches!(
                io_err.kind(),
                io::ErrorKind::ConnectionReset
                    | io::ErrorKind::ConnectionAborted
                    | io::ErrorKind::BrokenPipe
                    | io::ErrorKind::UnexpectedEof
            ) {
                return true;
            }
        }
        source = inner.source();
    }
    false
}

/// Sends a prepared request and returns the raw exchange.
///
/// Implementations must be safe to call concurrently; one instance is shared
/// by every call made through a [`crate::RequestManager`].
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: PreparedRequest) -> Result<RawResponse, TransportError>;
}

/// [`Transport`] backed by a pooled `reqwest::Client`.
#[derive(Clone, Debug, Default)]
pub struct ReqwestTransport {
    http: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client(http: reqwest::Client) -> Self {
        Self { http }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: PreparedRequest) -> Result<RawResponse, TransportError> {
        let mut builder = self.http.request(request.method.into(), request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(timeout) = request.timeout {
            builder = builder.timeout(timeout);
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|err| TransportError::from_reqwest(&err))?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_owned(),
                    String::from_utf8_lossy(value.as_bytes()).into_owned(),
                )
            })
            .collect();
        let body = response
            .bytes()
            .await
            .map_err(|err| TransportError::from_reqwest(&err))?
            .to_vec();

        Ok(RawResponse {
            status,
            headers,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{TransportError, TransportErrorKind};

    #[test]
    fn connection_causes_are_retryable() {
        for kind in [
            TransportErrorKind::TimedOut,
            TransportErrorKind::ConnectionLost,
            TransportErrorKind::NotConnected,
            TransportErrorKind::CannotConnectToHost,
            TransportErrorKind::HostNotFound,
            TransportErrorKind::DnsFailure,
            TransportErrorKind::CannotLoadFromNetwork,
        ] {
            assert!(kind.is_retryable(), "{kind:?} must be retryable");
        }
        assert!(!TransportErrorKind::Cancelled.is_retryable());
        assert!(!TransportErrorKind::Other.is_retryable());
    }

    #[test]
    fn display_includes_code_when_present() {
        let err = TransportError::new(TransportErrorKind::Other, "bad url").with_code(-1000);
        assert_eq!(err.to_string(), "Other transport error (-1000): bad url");
    }
}
