//! `endpoint-http` is an async, typed HTTP request pipeline.
//!
//! Callers describe each API call as an [`Endpoint`] and send it through
//! [`RequestManager::request`], which
//! - builds the URL from the base URL, path and query parameters,
//! - sends it through a pluggable [`Transport`],
//! - classifies failures into [`RequestError`],
//! - retries transient failures with jittered exponential backoff,
//! - decodes the JSON body into the requested type.

mod classify;
mod endpoint;
mod error;
mod executor;
mod logger;
mod manager;
mod options;
mod retry;
mod safe_dictionary;
mod transport;
mod url_builder;

pub use classify::{classify_transport, is_retryable, normalize};
pub use endpoint::{Endpoint, EndpointDescriptor, Headers, HttpMethod, QueryParams, QueryValue};
pub use error::{AttemptError, DecodeError, Error, RequestError};
pub use executor::RequestExecutor;
pub use logger::{Exchange, NoopLogger, RequestLogger, TracingLogger};
pub use manager::{Credentials, RequestManager};
pub use options::ClientOptions;
pub use retry::{RetryController, RetryPolicy};
pub use safe_dictionary::{SafeDictionary, SafeValue};
pub use transport::{
    PreparedRequest, RawResponse, ReqwestTransport, Transport, TransportError, TransportErrorKind,
};
pub use url_builder::{build_url, build_url_with};

pub use tokio_util::sync::CancellationToken;

pub type Result<T> = std::result::Result<T, Error>;
