//! Folds attempt failures into the public error taxonomy.

use crate::{
    transport::{TransportError, TransportErrorKind},
    AttemptError, Error, RequestError,
};

/// Maps a transport fault to its [`RequestError`].
pub fn classify_transport(err: &TransportError) -> RequestError {
    match err.kind {
        TransportErrorKind::TimedOut => RequestError::Timeout,
        TransportErrorKind::Cancelled => RequestError::Cancelled,
        TransportErrorKind::ConnectionLost => {
            RequestError::network("Network connection lost (-1005) - Please try again")
        }
        TransportErrorKind::NotConnected => RequestError::network("No internet connection"),
        TransportErrorKind::CannotConnectToHost => {
            RequestError::network("Unable to connect to server")
        }
        TransportErrorKind::HostNotFound => RequestError::network("Server not found"),
        TransportErrorKind::DnsFailure => RequestError::network("DNS resolution failed"),
        TransportErrorKind::CannotLoadFromNetwork => {
            RequestError::network("Error loading data from network")
        }
        TransportErrorKind::Other => RequestError::Network(format!(
            "Network error: {} (Code: {})",
            err.message,
            err.code.unwrap_or(-1)
        )),
    }
}

/// Normalizes an attempt failure. Already classified errors and decode
/// failures come back unchanged.
pub fn normalize(err: AttemptError) -> Error {
    match err {
        AttemptError::Request(err) => Error::Request(err),
        AttemptError::Decode(err) => Error::Decode(err),
        AttemptError::Transport(err) => Error::Request(classify_transport(&err)),
        AttemptError::Other(description) => Error::Request(RequestError::Network(description)),
    }
}

/// Retry policy over raw attempt failures.
pub fn is_retryable(err: &AttemptError) -> bool {
    match err {
        AttemptError::Request(err) => err.is_retryable(),
        AttemptError::Transport(err) => err.kind.is_retryable(),
        AttemptError::Decode(_) | AttemptError::Other(_) => false,
    }
}
