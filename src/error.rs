use crate::{transport::TransportError, SafeDictionary};

/// Closed taxonomy of request failures.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum RequestError {
    /// Base URL and path did not form a valid URL.
    #[error("Invalid URL")]
    InvalidUrl,
    /// Transport answered without a usable HTTP status line.
    #[error("Invalid response")]
    InvalidResponse,
    /// Non-success HTTP status with whatever the body could tell us.
    #[error("HTTP Error {status_code}: {}", .message.as_deref().unwrap_or("Unknown error"))]
    Http {
        status_code: u16,
        /// Body decoded as UTF-8, if it was.
        message: Option<String>,
        /// Scalar fields of a JSON object body.
        body_fields: Option<SafeDictionary>,
    },
    #[error("Decoding Error: {0}")]
    Decoding(String),
    #[error("Network Error: {0}")]
    Network(String),
    #[error("Request timeout")]
    Timeout,
    #[error("Request cancelled")]
    Cancelled,
}

const SERVER_ERROR_THRESHOLD: u16 = 500;

impl RequestError {
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network(message.into())
    }

    pub fn http(status_code: u16, message: Option<String>) -> Self {
        Self::Http {
            status_code,
            message,
            body_fields: None,
        }
    }

    /// HTTP status code for [`RequestError::Http`].
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Http { status_code, .. } => Some(*status_code),
            _ => None,
        }
    }

    /// Whether a later attempt could plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Timeout | Self::Network(_) => true,
            Self::Http { status_code, .. } => *status_code >= SERVER_ERROR_THRESHOLD,
            Self::InvalidUrl
            | Self::InvalidResponse
            | Self::Decoding(_)
            | Self::Cancelled => false,
        }
    }

    pub fn failure_reason(&self) -> String {
        match self {
            Self::InvalidUrl => "The provided URL is invalid".to_owned(),
            Self::InvalidResponse => "The response is not a valid HTTP response".to_owned(),
            Self::Http { status_code, .. } => format!("Server returned status code {status_code}"),
            Self::Decoding(message) => format!("Failed to decode response: {message}"),
            Self::Network(message) => format!("Network connection failed: {message}"),
            Self::Timeout => "The request timed out".to_owned(),
            Self::Cancelled => "The request was cancelled".to_owned(),
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            Self::InvalidUrl => "Check the URL format",
            Self::InvalidResponse => "Verify the server is responding correctly",
            Self::Http { status_code, .. } => match *status_code {
                code if code >= SERVER_ERROR_THRESHOLD => "Try again later, server error",
                404 => "Check if the endpoint exists",
                401 => "Check your authentication",
                _ => "Check your request parameters",
            },
            Self::Decoding(_) => "Check if the response format matches expected model",
            Self::Network(_) => "Check your internet connection",
            Self::Timeout => "Try again with a longer timeout",
            Self::Cancelled => "The request was cancelled, try again",
        }
    }
}

/// A success body that could not be decoded into the requested type.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
#[error("failed to decode {target}: {message}")]
pub struct DecodeError {
    /// Rust type name of the decode target.
    pub target: &'static str,
    pub message: String,
}

impl DecodeError {
    pub(crate) fn of<T>(err: &serde_json::Error) -> Self {
        Self {
            target: std::any::type_name::<T>(),
            message: err.to_string(),
        }
    }
}

/// Error returned by [`crate::RequestManager::request`].
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Request(#[from] RequestError),
    /// Decode failures are surfaced as-is and never retried.
    #[error(transparent)]
    Decode(#[from] DecodeError),
}

impl Error {
    pub fn as_request(&self) -> Option<&RequestError> {
        match self {
            Self::Request(err) => Some(err),
            Self::Decode(_) => None,
        }
    }

    pub fn status_code(&self) -> Option<u16> {
        self.as_request().and_then(RequestError::status_code)
    }

    pub fn is_retryable(&self) -> bool {
        self.as_request().is_some_and(RequestError::is_retryable)
    }
}

/// Failure of a single attempt, before normalization.
///
/// This is what an operation handed to [`crate::RetryController::run`] fails
/// with. Raw transport faults keep their kind so the retry policy can look at
/// them before they are folded into [`RequestError`].
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum AttemptError {
    #[error(transparent)]
    Request(#[from] RequestError),
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error(transparent)]
    Transport(#[from] TransportError),
    /// Anything else, kept only as its description.
    #[error("{0}")]
    Other(String),
}

impl AttemptError {
    pub fn other(err: impl std::fmt::Display) -> Self {
        Self::Other(err.to_string())
    }
}

impl From<Error> for AttemptError {
    fn from(err: Error) -> Self {
        match err {
            Error::Request(err) => Self::Request(err),
            Error::Decode(err) => Self::Decode(err),
        }
    }
}
