use std::fmt;
use std::sync::Arc;

use reqwest::header;
use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;

use crate::{
    executor::RequestExecutor,
    logger::RequestLogger,
    retry::RetryController,
    transport::{PreparedRequest, ReqwestTransport, Transport},
    url_builder::build_url_with,
    AttemptError, ClientOptions, Endpoint, RequestError, Result,
};

/// Credentials attached to endpoints that report
/// [`Endpoint::requires_auth`].
#[derive(Clone, PartialEq, Eq)]
pub enum Credentials {
    /// Appended as a query item, e.g. `api_key=<value>`.
    QueryParam { name: String, value: String },
    /// Sent as the `Authorization` header value.
    Bearer(String),
}

impl Credentials {
    pub fn api_key(value: impl Into<String>) -> Self {
        Self::QueryParam {
            name: "api_key".to_owned(),
            value: value.into(),
        }
    }

    /// If the token is missing the `Bearer ` prefix, it is added automatically.
    pub fn bearer(token: impl AsRef<str>) -> Self {
        Self::Bearer(normalize_bearer_authorization(token.as_ref()))
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::QueryParam { name, .. } => f
                .debug_struct("QueryParam")
                .field("name", name)
                .field("value", &"<redacted>")
                .finish(),
            Self::Bearer(_) => f.debug_tuple("Bearer").field(&"<redacted>").finish(),
        }
    }
}

#[derive(Clone)]
/// Entry point for typed requests against one base URL.
pub struct RequestManager {
    base_url: String,
    transport: Arc<dyn Transport>,
    executor: RequestExecutor,
    retry: RetryController,
    options: ClientOptions,
    credentials: Option<Credentials>,
}

impl fmt::Debug for RequestManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestManager")
            .field("base_url", &self.base_url)
            .field("credentials", &self.credentials)
            .field("options", &self.options)
            .finish()
    }
}

impl RequestManager {
    /// Creates a manager that sends through a default `reqwest` client.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_transport(base_url, Arc::new(ReqwestTransport::new()))
    }

    /// Creates a manager with an injected transport.
    pub fn with_transport(base_url: impl Into<String>, transport: Arc<dyn Transport>) -> Self {
        let options = ClientOptions::default();
        Self {
            base_url: base_url.into(),
            executor: RequestExecutor::new(transport.clone()),
            transport,
            retry: RetryController::new(options.retry_policy()),
            options,
            credentials: None,
        }
    }

    /// Creates a manager from environment variables.
    ///
    /// Reads:
    /// - `ENDPOINT_HTTP_BASE_URL` — base URL every endpoint path is appended to
    /// - `ENDPOINT_HTTP_API_KEY` — optional, sent as `api_key` on
    ///   authenticated endpoints
    /// - `ENDPOINT_HTTP_MAX_RETRIES` — optional retry count
    /// - `ENDPOINT_HTTP_RETRY_DELAY_MS` — optional base backoff
    ///
    /// # Example
    ///
    /// ```no_run
    /// use endpoint_http::RequestManager;
    ///
    /// let manager = RequestManager::from_env().expect("missing ENDPOINT_HTTP_BASE_URL");
    /// ```
    pub fn from_env() -> std::result::Result<Self, String> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> std::result::Result<Self, String> {
        let base_url = get("ENDPOINT_HTTP_BASE_URL")
            .ok_or_else(|| "missing ENDPOINT_HTTP_BASE_URL environment variable".to_owned())?;
        if base_url.trim().is_empty() {
            return Err("ENDPOINT_HTTP_BASE_URL is set but empty".to_owned());
        }

        let mut options = ClientOptions::default();
        if let Some(retries) = lookup_number(&get, "ENDPOINT_HTTP_MAX_RETRIES")? {
            options.max_retries = retries;
        }
        if let Some(delay) = lookup_number(&get, "ENDPOINT_HTTP_RETRY_DELAY_MS")? {
            options.retry_delay_ms = delay;
        }

        let mut manager = Self::new(base_url.trim()).with_options(options);
        if let Some(key) = get("ENDPOINT_HTTP_API_KEY") {
            if !key.trim().is_empty() {
                manager = manager.with_credentials(Credentials::api_key(key.trim()));
            }
        }
        Ok(manager)
    }

    /// Applies client options such as timeout and retry behavior.
    pub fn with_options(mut self, opts: ClientOptions) -> Self {
        self.retry = RetryController::new(opts.retry_policy());
        self.options = opts;
        self
    }

    /// Replaces the exchange logger (defaults to [`crate::TracingLogger`]).
    pub fn with_logger(mut self, logger: Arc<dyn RequestLogger>) -> Self {
        self.executor = RequestExecutor::with_logger(self.transport.clone(), logger);
        self
    }

    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn options(&self) -> &ClientOptions {
        &self.options
    }

    /// Sends `endpoint` and decodes the JSON response into `T`, retrying
    /// transient failures.
    pub async fn request<T, E>(&self, endpoint: &E) -> Result<T>
    where
        T: DeserializeOwned,
        E: Endpoint + ?Sized,
    {
        self.request_with_cancel(endpoint, &CancellationToken::new())
            .await
    }

    /// Like [`RequestManager::request`], aborting with
    /// [`RequestError::Cancelled`] as soon as `cancel` fires.
    pub async fn request_with_cancel<T, E>(
        &self,
        endpoint: &E,
        cancel: &CancellationToken,
    ) -> Result<T>
    where
        T: DeserializeOwned,
        E: Endpoint + ?Sized,
    {
        self.retry
            .run(
                move || async move {
                    let request = self.prepare(endpoint)?;
                    self.executor
                        .execute::<T>(request)
                        .await
                        .map_err(AttemptError::from)
                },
                cancel,
            )
            .await
    }

    /// Builds the request one attempt will send: URL, method, headers, body,
    /// timeout and credentials.
    pub fn prepare<E>(&self, endpoint: &E) -> std::result::Result<PreparedRequest, RequestError>
    where
        E: Endpoint + ?Sized,
    {
        let auth = endpoint
            .requires_auth()
            .then_some(self.credentials.as_ref())
            .flatten();

        let mut params = endpoint.query_parameters();
        if let Some(Credentials::QueryParam { name, value }) = auth {
            if params.get(name).is_none() {
                params.push(name.as_str(), value.as_str());
            }
        }
        let url = build_url_with(&self.base_url, &endpoint.path(), &params)?;

        let mut request = PreparedRequest::new(endpoint.method(), url);
        if let Some(headers) = endpoint.headers() {
            request.headers = headers;
        }
        if let Some(Credentials::Bearer(authorization)) = auth {
            let name = header::AUTHORIZATION.as_str();
            request.headers.retain(|key, _| !key.eq_ignore_ascii_case(name));
            request.headers.insert(name.to_owned(), authorization.clone());
        }
        request.body = endpoint.body();
        request.timeout = Some(self.options.timeout());
        Ok(request)
    }
}

fn lookup_number<N: std::str::FromStr>(
    get: &impl Fn(&str) -> Option<String>,
    name: &str,
) -> std::result::Result<Option<N>, String> {
    match get(name) {
        Some(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse::<N>()
            .map(Some)
            .map_err(|_| format!("{name} must be a non-negative integer, got '{raw}'")),
        _ => Ok(None),
    }
}

fn normalize_bearer_authorization(token: &str) -> String {
    let trimmed = token.trim();
    let prefix = trimmed.get(..7);
    if prefix.is_some_and(|value| value.eq_ignore_ascii_case("bearer ")) {
        trimmed.to_owned()
    } else {
        format!("Bearer {trimmed}")
    }
}
