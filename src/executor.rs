use std::sync::Arc;

use serde::de::DeserializeOwned;

use crate::{
    classify::classify_transport,
    logger::{Exchange, RequestLogger, TracingLogger},
    transport::{PreparedRequest, Transport},
    DecodeError, Error, RequestError, Result, SafeDictionary,
};

/// Runs a single attempt: send, validate, log, decode. No retries here.
#[derive(Clone)]
pub struct RequestExecutor {
    transport: Arc<dyn Transport>,
    logger: Arc<dyn RequestLogger>,
}

impl RequestExecutor {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self::with_logger(transport, Arc::new(TracingLogger))
    }

    pub fn with_logger(transport: Arc<dyn Transport>, logger: Arc<dyn RequestLogger>) -> Self {
        Self { transport, logger }
    }

    /// Sends `request` and decodes a 2xx JSON body into `T`.
    ///
    /// Transport faults are classified into [`RequestError`]; a non-2xx
    /// status becomes [`RequestError::Http`]; a body that does not decode
    /// becomes [`Error::Decode`].
    pub async fn execute<T: DeserializeOwned>(&self, request: PreparedRequest) -> Result<T> {
        let sent = request.clone();
        let response = match self.transport.send(request).await {
            Ok(response) => response,
            Err(err) => {
                self.logger.log_exchange(&Exchange {
                    request: &sent,
                    response: None,
                    error: Some(&err),
                });
                return Err(classify_transport(&err).into());
            }
        };

        self.logger.log_exchange(&Exchange {
            request: &sent,
            response: Some(&response),
            error: None,
        });

        if !(100..=599).contains(&response.status) {
            return Err(RequestError::InvalidResponse.into());
        }

        if !(200..=299).contains(&response.status) {
            return Err(RequestError::Http {
                status_code: response.status,
                message: String::from_utf8(response.body.clone()).ok(),
                body_fields: SafeDictionary::from_slice(&response.body),
            }
            .into());
        }

        serde_json::from_slice::<T>(&response.body)
            .map_err(|err| Error::Decode(DecodeError::of::<T>(&err)))
    }
}
