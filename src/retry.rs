use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

use crate::{
    classify::{is_retryable, normalize},
    AttemptError, RequestError, Result,
};

/// Bounded exponential backoff with additive jitter.
///
/// The delay before retry `n` (0-based) is
/// `min(max_delay, base_delay * 2^n + uniform[0, jitter_max))`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RetryPolicy {
    /// Retries after the initial attempt.
    pub max_retries: usize,
    pub base_delay: Duration,
    pub max_delay: Duration,
    /// Exclusive upper bound of the random jitter. Zero disables jitter.
    pub jitter_max: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(8),
            jitter_max: Duration::from_millis(400),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: usize, base_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
            ..Self::default()
        }
    }

    pub fn with_jitter(mut self, jitter_max: Duration) -> Self {
        self.jitter_max = jitter_max;
        self
    }

    pub fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = max_delay;
        self
    }

    pub fn max_attempts(&self) -> usize {
        self.max_retries.saturating_add(1)
    }

    /// Backoff before retry `attempt`, jitter included.
    pub fn delay_for(&self, attempt: usize) -> Duration {
        let exp = attempt.min(16) as u32;
        let backoff = self.base_delay.saturating_mul(1u32 << exp);
        let jitter = if self.jitter_max.is_zero() {
            Duration::ZERO
        } else {
            rand::thread_rng().gen_range(Duration::ZERO..self.jitter_max)
        };
        backoff.saturating_add(jitter).min(self.max_delay)
    }
}

/// Re-runs a failing operation while its error is retryable.
#[derive(Clone, Debug, Default)]
pub struct RetryController {
    policy: RetryPolicy,
}

impl RetryController {
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Drives `operation` for up to `max_retries + 1` attempts.
    ///
    /// The final failure is normalized: classified errors and decode errors
    /// pass through, transport faults are classified, anything else becomes
    /// [`RequestError::Network`]. Cancelling `cancel` interrupts the current
    /// attempt or backoff and returns [`RequestError::Cancelled`].
    pub async fn run<T, F, Fut>(&self, mut operation: F, cancel: &CancellationToken) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = std::result::Result<T, AttemptError>>,
    {
        let max_attempts = self.policy.max_attempts();
        let mut attempt = 0usize;

        loop {
            if cancel.is_cancelled() {
                return Err(RequestError::Cancelled.into());
            }

            let outcome = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(RequestError::Cancelled.into()),
                outcome = operation() => outcome,
            };

            let err = match outcome {
                Ok(value) => return Ok(value),
                Err(err) => err,
            };

            let is_last_attempt = attempt + 1 >= max_attempts;
            if is_last_attempt || !is_retryable(&err) {
                return Err(normalize(err));
            }

            let delay = self.policy.delay_for(attempt);
            tracing::debug!(
                attempt = attempt + 1,
                max_attempts,
                delay_ms = delay.as_millis() as u64,
                error = %err,
                "retrying request"
            );

            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(RequestError::Cancelled.into()),
                _ = sleep(delay) => {}
            }
            attempt += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::{Duration, Instant};

    use tokio_util::sync::CancellationToken;

    use super::{RetryController, RetryPolicy};
    use crate::{
        transport::{TransportError, TransportErrorKind},
        AttemptError, DecodeError, Error, RequestError,
    };

    fn fast(max_retries: usize) -> RetryController {
        RetryController::new(
            RetryPolicy::new(max_retries, Duration::from_millis(1)).with_jitter(Duration::ZERO),
        )
    }

    fn connection_lost() -> AttemptError {
        TransportError::new(TransportErrorKind::ConnectionLost, "connection reset").into()
    }

    #[test]
    fn default_policy_values() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_retries, 3);
        assert_eq!(policy.max_attempts(), 4);
        assert_eq!(policy.base_delay, Duration::from_secs(1));
        assert_eq!(policy.max_delay, Duration::from_secs(8));
        assert_eq!(policy.jitter_max, Duration::from_millis(400));
    }

    #[test]
    fn delay_doubles_and_caps_without_jitter() {
        let policy = RetryPolicy::new(10, Duration::from_secs(1)).with_jitter(Duration::ZERO);
        assert_eq!(policy.delay_for(0), Duration::from_secs(1));
        assert_eq!(policy.delay_for(1), Duration::from_secs(2));
        assert_eq!(policy.delay_for(2), Duration::from_secs(4));
        assert_eq!(policy.delay_for(3), Duration::from_secs(8));
        assert_eq!(policy.delay_for(4), Duration::from_secs(8));
        assert_eq!(policy.delay_for(100), Duration::from_secs(8));
    }

    #[test]
    fn jitter_stays_in_range() {
        let policy = RetryPolicy::new(3, Duration::from_millis(100));
        for _ in 0..200 {
            let delay = policy.delay_for(1);
            assert!(delay >= Duration::from_millis(200));
            assert!(delay < Duration::from_millis(600));
        }
        let capped = policy.clone().with_max_delay(Duration::from_millis(150));
        assert!(capped.delay_for(5) <= Duration::from_millis(150));
    }

    #[tokio::test]
    async fn succeeds_on_first_attempt() {
        let attempts = AtomicUsize::new(0);
        let result = fast(3)
            .run(
                || {
                    attempts.fetch_add(1, Ordering::SeqCst);
                    async { Ok::<_, AttemptError>("Success") }
                },
                &CancellationToken::new(),
            )
            .await;
        assert_eq!(result, Ok("Success"));
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn recovers_after_two_connection_drops() {
        let controller = RetryController::new(RetryPolicy::new(2, Duration::from_millis(100)));
        let attempts = AtomicUsize::new(0);
        let result = controller
            .run(
                || {
                    let n = attempts.fetch_add(1, Ordering::SeqCst) + 1;
                    async move {
                        if n <= 2 {
                            Err(connection_lost())
                        } else {
                            Ok("Success")
                        }
                    }
                },
                &CancellationToken::new(),
            )
            .await;
        assert_eq!(result, Ok("Success"));
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn retryable_failure_is_attempted_max_retries_plus_one_times() {
        for max_retries in [0, 1, 3] {
            let attempts = AtomicUsize::new(0);
            let result: crate::Result<()> = fast(max_retries)
                .run(
                    || {
                        attempts.fetch_add(1, Ordering::SeqCst);
                        async { Err(RequestError::Timeout.into()) }
                    },
                    &CancellationToken::new(),
                )
                .await;
            assert_eq!(result, Err(Error::Request(RequestError::Timeout)));
            assert_eq!(attempts.load(Ordering::SeqCst), max_retries + 1);
        }
    }

    #[tokio::test]
    async fn server_errors_are_retried() {
        let attempts = AtomicUsize::new(0);
        let result: crate::Result<()> = fast(3)
            .run(
                || {
                    attempts.fetch_add(1, Ordering::SeqCst);
                    async { Err(RequestError::http(500, Some("Server Error".to_owned())).into()) }
                },
                &CancellationToken::new(),
            )
            .await;
        assert_eq!(result.expect_err("must fail").status_code(), Some(500));
        assert_eq!(attempts.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn client_errors_are_not_retried() {
        let attempts = AtomicUsize::new(0);
        let result: crate::Result<()> = fast(3)
            .run(
                || {
                    attempts.fetch_add(1, Ordering::SeqCst);
                    async { Err(RequestError::http(400, Some("Bad Request".to_owned())).into()) }
                },
                &CancellationToken::new(),
            )
            .await;
        assert_eq!(result.expect_err("must fail").status_code(), Some(400));
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn invalid_url_is_not_retried() {
        let attempts = AtomicUsize::new(0);
        let result: crate::Result<()> = fast(3)
            .run(
                || {
                    attempts.fetch_add(1, Ordering::SeqCst);
                    async { Err(RequestError::InvalidUrl.into()) }
                },
                &CancellationToken::new(),
            )
            .await;
        assert_eq!(result, Err(Error::Request(RequestError::InvalidUrl)));
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn decode_errors_pass_through_without_retry() {
        let decode = DecodeError {
            target: "Apod",
            message: "expected value at line 1 column 1".to_owned(),
        };
        let attempts = AtomicUsize::new(0);
        let result: crate::Result<()> = fast(3)
            .run(
                || {
                    attempts.fetch_add(1, Ordering::SeqCst);
                    let decode = decode.clone();
                    async move { Err(decode.into()) }
                },
                &CancellationToken::new(),
            )
            .await;
        assert_eq!(result, Err(Error::Decode(decode)));
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn unrecognized_transport_fault_is_classified_once() {
        let attempts = AtomicUsize::new(0);
        let result: crate::Result<()> = fast(3)
            .run(
                || {
                    attempts.fetch_add(1, Ordering::SeqCst);
                    async {
                        Err(TransportError::new(TransportErrorKind::Other, "unsupported URL")
                            .with_code(-1002)
                            .into())
                    }
                },
                &CancellationToken::new(),
            )
            .await;
        match result.expect_err("must fail") {
            Error::Request(RequestError::Network(message)) => {
                assert!(message.starts_with("Network error:"));
                assert!(message.contains("-1002"));
            }
            other => panic!("expected network error, got {other:?}"),
        }
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn other_failures_become_network_errors() {
        let result: crate::Result<()> = fast(3)
            .run(
                || async { Err(AttemptError::other("disk full")) },
                &CancellationToken::new(),
            )
            .await;
        assert_eq!(result, Err(Error::Request(RequestError::network("disk full"))));
    }

    #[tokio::test]
    async fn cancellation_interrupts_backoff() {
        let controller = RetryController::new(
            RetryPolicy::new(5, Duration::from_secs(5)).with_jitter(Duration::ZERO),
        );
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            trigger.cancel();
        });

        let attempts = Arc::new(AtomicUsize::new(0));
        let started = Instant::now();
        let result: crate::Result<()> = controller
            .run(
                || {
                    attempts.fetch_add(1, Ordering::SeqCst);
                    async { Err(RequestError::Timeout.into()) }
                },
                &cancel,
            )
            .await;

        assert_eq!(result, Err(Error::Request(RequestError::Cancelled)));
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn cancelled_token_prevents_any_attempt() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let attempts = AtomicUsize::new(0);
        let result: crate::Result<()> = fast(3)
            .run(
                || {
                    attempts.fetch_add(1, Ordering::SeqCst);
                    async { Ok(()) }
                },
                &cancel,
            )
            .await;
        assert_eq!(result, Err(Error::Request(RequestError::Cancelled)));
        assert_eq!(attempts.load(Ordering::SeqCst), 0);
    }
}
