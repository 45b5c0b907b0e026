use std::time::Duration;

use crate::retry::RetryPolicy;

/// Configures HTTP timeout and retry behavior.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ClientOptions {
    /// Per-request timeout in milliseconds.
    pub timeout_ms: u64,
    /// Maximum number of retries after the initial attempt.
    pub max_retries: usize,
    /// Base retry backoff in milliseconds, doubled on every retry.
    pub retry_delay_ms: u64,
    /// Upper bound for a single backoff in milliseconds.
    pub max_retry_delay_ms: u64,
    /// Exclusive upper bound of the random jitter added to each backoff.
    pub jitter_ms: u64,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            timeout_ms: 30_000,
            max_retries: 3,
            retry_delay_ms: 1_000,
            max_retry_delay_ms: 8_000,
            jitter_ms: 400,
        }
    }
}

impl ClientOptions {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries,
            base_delay: Duration::from_millis(self.retry_delay_ms),
            max_delay: Duration::from_millis(self.max_retry_delay_ms),
            jitter_max: Duration::from_millis(self.jitter_ms),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use crate::ClientOptions;

    #[test]
    fn defaults_map_onto_retry_policy() {
        let policy = ClientOptions::default().retry_policy();
        assert_eq!(policy.max_retries, 3);
        assert_eq!(policy.base_delay, Duration::from_secs(1));
        assert_eq!(policy.max_delay, Duration::from_secs(8));
        assert_eq!(policy.jitter_max, Duration::from_millis(400));
    }
}
