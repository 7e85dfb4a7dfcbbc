//! Backoff for idempotent deal reads.
//!
//! Only failures where the request may never have reached the server
//! (connect errors and timeouts) are retried. Error statuses and decode
//! failures come back on the first attempt. Deposit polls and transition
//! requests never go through here: the watcher owns poll cadence, and a
//! transition is sent exactly once.

use std::future::Future;
use std::time::Duration;

/// Retry schedule for a read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadRetry {
    /// Attempts after the first one.
    pub max_retries: u32,
    /// Delay before the first retry; doubles for each later one.
    pub base_delay: Duration,
}

impl Default for ReadRetry {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(200),
        }
    }
}

impl ReadRetry {
    /// A single attempt.
    pub const NONE: Self = Self {
        max_retries: 0,
        base_delay: Duration::ZERO,
    };

    /// Delay before retry number `retry` (zero-based).
    pub fn delay_for(&self, retry: u32) -> Duration {
        self.base_delay.saturating_mul(2u32.saturating_pow(retry))
    }

    /// Send via `send`, backing off between retryable failures.
    pub(crate) async fn send<F, Fut>(
        &self,
        endpoint: &str,
        send: F,
    ) -> Result<reqwest::Response, reqwest::Error>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<reqwest::Response, reqwest::Error>>,
    {
        let mut retry = 0;
        loop {
            match send().await {
                Err(e) if retry < self.max_retries && is_retryable(&e) => {
                    let delay = self.delay_for(retry);
                    retry += 1;
                    tracing::warn!(
                        endpoint,
                        retry,
                        max_retries = self.max_retries,
                        error = %e,
                        "market API read failed, retrying in {delay:?}"
                    );
                    tokio::time::sleep(delay).await;
                }
                result => return result,
            }
        }
    }
}

fn is_retryable(e: &reqwest::Error) -> bool {
    e.is_connect() || e.is_timeout()
}
