//! Bounded-timeout, bounded-retry wrapper for calls to external collaborators.

use crate::documents::types::{DocumentError, Upstream};
use std::future::Future;
use std::time::Duration;

const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(200);

/// Timeout and retry budget applied to each external call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpstreamPolicy {
    /// Upper bound on a single attempt.
    pub timeout: Duration,
    /// Attempts made after the first one fails.
    pub retries: u32,
    /// Pause between attempts.
    pub retry_delay: Duration,
}

impl UpstreamPolicy {
    /// Policy with the given per-attempt timeout and retry count.
    pub fn new(timeout: Duration, retries: u32) -> Self {
        Self {
            timeout,
            retries,
            retry_delay: DEFAULT_RETRY_DELAY,
        }
    }

    /// Override the pause between attempts.
    pub fn with_retry_delay(mut self, retry_delay: Duration) -> Self {
        self.retry_delay = retry_delay;
        self
    }

    /// Same timeout, single attempt. For calls that are unsafe to repeat.
    pub fn without_retries(self) -> Self {
        Self { retries: 0, ..self }
    }

    /// Run `operation` under the policy.
    ///
    /// Each attempt is cut off after `timeout`. Only [`DocumentError::UpstreamUnavailable`]
    /// failures (including timeouts) are retried; `NotFound` and `InvalidArgument` return at once.
    pub async fn run<T, E, F, Fut>(
        &self,
        upstream: Upstream,
        mut operation: F,
    ) -> Result<T, DocumentError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Into<DocumentError>,
    {
        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            let error = match tokio::time::timeout(self.timeout, operation()).await {
                Ok(Ok(value)) => return Ok(value),
                Ok(Err(error)) => error.into(),
                Err(_) => DocumentError::upstream(
                    upstream,
                    format!("timed out after {}ms", self.timeout.as_millis()),
                ),
            };

            if !error.is_retryable() || attempt > self.retries {
                if error.is_retryable() {
                    tracing::error!(
                        %upstream,
                        attempts = attempt,
                        error = %error,
                        "Upstream call failed"
                    );
                }
                return Err(error);
            }

            tracing::warn!(%upstream, attempt, error = %error, "Upstream call failed; retrying");
            if !self.retry_delay.is_zero() {
                tokio::time::sleep(self.retry_delay).await;
            }
        }
    }
}
