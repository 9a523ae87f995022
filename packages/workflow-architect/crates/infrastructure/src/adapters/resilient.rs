use async_trait::async_trait;
use domain::ports::http::{HttpResponse, HttpTransport, TransportError};
use std::time::Duration;
use tracing::warn;

/// Retries transient failures with a linearly growing delay:
/// `step * attempt` after each failed attempt.
pub struct ResilientClient<T> {
    inner: T,
    max_attempts: u32,
    backoff_step: Duration,
}

impl<T: HttpTransport> ResilientClient<T> {
    pub fn new(inner: T, max_attempts: u32, backoff_step: Duration) -> Self {
        Self {
            inner,
            max_attempts: max_attempts.max(1),
            backoff_step,
        }
    }

    pub fn retry_delay(&self, attempt: u32) -> Duration {
        self.backoff_step.saturating_mul(attempt)
    }
}

#[async_trait]
impl<T: HttpTransport> HttpTransport for ResilientClient<T> {
    async fn get(
        &self,
        url: &str,
        bearer_token: Option<&str>,
    ) -> Result<HttpResponse, TransportError> {
        let mut attempt = 1;
        loop {
            let outcome = self.inner.get(url, bearer_token).await;

            let retryable = match &outcome {
                Ok(response) => response.is_retryable(),
                Err(e) => e.is_transient(),
            };
            if !retryable || attempt >= self.max_attempts {
                return outcome;
            }

            let delay = self.retry_delay(attempt);
            match &outcome {
                Ok(response) => warn!(
                    "GET {} returned {}, retrying in {:?} ({}/{})",
                    url, response.status, delay, attempt, self.max_attempts
                ),
                Err(e) => warn!(
                    "GET {} failed: {}, retrying in {:?} ({}/{})",
                    url, e, delay, attempt, self.max_attempts
                ),
            }
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }
}
