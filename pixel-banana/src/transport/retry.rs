use std::time::Duration;

#[cfg(feature = "metrics")]
use metrics::counter;
#[cfg(feature = "tracing")]
use tracing::{debug, instrument};

use async_trait::async_trait;

use crate::transport::{ByteStream, Transport};
use crate::types::{HttpRequest, HttpResponse};
use crate::Result;

/// Which responses are worth asking again for, and how long to wait.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,
    /// Wait before retry `n` (1-based) is `backoff * 2^(n-1)`.
    pub backoff: Duration,
    pub retry_statuses: Vec<u16>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            backoff: Duration::from_millis(200),
            retry_statuses: vec![429, 500, 502, 503, 504],
        }
    }
}

impl RetryPolicy {
    pub fn delay_for(&self, retry: u32) -> Duration {
        self.backoff
            .saturating_mul(2u32.saturating_pow(retry.saturating_sub(1)))
    }

    fn should_retry(&self, status: u16) -> bool {
        self.retry_statuses.contains(&status)
    }
}

/// Wraps another [`Transport`] and repeats buffered requests that come back
/// with a transient status.
///
/// Connection failures and every other status are returned immediately.
/// Streamed requests are passed through untouched.
pub struct RetryingTransport<T> {
    inner: T,
    policy: RetryPolicy,
}

impl<T: Transport> RetryingTransport<T> {
    pub fn new(inner: T, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }
}

#[async_trait]
impl<T: Transport> Transport for RetryingTransport<T> {
    #[cfg_attr(feature = "tracing", instrument(skip(self, request), fields(url = %request.url)))]
    async fn send_http_request(&self, request: HttpRequest) -> Result<HttpResponse> {
        let mut retry = 0;
        loop {
            let response = self.inner.send_http_request(request.clone()).await?;
            if retry >= self.policy.max_retries || !self.policy.should_retry(response.status) {
                return Ok(response);
            }
            retry += 1;

            #[cfg(feature = "tracing")]
            debug!(status = response.status, retry, "transient status, retrying");
            #[cfg(feature = "metrics")]
            counter!("pixel_banana.http_retries_total").increment(1);

            tokio::time::sleep(self.policy.delay_for(retry)).await;
        }
    }

    async fn send_http_stream_request(&self, request: HttpRequest) -> Result<ByteStream> {
        self.inner.send_http_stream_request(request).await
    }
}
