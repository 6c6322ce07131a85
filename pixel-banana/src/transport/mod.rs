use std::pin::Pin;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures::{stream, Stream, StreamExt};

use crate::types::{HttpRequest, HttpResponse};
use crate::{Error, Result};

mod mock_transport;
mod reqwest_transport;
mod retry;

pub use mock_transport::MockTransport;
pub use reqwest_transport::ReqwestTransport;
pub use retry::{RetryPolicy, RetryingTransport};

pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes>> + Send>>;

#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Sends a request and buffers the whole response.
    ///
    /// Any status code is a successful exchange; only failing to talk to the
    /// server at all is an error.
    async fn send_http_request(&self, request: HttpRequest) -> Result<HttpResponse>;

    /// Sends a request and returns the response body as a byte stream.
    ///
    /// A non-2xx status is reported as [`Error::Status`](crate::Error::Status).
    async fn send_http_stream_request(&self, request: HttpRequest) -> Result<ByteStream>;
}

/// Ends `stream` with [`Error::Timeout`] once no chunk has arrived for
/// `idle`. Slow but steady streams are never cut off.
pub fn with_idle_timeout(stream: ByteStream, idle: Duration) -> ByteStream {
    stream::unfold(Some(stream), move |state| async move {
        let mut inner = state?;
        match tokio::time::timeout(idle, inner.next()).await {
            Ok(Some(item)) => Some((item, Some(inner))),
            Ok(None) => None,
            Err(_) => Some((
                Err(Error::Timeout(format!("no data for {} ms", idle.as_millis()))),
                None,
            )),
        }
    })
    .boxed()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_idle_stream_ends_with_timeout() {
        let chunks = stream::iter(vec![Ok::<_, Error>(Bytes::from("a")), Ok(Bytes::from("b"))])
            .chain(stream::pending())
            .boxed();

        let items: Vec<Result<Bytes>> = with_idle_timeout(chunks, Duration::from_millis(20))
            .collect()
            .await;

        assert_eq!(items.len(), 3);
        assert!(matches!(items[2], Err(Error::Timeout(_))));
    }

    #[tokio::test]
    async fn test_finished_stream_passes_through() {
        let chunks = stream::iter(vec![Ok::<_, Error>(Bytes::from("only"))]).boxed();

        let items: Vec<Result<Bytes>> = with_idle_timeout(chunks, Duration::from_millis(20))
            .collect()
            .await;

        assert_eq!(items.len(), 1);
        assert!(matches!(&items[0], Ok(b) if b.as_ref() == b"only"));
    }
}
