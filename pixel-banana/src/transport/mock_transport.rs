use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};

#[cfg(feature = "tracing")]
use tracing::instrument;

use async_trait::async_trait;
use bytes::Bytes;
use futures::{future, stream};
use futures::StreamExt;

use crate::transport::{ByteStream, Transport};
use crate::types::{HttpRequest, HttpResponse};
use crate::{Error, Result};

#[derive(Clone)]
enum Scripted {
    Respond(HttpResponse),
    Stream(Vec<Bytes>),
    /// Sends the chunks, then goes silent without closing.
    Stall(Vec<Bytes>),
    /// Accepts the connection and never answers.
    Hang,
    Refuse,
}

/// A scripted [`Transport`] for tests.
///
/// Replies are queued per request path (the URL without its query string).
/// Each request consumes the front of its queue, except that the last entry
/// stays in place and answers every later request. A path with nothing
/// queued behaves like a server that refuses connections.
///
/// Every request is recorded, so tests can assert how many calls were made.
#[derive(Clone, Default)]
pub struct MockTransport {
    scripts: Arc<Mutex<HashMap<String, VecDeque<Scripted>>>>,
    requests: Arc<Mutex<Vec<HttpRequest>>>,
}

impl MockTransport {
    /// Creates a new, empty [`MockTransport`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a buffered response for `path`.
    pub fn with_response(self, path: &str, response: HttpResponse) -> Self {
        self.push(path, Scripted::Respond(response));
        self
    }

    /// Queues a `200` response whose body is `value` serialized as JSON.
    pub fn with_json<T: serde::Serialize>(self, path: &str, value: &T) -> Self {
        let body = serde_json::to_vec(value).unwrap_or_default();
        self.with_response(path, HttpResponse::new(200, body))
    }

    /// Queues a `200` streamed response made of the given chunks.
    pub fn with_stream_chunks(self, path: &str, chunks: Vec<Bytes>) -> Self {
        self.push(path, Scripted::Stream(chunks));
        self
    }

    /// Queues a stream that sends `chunks` and then stalls forever.
    pub fn with_stalled_stream(self, path: &str, chunks: Vec<Bytes>) -> Self {
        self.push(path, Scripted::Stall(chunks));
        self
    }

    /// Queues a request that never gets an answer.
    pub fn with_hang(self, path: &str) -> Self {
        self.push(path, Scripted::Hang);
        self
    }

    /// Queues a refused connection for `path`.
    pub fn with_refusal(self, path: &str) -> Self {
        self.push(path, Scripted::Refuse);
        self
    }

    /// Every request sent so far, in order.
    pub fn requests(&self) -> Vec<HttpRequest> {
        lock(&self.requests).clone()
    }

    /// Number of requests sent to `path`.
    pub fn request_count(&self, path: &str) -> usize {
        lock(&self.requests)
            .iter()
            .filter(|r| r.path() == path)
            .count()
    }

    fn push(&self, path: &str, scripted: Scripted) {
        lock(&self.scripts)
            .entry(path.to_string())
            .or_default()
            .push_back(scripted);
    }

    fn next_reply(&self, request: &HttpRequest) -> Scripted {
        lock(&self.requests).push(request.clone());
        let mut scripts = lock(&self.scripts);
        match scripts.get_mut(request.path()) {
            Some(queue) if queue.len() > 1 => queue.pop_front().unwrap_or(Scripted::Refuse),
            Some(queue) => queue.front().cloned().unwrap_or(Scripted::Refuse),
            None => Scripted::Refuse,
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn refused(request: &HttpRequest) -> Error {
    Error::Unreachable(format!("mock: connection refused for {}", request.path()))
}

#[async_trait]
impl Transport for MockTransport {
    #[cfg_attr(feature = "tracing", instrument(skip(self, request)))]
    async fn send_http_request(&self, request: HttpRequest) -> Result<HttpResponse> {
        match self.next_reply(&request) {
            Scripted::Respond(response) => Ok(response),
            Scripted::Stream(chunks) => Ok(HttpResponse::new(200, chunks.concat())),
            Scripted::Stall(_) | Scripted::Hang => future::pending().await,
            Scripted::Refuse => Err(refused(&request)),
        }
    }

    #[cfg_attr(feature = "tracing", instrument(skip(self, request)))]
    async fn send_http_stream_request(&self, request: HttpRequest) -> Result<ByteStream> {
        match self.next_reply(&request) {
            Scripted::Stream(chunks) => Ok(stream::iter(chunks).map(Ok).boxed()),
            Scripted::Stall(chunks) => Ok(stream::iter(chunks)
                .map(Ok)
                .chain(stream::pending())
                .boxed()),
            Scripted::Hang => future::pending().await,
            Scripted::Respond(response) if response.is_success() => {
                let body = response.body.unwrap_or_default();
                Ok(stream::once(async move { Ok(body) }).boxed())
            }
            Scripted::Respond(response) => Err(Error::Status {
                status: response.status,
                body: response.text(),
            }),
            Scripted::Refuse => Err(refused(&request)),
        }
    }
}
