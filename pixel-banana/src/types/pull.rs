//! Data structures for the streamed `/api/pull` exchange.

use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use futures::Stream;
use serde::{Deserialize, Serialize};

use crate::parser::{NdjsonParser, StreamEventExt};
use crate::Result;

#[derive(Serialize, Debug, Clone)]
pub struct PullRequest {
    pub name: String,
}

impl PullRequest {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// One status line of a pull, e.g. `{"status":"pulling 8eeb52df","total":..}`.
#[derive(Deserialize, Serialize, Default, Debug, Clone, PartialEq)]
pub struct PullStatus {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub digest: Option<String>,
    #[serde(default)]
    pub total: Option<u64>,
    #[serde(default)]
    pub completed: Option<u64>,
}

#[derive(Debug, PartialEq)]
pub enum PullStreamEvent {
    Status(PullStatus),
    Error(String),
    /// A line that was neither a status nor an error body.
    Partial {
        partial: String,
        error: Option<String>,
    },
}

impl StreamEventExt<PullStatus> for PullStreamEvent {
    fn from_message(msg: PullStatus) -> Self {
        PullStreamEvent::Status(msg)
    }

    fn from_error(err: String) -> Self {
        PullStreamEvent::Error(err)
    }

    fn partial(partial: String, error: Option<String>) -> Self {
        PullStreamEvent::Partial { partial, error }
    }
}

/// What a progress callback sees for every status line.
#[derive(Debug, Clone, PartialEq)]
pub struct PullProgress {
    pub status: String,
    pub completed: Option<u64>,
    pub total: Option<u64>,
    /// `completed * 100 / total`, when both are known and `total > 0`.
    pub percent: Option<u8>,
}

impl From<&PullStatus> for PullProgress {
    fn from(status: &PullStatus) -> Self {
        let percent = match (status.completed, status.total) {
            (Some(done), Some(total)) if total > 0 => {
                Some((done.min(total).saturating_mul(100) / total) as u8)
            }
            _ => None,
        };
        PullProgress {
            status: status.status.clone(),
            completed: status.completed,
            total: status.total,
            percent,
        }
    }
}

/// Stream of [`PullStreamEvent`]s returned by [`ModelClient::pull`](crate::ModelClient::pull).
pub struct PullStream {
    pub inner: Pin<Box<dyn Stream<Item = Result<PullStreamEvent>> + Send>>,
}

impl Stream for PullStream {
    type Item = Result<PullStreamEvent>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner.as_mut().poll_next(cx)
    }
}

impl PullStream {
    pub fn from_bytes_stream<S>(stream: S) -> Self
    where
        S: Stream<Item = Result<Bytes>> + Send + Unpin + 'static,
    {
        let parser = NdjsonParser::<S, PullStatus, PullStreamEvent>::new(stream);
        PullStream {
            inner: Box::pin(parser),
        }
    }
}
