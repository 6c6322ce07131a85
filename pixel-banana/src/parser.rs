//! Newline-delimited JSON parsing for streamed server responses.

use std::marker::PhantomData;
use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use futures::Stream;
use serde::de::DeserializeOwned;

use crate::types::ServerError;
use crate::Result;

/// Lets an endpoint-specific event enum be built from a decoded line, an
/// error body, or a line that could not be decoded.
pub trait StreamEventExt<M>: Sized {
    fn from_message(msg: M) -> Self;

    fn from_error(err: String) -> Self;

    fn partial(partial: String, error: Option<String>) -> Self;
}

/// Splits a byte stream into lines and decodes each one.
///
/// The error shape `{"error": ".."}` is tried before `M`, whose fields may all
/// be optional. Blank
/// lines are skipped; a trailing line without a newline is decoded when the
/// stream ends.
pub struct NdjsonParser<S, M, E>
where
    S: Stream<Item = Result<Bytes>> + Send + Unpin,
    M: DeserializeOwned,
    E: StreamEventExt<M>,
{
    inner: S,
    buffer: Vec<u8>,
    finished: bool,
    _marker: PhantomData<(M, E)>,
}

impl<S, M, E> NdjsonParser<S, M, E>
where
    S: Stream<Item = Result<Bytes>> + Send + Unpin,
    M: DeserializeOwned,
    E: StreamEventExt<M>,
{
    pub fn new(stream: S) -> Self {
        Self {
            inner: stream,
            buffer: Vec::new(),
            finished: false,
            _marker: PhantomData,
        }
    }

    fn decode_line(line: &str) -> E {
        if let Ok(err) = serde_json::from_str::<ServerError>(line) {
            return E::from_error(err.error);
        }
        match serde_json::from_str::<M>(line) {
            Ok(msg) => E::from_message(msg),
            Err(e) => E::partial(line.to_string(), Some(e.to_string())),
        }
    }

    /// Next complete, non-blank line in the buffer, if any.
    fn next_line(&mut self) -> Option<E> {
        while let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let line_bytes: Vec<u8> = self.buffer.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&line_bytes);
            let line = line.trim();
            if !line.is_empty() {
                return Some(Self::decode_line(line));
            }
        }
        None
    }
}

impl<S, M, E> Stream for NdjsonParser<S, M, E>
where
    S: Stream<Item = Result<Bytes>> + Send + Unpin,
    M: DeserializeOwned + Unpin,
    E: StreamEventExt<M> + Unpin,
{
    type Item = Result<E>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();

        loop {
            if let Some(event) = this.next_line() {
                return Poll::Ready(Some(Ok(event)));
            }
            if this.finished {
                return Poll::Ready(None);
            }

            match Pin::new(&mut this.inner).poll_next(cx) {
                Poll::Ready(Some(Ok(bytes))) => this.buffer.extend_from_slice(&bytes),
                Poll::Ready(Some(Err(e))) => return Poll::Ready(Some(Err(e))),
                Poll::Ready(None) => {
                    this.finished = true;
                    let rest = String::from_utf8_lossy(&this.buffer).trim().to_string();
                    this.buffer.clear();
                    if !rest.is_empty() {
                        return Poll::Ready(Some(Ok(Self::decode_line(&rest))));
                    }
                }
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}
