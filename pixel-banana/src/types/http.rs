use std::time::Duration;

use crate::Result;
use bytes::Bytes;
use serde::Serialize;

/// Transport-agnostic description of one HTTP exchange.
///
/// `url` is either a path joined onto the transport's base URL
/// (`/api/chat`) or an absolute URL, which replaces the base entirely.
#[derive(Default, Debug, Clone)]
pub struct HttpRequest {
    pub url: String,
    pub verb: HttpVerb,
    pub query: Vec<(String, String)>,
    pub body: Option<serde_json::Value>,
    pub timeout: Option<Duration>,
}

#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpVerb {
    #[default]
    GET,
    POST,
}

#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Option<Bytes>,
}

impl HttpRequest {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    pub fn get(mut self) -> Self {
        self.verb = HttpVerb::GET;
        self
    }

    pub fn post(mut self) -> Self {
        self.verb = HttpVerb::POST;
        self
    }

    pub fn query(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.query.push((key.into(), value.to_string()));
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn body<T: Serialize>(mut self, body: T) -> Result<Self> {
        self.body = Some(serde_json::to_value(body)?);
        Ok(self)
    }

    /// The URL without its query string; what mocks and logs key on.
    pub fn path(&self) -> &str {
        self.url.split('?').next().unwrap_or(&self.url)
    }
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            body: Some(body.into()),
        }
    }

    /// A response carrying `value` serialized as JSON.
    pub fn json<T: Serialize>(status: u16, value: &T) -> Result<Self> {
        Ok(Self::new(status, serde_json::to_vec(value)?))
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Body decoded lossily as UTF-8; empty when there is no body.
    pub fn text(&self) -> String {
        self.body
            .as_ref()
            .map(|b| String::from_utf8_lossy(b).into_owned())
            .unwrap_or_default()
    }
}
