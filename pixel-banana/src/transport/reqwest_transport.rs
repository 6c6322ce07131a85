#[cfg(feature = "tracing")]
use tracing::instrument;

use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::{Client, Url};

use crate::transport::{ByteStream, Transport};
use crate::types::{HttpRequest, HttpResponse, HttpVerb};
use crate::{Error, Result};

/// Upper bound on establishing a TCP connection, whatever the request.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// [`Transport`] backed by `reqwest`.
///
/// Relative request URLs are joined onto `base_url`; absolute ones (the
/// weather endpoints) are used as-is.
pub struct ReqwestTransport {
    client: Client,
    base_url: Url,
    api_key: Option<String>,
}

impl ReqwestTransport {
    /// Creates a new `ReqwestTransport`.
    ///
    /// # Errors
    ///
    /// Returns an [`Error::Client`] if the `reqwest` client cannot be built.
    pub fn new(base_url: Url, api_key: Option<String>) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| Error::Client(e.to_string()))?;
        Ok(Self {
            client,
            base_url,
            api_key,
        })
    }

    async fn build_and_send_request(&self, request: HttpRequest) -> Result<reqwest::Response> {
        let url = self
            .base_url
            .join(&request.url)
            .map_err(|e| Error::Client(e.to_string()))?;

        let mut request_builder = match request.verb {
            HttpVerb::GET => self.client.get(url),
            HttpVerb::POST => self.client.post(url),
        };

        if !request.query.is_empty() {
            request_builder = request_builder.query(&request.query);
        }

        if let Some(timeout) = request.timeout {
            request_builder = request_builder.timeout(timeout);
        }

        if let Some(api_key) = &self.api_key {
            request_builder = request_builder.bearer_auth(api_key);
        }

        if let Some(body) = request.body {
            request_builder = request_builder.json(&body);
        }

        request_builder.send().await.map_err(|e| {
            if e.is_connect() {
                Error::Unreachable(e.to_string())
            } else {
                Error::Transport(e)
            }
        })
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    #[cfg_attr(feature = "tracing", instrument(skip(self, request), fields(url = %request.url)))]
    async fn send_http_request(&self, request: HttpRequest) -> Result<HttpResponse> {
        let response = self.build_and_send_request(request).await?;
        let status = response.status().as_u16();
        let body = response.bytes().await.map_err(Error::Transport)?;
        Ok(HttpResponse {
            status,
            body: Some(body),
        })
    }

    #[cfg_attr(feature = "tracing", instrument(skip(self, request), fields(url = %request.url)))]
    async fn send_http_stream_request(&self, request: HttpRequest) -> Result<ByteStream> {
        let response = self.build_and_send_request(request).await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Status {
                status: status.as_u16(),
                body,
            });
        }
        let stream = response
            .bytes_stream()
            .map(|item| item.map_err(Error::Transport))
            .boxed();
        Ok(stream)
    }
}
