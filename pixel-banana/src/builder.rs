use std::sync::Arc;

#[cfg(feature = "tracing")]
use tracing::instrument;

use reqwest::Url;

use crate::config::{AskPolicy, PetConfig, DEFAULT_MODEL_NAME, DEFAULT_MODEL_URL};
use crate::transport::{ReqwestTransport, Transport};
use crate::{Error, ModelClient, Result};

/// A builder for constructing a [`ModelClient`].
///
/// - Uses the configured base URL, else `BANANA_MODEL_URL`, else `OLLAMA_HOST`,
///   else `http://127.0.0.1:11434`.
/// - Uses the configured model, else `BANANA_MODEL`, else `qwen3:1.7b`.
/// - Uses either `OLLAMA_API_KEY` or nothing for bearer auth.
/// - Uses a `reqwest`-based transport by default - [`ReqwestTransport`].
pub struct ModelClientBuilder {
    base_url: Option<String>,
    api_key: Option<String>,
    model: Option<String>,
    policy: AskPolicy,
    transport: Option<Arc<dyn Transport + Send + Sync>>,
}

impl ModelClientBuilder {
    /// Creates a new [`ModelClientBuilder`]. This method is called by [`ModelClient::builder`]
    pub(crate) fn new() -> Self {
        ModelClientBuilder {
            base_url: None,
            api_key: None,
            model: None,
            policy: AskPolicy::default(),
            transport: None,
        }
    }

    /// Takes server URL and model name from the pet's settings.
    pub fn config(self, config: &PetConfig) -> Self {
        self.base_url(config.model_url.clone())
            .model(config.model_name.clone())
    }

    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Replaces the default [`AskPolicy`].
    pub fn policy(mut self, policy: AskPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Sets a custom transport implementation for the client.
    ///
    /// For testing, use [`MockTransport`](crate::transport::MockTransport).
    pub fn transport(mut self, transport: Arc<dyn Transport + Send + Sync>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Builds the [`ModelClient`].
    ///
    /// # Errors
    ///
    /// Returns an [`Error::Client`](variant@Error::Client) if the base URL is
    /// invalid or [`ReqwestTransport`] cannot be initialized.
    #[cfg_attr(feature = "tracing", instrument(skip(self)))]
    pub fn build(self) -> Result<ModelClient> {
        let transport = if let Some(t) = self.transport {
            t
        } else {
            let base_url_str = self.base_url.unwrap_or_else(|| {
                std::env::var("BANANA_MODEL_URL")
                    .or_else(|_| std::env::var("OLLAMA_HOST"))
                    .unwrap_or_else(|_| DEFAULT_MODEL_URL.to_string())
            });
            let api_key = self
                .api_key
                .or_else(|| std::env::var("OLLAMA_API_KEY").ok());

            let base_url = Url::parse(&with_scheme(base_url_str.trim_end_matches('/')))
                .map_err(|e| Error::Client(format!("Invalid base URL: {}", e)))?;

            Arc::new(ReqwestTransport::new(base_url, api_key)?)
        };

        let model = self.model.unwrap_or_else(|| {
            std::env::var("BANANA_MODEL").unwrap_or_else(|_| DEFAULT_MODEL_NAME.to_string())
        });

        Ok(ModelClient {
            transport,
            model,
            policy: self.policy,
        })
    }
}

/// `OLLAMA_HOST` is often just `host:port`.
fn with_scheme(url: &str) -> String {
    if url.contains("://") {
        url.to_string()
    } else {
        format!("http://{}", url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_host_gets_http_scheme() {
        assert_eq!(with_scheme("127.0.0.1:11434"), "http://127.0.0.1:11434");
        assert_eq!(with_scheme("https://llm.local"), "https://llm.local");
    }
}
