use std::sync::Arc;

#[cfg(feature = "metrics")]
use metrics::counter;
#[cfg(feature = "tracing")]
use tracing::{debug, instrument, warn};

use crate::builder::ModelClientBuilder;
use crate::config::AskPolicy;
use crate::sanitize::Sanitizer;
use crate::transport::{with_idle_timeout, Transport};
use crate::types::chat::{ChatMessage, ChatOptions, ChatRequest, ChatResponse};
use crate::types::generate::UnloadRequest;
use crate::types::pull::{PullRequest, PullStream};
use crate::types::{HttpRequest, HttpResponse, ListModelsResponse};
use crate::ModelClient;
use crate::{Error, Result};

/// How much of an error body is echoed back in a diagnostic reply.
const DIAGNOSTIC_BODY_CHARS: usize = 160;

impl ModelClient {
    pub fn builder() -> ModelClientBuilder {
        ModelClientBuilder::new()
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn policy(&self) -> &AskPolicy {
        &self.policy
    }

    pub fn transport(&self) -> Arc<dyn Transport + Send + Sync> {
        Arc::clone(&self.transport)
    }

    /// Asks the model with reasoning suppressed. See [`ModelClient::ask_with`].
    pub async fn ask(&self, prompt: &str, system: Option<&str>) -> String {
        self.ask_with(prompt, system, true).await
    }

    /// Returns a display-ready answer to `prompt`. Never fails.
    ///
    /// The first attempt uses the policy's regular sampling. If its sanitized
    /// output is empty (the model only produced reasoning, or the server could
    /// not be reached) a second attempt is made with a stricter system prompt
    /// and soft stop sequences. If that is empty too, a canned line from
    /// [`FallbackReplies`](crate::config::FallbackReplies) is returned.
    #[cfg_attr(feature = "tracing", instrument(skip(self, prompt, system)))]
    pub async fn ask_with(
        &self,
        prompt: &str,
        system: Option<&str>,
        suppress_reasoning: bool,
    ) -> String {
        let sanitizer = Sanitizer::new(self.policy.max_output_chars);

        let mut system_prompt = system.unwrap_or_default().trim().to_string();
        if suppress_reasoning {
            append_instruction(&mut system_prompt, &self.policy.no_reasoning_instruction);
        }

        let first = ChatOptions {
            num_predict: self.policy.num_predict,
            temperature: self.policy.temperature,
            stop: None,
            num_ctx: None,
        };
        let raw = self.attempt(conversation(&system_prompt, prompt), first).await;
        let answer = sanitizer.strip(&raw);

        #[cfg(feature = "metrics")]
        counter!("pixel_banana.ask_attempts_total", "attempt" => "1").increment(1);

        if !answer.is_empty() {
            return answer;
        }

        #[cfg(feature = "tracing")]
        debug!("first attempt produced nothing usable, retrying strictly");

        if suppress_reasoning {
            append_instruction(&mut system_prompt, &self.policy.strict_instruction);
        }
        let second = ChatOptions {
            num_predict: self.policy.num_predict,
            temperature: self.policy.temperature,
            stop: Some(self.policy.soft_stops.clone()),
            num_ctx: self.policy.retry_num_ctx,
        };
        let raw = self.attempt(conversation(&system_prompt, prompt), second).await;
        let answer = sanitizer.strip(&raw);

        #[cfg(feature = "metrics")]
        counter!("pixel_banana.ask_attempts_total", "attempt" => "2").increment(1);

        if !answer.is_empty() {
            return answer;
        }

        #[cfg(feature = "tracing")]
        debug!("second attempt produced nothing usable, using a canned reply");
        #[cfg(feature = "metrics")]
        counter!("pixel_banana.ask_fallbacks_total").increment(1);

        self.policy.fallback.pick(prompt).to_string()
    }

    /// Sends one chat request and returns the server's reply text.
    ///
    /// A failed exchange yields an empty string. A non-2xx status, an
    /// undecodable body or an error-only reply yields a bracketed diagnostic.
    async fn attempt(&self, messages: Vec<ChatMessage>, options: ChatOptions) -> String {
        let request = ChatRequest::new(self.model.clone(), messages)
            .options(options)
            .keep_alive(self.policy.keep_alive);

        match self.send_chat(request).await {
            Ok(response) => reply_text(&response),
            Err(_e) => {
                #[cfg(feature = "tracing")]
                warn!(error = %_e, "chat request failed");
                String::new()
            }
        }
    }

    async fn send_chat(&self, request: ChatRequest) -> Result<HttpResponse> {
        let request = HttpRequest::new("/api/chat")
            .post()
            .timeout(self.policy.request_timeout)
            .body(request)?;
        self.transport.send_http_request(request).await
    }

    /// Sends a chat request as-is and decodes the reply.
    ///
    /// # Errors
    ///
    /// Transport failures, [`Error::Status`] for a non-2xx reply, and
    /// [`Error::JsonParse`] for a body that is not a chat response.
    #[cfg_attr(feature = "tracing", instrument(skip(self, request)))]
    pub async fn chat(&self, request: ChatRequest) -> Result<ChatResponse> {
        let response = self.send_chat(request).await?;
        if !response.is_success() {
            return Err(Error::Status {
                status: response.status,
                body: response.text(),
            });
        }
        ChatResponse::from_response(&response)
    }

    /// `true` when the server answers the model listing with a 2xx status.
    #[cfg_attr(feature = "tracing", instrument(skip(self)))]
    pub async fn is_available(&self) -> bool {
        let request = HttpRequest::new("/api/tags")
            .get()
            .timeout(self.policy.probe_timeout);
        match self.transport.send_http_request(request).await {
            Ok(response) => response.is_success(),
            Err(_) => false,
        }
    }

    /// Installed model tags; empty when the server cannot be asked.
    #[cfg_attr(feature = "tracing", instrument(skip(self)))]
    pub async fn list_models(&self) -> Vec<String> {
        match self.installed_models().await {
            Ok(names) => names,
            Err(_e) => {
                #[cfg(feature = "tracing")]
                warn!(error = %_e, "listing models failed");
                Vec::new()
            }
        }
    }

    /// Installed model tags, with failures reported.
    pub async fn installed_models(&self) -> Result<Vec<String>> {
        let request = HttpRequest::new("/api/tags")
            .get()
            .timeout(self.policy.list_timeout);
        let response = self.transport.send_http_request(request).await?;
        if !response.is_success() {
            return Err(Error::Status {
                status: response.status,
                body: response.text(),
            });
        }
        Ok(ListModelsResponse::from_response(&response)?.names())
    }

    /// Asks the server to evict the model from memory. The server itself
    /// keeps running.
    #[cfg_attr(feature = "tracing", instrument(skip(self)))]
    pub async fn unload(&self) -> bool {
        let request = match HttpRequest::new("/api/generate")
            .post()
            .timeout(self.policy.unload_timeout)
            .body(UnloadRequest::new(self.model.clone()))
        {
            Ok(request) => request,
            Err(_) => return false,
        };
        match self.transport.send_http_request(request).await {
            Ok(response) => response.is_success(),
            Err(_e) => {
                #[cfg(feature = "tracing")]
                warn!(error = %_e, "unload request failed");
                false
            }
        }
    }

    /// Starts pulling `model` and returns its progress stream.
    ///
    /// A pull can take minutes, so there is no overall deadline. Instead the
    /// server must answer, and then keep sending, within
    /// [`AskPolicy::pull_idle_timeout`]; a stalled stream ends with
    /// [`Error::Timeout`].
    ///
    /// # Errors
    ///
    /// Transport failures, [`Error::Timeout`] when the server never answers,
    /// and [`Error::Status`] when the server refuses the pull.
    #[cfg_attr(feature = "tracing", instrument(skip(self)))]
    pub async fn pull(&self, model: &str) -> Result<PullStream> {
        let idle = self.policy.pull_idle_timeout;
        let request = HttpRequest::new("/api/pull")
            .post()
            .body(PullRequest::new(model))?;
        let byte_stream =
            tokio::time::timeout(idle, self.transport.send_http_stream_request(request))
                .await
                .map_err(|_| Error::Timeout("pull request got no response".to_string()))??;
        Ok(PullStream::from_bytes_stream(with_idle_timeout(
            byte_stream,
            idle,
        )))
    }
}

fn append_instruction(system_prompt: &mut String, instruction: &str) {
    if instruction.is_empty() {
        return;
    }
    if !system_prompt.is_empty() {
        system_prompt.push(' ');
    }
    system_prompt.push_str(instruction);
}

fn conversation(system_prompt: &str, prompt: &str) -> Vec<ChatMessage> {
    let mut messages = Vec::with_capacity(2);
    if !system_prompt.is_empty() {
        messages.push(ChatMessage::system(system_prompt));
    }
    messages.push(ChatMessage::user(prompt));
    messages
}

fn reply_text(response: &HttpResponse) -> String {
    if !response.is_success() {
        let body: String = response.text().chars().take(DIAGNOSTIC_BODY_CHARS).collect();
        return format!("[HTTP {}] {}", response.status, body);
    }
    match ChatResponse::from_response(response) {
        Ok(reply) if reply.is_failure() => {
            format!("[model error] {}", reply.error.unwrap_or_default())
        }
        Ok(reply) => reply.content().to_string(),
        Err(e) => format!("[protocol error] {}", e),
    }
}
