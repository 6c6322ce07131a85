//! Data structures for the non-streaming `/api/chat` exchange.

use std::time::Duration;

use pixel_banana_macros::FromResponse;
use serde::{Deserialize, Serialize};

use super::Role;

/// A chat completion request.
///
/// The pipeline never streams chat output, so `stream` is always `false`.
#[derive(Serialize, Debug, Clone)]
pub struct ChatRequest {
    /// Model tag, e.g. `qwen3:1.7b`.
    pub model: String,
    /// Conversation so far. A system message, if any, comes first.
    pub messages: Vec<ChatMessage>,
    pub stream: bool,
    pub options: ChatOptions,
    /// Seconds the server keeps the model loaded after answering.
    pub keep_alive: u64,
}

impl ChatRequest {
    pub fn new(model: impl Into<String>, messages: Vec<ChatMessage>) -> Self {
        Self {
            model: model.into(),
            messages,
            stream: false,
            options: ChatOptions::default(),
            keep_alive: 0,
        }
    }

    pub fn options(mut self, options: ChatOptions) -> Self {
        self.options = options;
        self
    }

    pub fn keep_alive(mut self, keep_alive: Duration) -> Self {
        self.keep_alive = keep_alive.as_secs();
        self
    }
}

/// A single message of a conversation.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

/// Sampling options forwarded verbatim to the server.
#[derive(Serialize, Default, Debug, Clone, PartialEq)]
pub struct ChatOptions {
    /// Maximum number of tokens to generate.
    pub num_predict: u32,
    pub temperature: f32,
    /// Soft stop sequences; generation halts when one is produced.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop: Option<Vec<String>>,
    /// Context window size.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_ctx: Option<u32>,
}

/// Reply to a [`ChatRequest`].
///
/// Both fields are optional on the wire: a server error comes back as
/// `{"error": "..."}` with no message at all.
#[derive(Deserialize, Serialize, Default, FromResponse, Debug, Clone)]
pub struct ChatResponse {
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub message: Option<ChatResponseMessage>,
    #[serde(default)]
    pub done: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Deserialize, Serialize, Default, Debug, Clone)]
pub struct ChatResponseMessage {
    #[serde(default = "assistant_role")]
    pub role: Role,
    #[serde(default)]
    pub content: String,
}

fn assistant_role() -> Role {
    Role::Assistant
}

impl ChatResponse {
    /// Builds a successful reply; mostly useful for scripting mocks.
    pub fn with_content(content: impl Into<String>) -> Self {
        Self {
            message: Some(ChatResponseMessage {
                role: Role::Assistant,
                content: content.into(),
            }),
            done: true,
            ..Default::default()
        }
    }

    /// The assistant's text, empty when the server sent none.
    pub fn content(&self) -> &str {
        self.message
            .as_ref()
            .map(|m| m.content.as_str())
            .unwrap_or_default()
    }

    /// A reply that carries an error and no text is a failed call.
    pub fn is_failure(&self) -> bool {
        self.error.is_some() && self.content().is_empty()
    }
}
