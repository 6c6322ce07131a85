//! Model-response pipeline for the Pixel Banana desktop pet.
//!
//! The GUI relays user text to a locally hosted language-model server and
//! shows the answer in a speech bubble. Everything between those two points
//! lives here:
//!
//! - [`ModelClient`] talks to an Ollama-style server with a two-pass retry
//!   and a canned fallback, so [`ModelClient::ask`] always yields a line.
//! - [`sanitize`] strips chain-of-thought markup from raw model output.
//! - [`bootstrap::Bootstrapper`] starts the server and pulls the model.
//! - [`weather::WeatherClient`] turns a city name into a one-line forecast,
//!   backed by [`cache::TtlCache`].
//! - [`scheduler`] decides which auto-bubble fires, given explicit cooldowns.

use std::sync::Arc;

use thiserror::Error;

use self::config::AskPolicy;
use self::transport::Transport;

pub mod bootstrap;
pub mod builder;
pub mod cache;
pub mod client;
pub mod config;
pub mod parser;
pub mod sanitize;
pub mod scheduler;
pub mod transport;
pub mod types;
pub mod weather;

pub use sanitize::{strip_thinking, Sanitizer, SOFT_STOPS};

/// Client for the local inference server.
///
/// Cheap to clone; clones share the underlying transport.
#[derive(Clone)]
pub struct ModelClient {
    transport: Arc<dyn Transport + Send + Sync>,
    model: String,
    policy: AskPolicy,
}

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Client error: {0}")]
    Client(String),

    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Server unreachable: {0}")]
    Unreachable(String),

    #[error("Timed out: {0}")]
    Timeout(String),

    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("JSON error: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("Protocol error: {0}")]
    Protocol(String),
}
