//! The one `/api/generate` call the pipeline makes: an empty prompt with a
//! zero keep-alive, which asks the server to evict the model from memory.

use serde::Serialize;

#[derive(Serialize, Debug, Clone)]
pub struct UnloadRequest {
    pub model: String,
    pub prompt: String,
    pub stream: bool,
    pub keep_alive: u64,
}

impl UnloadRequest {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            prompt: String::new(),
            stream: false,
            keep_alive: 0,
        }
    }
}
