use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Default, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    #[default]
    User,
    Assistant,
}

/// Error body the server sends instead of a regular payload, both for plain
/// responses and for individual lines of a stream.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ServerError {
    pub error: String,
}
