use pixel_banana_macros::FromResponse;
use serde::{Deserialize, Serialize};

/// Response of `GET /api/tags`.
///
/// Ollama answers with a `models` array; OpenAI-flavoured servers answer
/// with `data`. Both are accepted.
#[derive(Deserialize, Serialize, Default, FromResponse, Debug)]
pub struct ListModelsResponse {
    #[serde(default)]
    pub models: Vec<InstalledModel>,
    #[serde(default)]
    pub data: Vec<InstalledModel>,
}

/// One installed model. Depending on the server the tag is reported as
/// `name`, `model`, or both.
#[derive(Deserialize, Serialize, Default, Debug, Clone)]
pub struct InstalledModel {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub size: Option<u64>,
}

impl InstalledModel {
    pub fn tag(&self) -> Option<&str> {
        self.name
            .as_deref()
            .filter(|n| !n.is_empty())
            .or_else(|| self.model.as_deref().filter(|m| !m.is_empty()))
    }
}

impl ListModelsResponse {
    /// Model tags, taken from `models` unless that array is empty.
    pub fn names(&self) -> Vec<String> {
        let entries = if self.models.is_empty() {
            &self.data
        } else {
            &self.models
        };
        entries
            .iter()
            .filter_map(InstalledModel::tag)
            .map(str::to_string)
            .collect()
    }
}

/// Base name of a model tag: everything before the first `:`.
pub fn base_model_name(tag: &str) -> &str {
    tag.split(':').next().unwrap_or(tag)
}
