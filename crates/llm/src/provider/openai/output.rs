use serde::Deserialize;

use crate::provider::DiscoveredModel;

/// One server-sent event of a streaming chat completion.
#[derive(Debug, Deserialize)]
pub(super) struct OpenAIStreamChunk {
    #[serde(default)]
    pub(super) choices: Vec<OpenAIStreamChoice>,
}

#[derive(Debug, Deserialize)]
pub(super) struct OpenAIStreamChoice {
    #[serde(default)]
    pub(super) delta: OpenAIDelta,
}

#[derive(Debug, Default, Deserialize)]
pub(super) struct OpenAIDelta {
    #[serde(default)]
    pub(super) content: Option<String>,
}

impl OpenAIStreamChunk {
    /// The text carried by the chunk, if any. Role-only and finish chunks carry none.
    pub(super) fn into_text(self) -> Option<String> {
        let text: String = self
            .choices
            .into_iter()
            .filter_map(|choice| choice.delta.content)
            .collect();

        (!text.is_empty()).then_some(text)
    }
}

/// An error object some compatible servers send inside the event stream.
#[derive(Debug, Deserialize)]
pub(super) struct OpenAIStreamError {
    pub(super) error: OpenAIErrorBody,
}

#[derive(Debug, Deserialize)]
pub(super) struct OpenAIErrorBody {
    pub(super) message: String,
}

/// Response of `GET /models`.
#[derive(Debug, Deserialize)]
pub(super) struct OpenAIModelsResponse {
    pub(super) data: Vec<OpenAIModel>,
}

#[derive(Debug, Deserialize)]
pub(super) struct OpenAIModel {
    pub(super) id: String,
}

impl From<OpenAIModel> for DiscoveredModel {
    fn from(model: OpenAIModel) -> Self {
        Self {
            id: model.id,
            label: None,
        }
    }
}
