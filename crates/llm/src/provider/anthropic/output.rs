use serde::Deserialize;

use crate::provider::DiscoveredModel;

/// Server-sent events of the Messages streaming API.
///
/// See: https://docs.anthropic.com/en/api/messages-streaming
///
/// Event flow for a typical streaming response:
/// 1. `message_start`
/// 2. `content_block_start`
/// 3. `content_block_delta` (multiple)
/// 4. `content_block_stop`
/// 5. `message_delta`
/// 6. `message_stop`
///
/// Only the events carrying text or ending the stream are modelled.
#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
pub(super) enum AnthropicStreamEvent {
    /// Incremental update to a content block.
    #[serde(rename = "content_block_delta")]
    ContentBlockDelta { delta: AnthropicBlockDelta },

    /// End of the streaming response.
    #[serde(rename = "message_stop")]
    MessageStop,

    /// The stream ends after an error.
    #[serde(rename = "error")]
    Error { error: AnthropicStreamError },

    /// Metadata, pings and anything added to the protocol later.
    #[serde(other)]
    Other,
}

/// Delta content for a content block.
#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
pub(super) enum AnthropicBlockDelta {
    /// Text fragment to append to the current text block.
    #[serde(rename = "text_delta")]
    Text { text: String },

    /// Tool arguments, thinking and similar deltas carry no answer text.
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
pub(super) struct AnthropicStreamError {
    /// For example "overloaded_error" or "authentication_error".
    #[serde(rename = "type")]
    pub(super) error_type: String,
    pub(super) message: String,
}

/// Response of `GET /models`.
#[derive(Debug, Deserialize)]
pub(super) struct AnthropicModelsResponse {
    pub(super) data: Vec<AnthropicModel>,
}

#[derive(Debug, Deserialize)]
pub(super) struct AnthropicModel {
    pub(super) id: String,
    #[serde(default)]
    pub(super) display_name: Option<String>,
}

impl From<AnthropicModel> for DiscoveredModel {
    fn from(model: AnthropicModel) -> Self {
        Self {
            id: model.id,
            label: model.display_name,
        }
    }
}
