use serde::Serialize;

use crate::{dispatch::TextRequest, messages::Role};

/// Request body for the Anthropic Messages API.
///
/// See the [Anthropic API Reference](https://docs.anthropic.com/en/api/messages).
#[derive(Debug, Serialize)]
pub(super) struct AnthropicRequest {
    /// The model that will complete your prompt.
    pub(super) model: String,

    /// Input messages, alternating between user and assistant turns.
    pub(super) messages: Vec<AnthropicMessage>,

    /// System prompt.
    ///
    /// The Messages API has no system role, so system turns of the conversation
    /// are appended here after the configured prompt.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(super) system: Option<String>,

    /// The maximum number of tokens to generate before stopping.
    pub(super) max_tokens: u32,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub(super) temperature: Option<f32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub(super) top_p: Option<f32>,

    /// Custom text sequences that will cause the model to stop generating.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(super) stop_sequences: Option<Vec<String>>,

    pub(super) stream: bool,
}

/// A message in the conversation with Claude.
#[derive(Debug, Serialize)]
pub(super) struct AnthropicMessage {
    /// Either "user" or "assistant".
    pub(super) role: Role,
    pub(super) content: String,
}

impl From<TextRequest> for AnthropicRequest {
    fn from(request: TextRequest) -> Self {
        let mut system: Vec<String> = Some(request.system).filter(|s| !s.is_empty()).into_iter().collect();
        let mut messages = Vec::with_capacity(request.messages.len());

        for message in request.messages {
            match message.role {
                Role::System => system.push(message.content),
                Role::User | Role::Assistant => messages.push(AnthropicMessage {
                    role: message.role,
                    content: message.content,
                }),
            }
        }

        Self {
            model: request.model,
            messages,
            system: (!system.is_empty()).then(|| system.join("\n\n")),
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            top_p: request.top_p,
            stop_sequences: request.stop,
            stream: true,
        }
    }
}
