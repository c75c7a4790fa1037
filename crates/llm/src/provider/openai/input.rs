use serde::Serialize;

use crate::{dispatch::TextRequest, messages::Role};

/// Request body for the OpenAI Chat Completions API.
///
/// Only the fields this service produces are modelled. Anything else a caller wants
/// to send is merged into the serialized body from the request overrides.
#[derive(Debug, Serialize)]
pub(super) struct OpenAIRequest {
    /// ID of the model to use.
    pub(super) model: String,

    /// The system prompt followed by the conversation.
    pub(super) messages: Vec<OpenAIMessage>,

    /// Upper bound for generated tokens.
    ///
    /// The older `max_tokens` name is used as OpenAI-compatible servers (Ollama,
    /// LM Studio, Groq and friends) understand it, unlike `max_completion_tokens`.
    pub(super) max_tokens: u32,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub(super) temperature: Option<f32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub(super) top_p: Option<f32>,

    /// Up to 4 sequences where the API will stop generating further tokens.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(super) stop: Option<Vec<String>>,

    /// Deltas are sent as data-only server-sent events, terminated by `data: [DONE]`.
    pub(super) stream: bool,
}

#[derive(Debug, Serialize)]
pub(super) struct OpenAIMessage {
    pub(super) role: Role,
    pub(super) content: String,
}

impl From<TextRequest> for OpenAIRequest {
    fn from(request: TextRequest) -> Self {
        let TextRequest {
            model,
            system,
            max_tokens,
            messages,
            temperature,
            top_p,
            stop,
            overrides: _,
        } = request;

        let system = (!system.is_empty()).then(|| OpenAIMessage {
            role: Role::System,
            content: system,
        });

        let messages = system
            .into_iter()
            .chain(messages.into_iter().map(|message| OpenAIMessage {
                role: message.role,
                content: message.content,
            }))
            .collect();

        Self {
            model,
            messages,
            max_tokens,
            temperature,
            top_p,
            stop,
            stream: true,
        }
    }
}
