use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Author of a conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum Role {
    User,
    Assistant,
    System,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let role = match self {
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::System => "system",
        };

        f.write_str(role)
    }
}

/// One message of the conversation as sent by the client.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ConversationMessage {
    pub(crate) role: Role,
    pub(crate) content: MessageContent,
    /// Earlier tool calls attached to this turn. Carried along, never sent upstream.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) tool_invocations: Option<Vec<ToolInvocation>>,
    /// Model tag the client attached to the message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) model: Option<String>,
}

impl ConversationMessage {
    pub(crate) fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: MessageContent::Text(content.into()),
            tool_invocations: None,
            model: None,
        }
    }
}

/// Message content is either a plain string or an ordered list of typed parts.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub(crate) enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

impl MessageContent {
    /// The text directives are read from: the whole string, or the first text part.
    pub(crate) fn directive_text(&self) -> &str {
        match self {
            MessageContent::Text(text) => text,
            MessageContent::Parts(parts) => parts
                .iter()
                .find(|part| part.is_text())
                .and_then(|part| part.text.as_deref())
                .unwrap_or_default(),
        }
    }

    /// Collapses the content into a single string.
    ///
    /// Parts without text (images and the like) contribute an empty string, and
    /// parts are joined with a single space. This loses information on purpose,
    /// the providers only receive flat text.
    pub(crate) fn flatten(self) -> String {
        match self {
            MessageContent::Text(text) => text,
            MessageContent::Parts(parts) => parts
                .into_iter()
                .map(|part| part.text.unwrap_or_default())
                .collect::<Vec<_>>()
                .join(" "),
        }
    }
}

/// A typed content part such as `{"type": "text", "text": "..."}` or an image reference.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub(crate) struct ContentPart {
    #[serde(rename = "type")]
    pub(crate) kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) text: Option<String>,
    /// Everything else of the part, kept as received.
    #[serde(flatten)]
    pub(crate) extra: Map<String, Value>,
}

impl ContentPart {
    pub(crate) fn is_text(&self) -> bool {
        self.kind == "text"
    }
}

/// A tool call recorded on an earlier assistant turn.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ToolInvocation {
    pub(crate) tool_call_id: String,
    pub(crate) tool_name: String,
    #[serde(default)]
    pub(crate) args: Value,
    #[serde(default)]
    pub(crate) result: Value,
}

/// A message in the shape the providers receive: a role and flat text.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub(crate) struct FlatMessage {
    pub(crate) role: Role,
    pub(crate) content: String,
}

impl From<ConversationMessage> for FlatMessage {
    fn from(message: ConversationMessage) -> Self {
        Self {
            role: message.role,
            content: message.content.flatten(),
        }
    }
}

/// Response of the models endpoint.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct ModelsResponse {
    pub(crate) data: Vec<crate::registry::ModelRecord>,
}
