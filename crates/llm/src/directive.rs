//! Inline routing directives embedded in user messages.
//!
//! A client selects the model and provider for a conversation by prefixing a
//! user message with
//!
//! ```text
//! [Model: gpt-4o]
//!
//! [Provider: OpenAI]
//!
//! the actual prompt
//! ```
//!
//! The model directive must open the message, the provider directive may appear
//! anywhere. Both are removed from the text before it reaches a provider, whether
//! or not they name anything that exists. A message without directives routes to
//! the configured defaults; this is not an error.

use std::sync::LazyLock;

use regex::Regex;

use crate::messages::{ConversationMessage, MessageContent};

static MODEL_DIRECTIVE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\[Model: (.*?)\]\n\n").expect("model directive pattern is valid"));

static PROVIDER_DIRECTIVE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[Provider: (.*?)\]\n\n").expect("provider directive pattern is valid"));

/// What a message asks for, before any lookup against the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum RoutingHint {
    Unspecified,
    Model(String),
    Provider(String),
    Both { model: String, provider: String },
}

impl RoutingHint {
    pub(crate) fn parse(text: &str) -> Self {
        let model = capture(&MODEL_DIRECTIVE, text);
        let provider = capture(&PROVIDER_DIRECTIVE, text);

        match (model, provider) {
            (None, None) => Self::Unspecified,
            (Some(model), None) => Self::Model(model),
            (None, Some(provider)) => Self::Provider(provider),
            (Some(model), Some(provider)) => Self::Both { model, provider },
        }
    }

    pub(crate) fn model(&self) -> Option<&str> {
        match self {
            Self::Model(model) | Self::Both { model, .. } => Some(model),
            Self::Unspecified | Self::Provider(_) => None,
        }
    }

    pub(crate) fn provider(&self) -> Option<&str> {
        match self {
            Self::Provider(provider) | Self::Both { provider, .. } => Some(provider),
            Self::Unspecified | Self::Model(_) => None,
        }
    }
}

fn capture(pattern: &Regex, text: &str) -> Option<String> {
    pattern
        .captures(text)
        .and_then(|captures| captures.get(1))
        .map(|name| name.as_str().to_string())
}

/// Removes the first model directive and then the first provider directive.
pub(crate) fn strip(text: &str) -> String {
    let without_model = MODEL_DIRECTIVE.replace(text, "");
    PROVIDER_DIRECTIVE.replace(&without_model, "").into_owned()
}

/// Renders directives in the form [`RoutingHint::parse`] reads them.
pub(crate) fn render(model: &str, provider: &str) -> String {
    format!("[Model: {model}]\n\n[Provider: {provider}]\n\n")
}

/// A model and provider pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Route {
    pub(crate) model: String,
    pub(crate) provider: String,
}

/// A user message with its directives resolved against the defaults and removed from the text.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ExtractedMessage {
    pub(crate) model: String,
    pub(crate) provider: String,
    pub(crate) content: MessageContent,
}

/// Parses and strips the directives of a user message.
///
/// Directives are read from the first text part only, but stripped from every
/// text part. Parts that are not text are returned unchanged.
pub(crate) fn extract(message: &ConversationMessage, defaults: &Route) -> ExtractedMessage {
    let hint = RoutingHint::parse(message.content.directive_text());

    let content = match &message.content {
        MessageContent::Text(text) => MessageContent::Text(strip(text)),
        MessageContent::Parts(parts) => MessageContent::Parts(
            parts
                .iter()
                .cloned()
                .map(|mut part| {
                    if part.is_text() {
                        part.text = part.text.as_deref().map(strip);
                    }
                    part
                })
                .collect(),
        ),
    };

    ExtractedMessage {
        model: hint.model().unwrap_or(defaults.model.as_str()).to_string(),
        provider: hint.provider().unwrap_or(defaults.provider.as_str()).to_string(),
        content,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn defaults() -> Route {
        Route {
            model: "claude-3-5-sonnet-latest".to_string(),
            provider: "Anthropic".to_string(),
        }
    }

    #[test]
    fn parses_both_directives() {
        let hint = RoutingHint::parse("[Model: gpt-4o]\n\n[Provider: OpenAI]\n\nWrite a haiku");

        assert_eq!(
            hint,
            RoutingHint::Both {
                model: "gpt-4o".to_string(),
                provider: "OpenAI".to_string()
            }
        );
    }

    #[test]
    fn model_directive_must_open_the_message() {
        let hint = RoutingHint::parse("Hello\n[Model: gpt-4o]\n\nthere");

        assert_eq!(hint, RoutingHint::Unspecified);
    }

    #[test]
    fn provider_directive_may_appear_anywhere() {
        let hint = RoutingHint::parse("Please answer.\n[Provider: Groq]\n\nThanks");

        assert_eq!(hint, RoutingHint::Provider("Groq".to_string()));
        assert_eq!(hint.model(), None);
        assert_eq!(hint.provider(), Some("Groq"));
    }

    #[test]
    fn directive_needs_a_blank_line() {
        assert_eq!(RoutingHint::parse("[Model: gpt-4o]\nHi"), RoutingHint::Unspecified);
    }

    #[test]
    fn strips_both_directives() {
        let stripped = strip("[Model: gpt-4o]\n\n[Provider: OpenAI]\n\nWrite a haiku");

        assert_eq!(stripped, "Write a haiku");
    }

    #[test]
    fn strips_only_the_first_occurrence() {
        let stripped = strip("[Provider: A]\n\n[Provider: B]\n\nhi");

        assert_eq!(stripped, "[Provider: B]\n\nhi");
    }

    #[test]
    fn render_matches_parse() {
        let text = format!("{}body", render("gpt-4", "openai"));

        assert_eq!(
            RoutingHint::parse(&text),
            RoutingHint::Both {
                model: "gpt-4".to_string(),
                provider: "openai".to_string()
            }
        );
        assert_eq!(strip(&text), "body");
    }

    #[test]
    fn extract_without_directives_uses_defaults() {
        let message = ConversationMessage::user("Just a question");
        let extracted = extract(&message, &defaults());

        assert_eq!(extracted.model, "claude-3-5-sonnet-latest");
        assert_eq!(extracted.provider, "Anthropic");
        assert_eq!(extracted.content, MessageContent::Text("Just a question".to_string()));
    }

    #[test]
    fn extract_strips_unknown_directives_too() {
        let message = ConversationMessage::user("[Model: no-such-model]\n\n[Provider: Nowhere]\n\nHi");
        let extracted = extract(&message, &defaults());

        assert_eq!(extracted.model, "no-such-model");
        assert_eq!(extracted.provider, "Nowhere");
        assert_eq!(extracted.content, MessageContent::Text("Hi".to_string()));
    }

    #[test]
    fn extract_from_parts() {
        let message: ConversationMessage = serde_json::from_value(json!({
            "role": "user",
            "content": [
                {"type": "text", "text": "[Model: gpt-4o]\n\n[Provider: OpenAI]\n\nWhat is in this image?"},
                {"type": "image", "image": "https://example.com/cat.png"},
                {"type": "text", "text": "[Provider: Other]\n\nand this one"}
            ]
        }))
        .unwrap();

        let extracted = extract(&message, &defaults());

        assert_eq!(extracted.model, "gpt-4o");
        assert_eq!(extracted.provider, "OpenAI");

        insta::assert_json_snapshot!(extracted.content, @r#"
        [
          {
            "type": "text",
            "text": "What is in this image?"
          },
          {
            "type": "image",
            "image": "https://example.com/cat.png"
          },
          {
            "type": "text",
            "text": "and this one"
          }
        ]
        "#);
    }

    #[test]
    fn extract_does_not_touch_the_original() {
        let message = ConversationMessage::user("[Model: gpt-4o]\n\nHi");
        let _ = extract(&message, &defaults());

        assert_eq!(message.content, MessageContent::Text("[Model: gpt-4o]\n\nHi".to_string()));
    }
}
