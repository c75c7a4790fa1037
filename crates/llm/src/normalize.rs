//! Folds a conversation into the model, provider, token ceiling and flat
//! messages a provider call needs.
//!
//! The route starts at the configured defaults and every user turn updates it,
//! so the last user turn decides. A model only takes effect when the registry
//! knows it, a provider always does. A user turn without directives counts as
//! asking for the defaults. None of this fails: unknown or missing routing
//! silently falls back to the defaults.

use crate::{
    directive::{self, Route},
    messages::{ConversationMessage, FlatMessage, Role},
    registry::ModelRecord,
};

/// The outcome of normalization, consumed by a single dispatch.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ResolvedRequest {
    pub(crate) model: String,
    pub(crate) provider: String,
    pub(crate) max_tokens: u32,
    pub(crate) messages: Vec<FlatMessage>,
}

struct Fold {
    route: Route,
    messages: Vec<FlatMessage>,
}

/// Resolves the conversation against the given registry snapshot.
pub(crate) fn resolve(
    messages: Vec<ConversationMessage>,
    models: &[ModelRecord],
    defaults: &Route,
    default_max_tokens: u32,
) -> ResolvedRequest {
    let initial = Fold {
        route: defaults.clone(),
        messages: Vec::with_capacity(messages.len()),
    };

    let Fold { route, messages } = messages.into_iter().fold(initial, |mut fold, message| {
        if message.role != Role::User {
            fold.messages.push(FlatMessage::from(message));
            return fold;
        }

        let extracted = directive::extract(&message, defaults);

        if models.iter().any(|record| record.name == extracted.model) {
            fold.route.model = extracted.model;
        }

        fold.route.provider = extracted.provider;

        fold.messages.push(FlatMessage {
            role: message.role,
            content: extracted.content.flatten(),
        });

        fold
    });

    let max_tokens = ceiling(models, &route.model).unwrap_or(default_max_tokens);

    log::debug!(
        "Resolved conversation to model '{}' of provider '{}' ({max_tokens} tokens)",
        route.model,
        route.provider
    );

    ResolvedRequest {
        model: route.model,
        provider: route.provider,
        max_tokens,
        messages,
    }
}

fn ceiling(models: &[ModelRecord], model: &str) -> Option<u32> {
    models
        .iter()
        .find(|record| record.name == model)
        .and_then(|record| record.max_token_allowed)
}
