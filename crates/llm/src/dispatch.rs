//! Turns a resolved request into a running provider stream.

use secrecy::SecretString;
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::{
    messages::FlatMessage,
    normalize::ResolvedRequest,
    provider::{Provider, TextStream},
};

/// Caller supplied generation settings.
///
/// The typed fields replace the computed values. Everything else is copied into
/// the provider request body as is, replacing fields of the same name.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct StreamOptions {
    #[serde(default)]
    pub(crate) system: Option<String>,
    #[serde(default)]
    pub(crate) max_tokens: Option<u32>,
    #[serde(default)]
    pub(crate) temperature: Option<f32>,
    #[serde(default)]
    pub(crate) top_p: Option<f32>,
    #[serde(default)]
    pub(crate) stop: Option<Vec<String>>,
    #[serde(flatten)]
    pub(crate) extra: Map<String, Value>,
}

/// Everything a provider needs to start a completion.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct TextRequest {
    pub(crate) model: String,
    pub(crate) system: String,
    pub(crate) max_tokens: u32,
    pub(crate) messages: Vec<FlatMessage>,
    pub(crate) temperature: Option<f32>,
    pub(crate) top_p: Option<f32>,
    pub(crate) stop: Option<Vec<String>>,
    /// Raw fields merged into the provider request body.
    pub(crate) overrides: Map<String, Value>,
}

impl TextRequest {
    pub(crate) fn new(request: ResolvedRequest, system: impl Into<String>) -> Self {
        Self {
            model: request.model,
            system: system.into(),
            max_tokens: request.max_tokens,
            messages: request.messages,
            temperature: None,
            top_p: None,
            stop: None,
            overrides: Map::new(),
        }
    }

    /// Applies caller options on top of the computed values.
    pub(crate) fn with_options(self, options: StreamOptions) -> Self {
        let StreamOptions {
            system,
            max_tokens,
            temperature,
            top_p,
            stop,
            extra,
        } = options;

        Self {
            system: system.unwrap_or(self.system),
            max_tokens: max_tokens.unwrap_or(self.max_tokens),
            temperature: temperature.or(self.temperature),
            top_p: top_p.or(self.top_p),
            stop: stop.or(self.stop),
            overrides: self.overrides.into_iter().chain(extra).collect(),
            ..self
        }
    }
}

/// A model bound to its provider and the credentials to call it with.
pub(crate) struct ModelHandle<'a> {
    pub(crate) provider: &'a dyn Provider,
    pub(crate) model: String,
    pub(crate) api_key: Option<SecretString>,
}

impl ModelHandle<'_> {
    /// Starts the stream. Provider errors are passed on unchanged.
    pub(crate) async fn stream_text(self, mut request: TextRequest) -> crate::Result<TextStream> {
        request.model = self.model;

        log::debug!(
            "Dispatching {} messages to model '{}' of provider '{}' with a ceiling of {} tokens",
            request.messages.len(),
            request.model,
            self.provider.name(),
            request.max_tokens,
        );

        self.provider.stream_text(request, self.api_key.as_ref()).await
    }
}
