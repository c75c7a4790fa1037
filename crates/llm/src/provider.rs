pub(crate) mod anthropic;
pub(crate) mod openai;
pub(crate) mod token;

use std::{pin::Pin, time::Duration};

use async_trait::async_trait;
use config::{ApiProviderConfig, LlmProviderConfig, ProviderType};
use futures::Stream;
use reqwest::{Client, Response};
use secrecy::SecretString;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::{
    dispatch::{ModelHandle, TextRequest},
    error::LlmError,
    request::RequestContext,
};

/// A stream of text deltas as produced by the model.
///
/// Concatenating every item in order yields the full completion. The stream owns the
/// upstream HTTP response, dropping it closes the connection to the provider.
pub(crate) type TextStream = Pin<Box<dyn Stream<Item = crate::Result<String>> + Send>>;

/// A model the provider reported through its listing endpoint.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct DiscoveredModel {
    pub(crate) id: String,
    pub(crate) label: Option<String>,
}

/// Trait for LLM provider implementations.
///
/// Note for async_trait: We need this trait to be dyn-compatible, so we can't just use the
/// Rust async trait functions without Box/Pin.
#[async_trait]
pub(crate) trait Provider: Send + Sync {
    /// Start a streaming completion.
    ///
    /// Fails before the first delta when the provider rejects the request. Errors
    /// after that point arrive as items of the stream.
    async fn stream_text(&self, request: TextRequest, api_key: Option<&SecretString>) -> crate::Result<TextStream>;

    /// Ask the provider which models it currently serves.
    async fn list_models(&self, api_key: Option<&SecretString>) -> crate::Result<Vec<DiscoveredModel>>;

    /// Get the provider name.
    fn name(&self) -> &str;

    /// Connection settings and static models of the provider.
    fn config(&self) -> &ApiProviderConfig;
}

/// Every configured provider, in configuration order.
pub(crate) struct Providers {
    providers: Vec<Box<dyn Provider>>,
}

impl Providers {
    pub(crate) fn new(providers: Vec<Box<dyn Provider>>) -> Self {
        Self { providers }
    }

    /// Creates a client for each configured provider.
    pub(crate) fn from_config<'a>(
        configs: impl IntoIterator<Item = (&'a String, &'a LlmProviderConfig)>,
    ) -> crate::Result<Self> {
        let mut providers: Vec<Box<dyn Provider>> = Vec::new();

        for (name, config) in configs {
            let provider: Box<dyn Provider> = match config.provider_type() {
                ProviderType::Openai => Box::new(openai::OpenAIProvider::new(name.clone(), config.api().clone())?),
                ProviderType::Anthropic => {
                    Box::new(anthropic::AnthropicProvider::new(name.clone(), config.api().clone())?)
                }
            };

            log::debug!("Initialized {} provider '{name}'", config.provider_type());
            providers.push(provider);
        }

        Ok(Self::new(providers))
    }

    pub(crate) fn get(&self, name: &str) -> Option<&dyn Provider> {
        self.providers
            .iter()
            .find(|provider| provider.name() == name)
            .map(|provider| provider.as_ref())
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &dyn Provider> {
        self.providers.iter().map(|provider| provider.as_ref())
    }

    /// Binds a model to its provider and the credentials to call it with.
    pub(crate) fn resolve<'a>(
        &'a self,
        provider: &str,
        model: &str,
        context: &RequestContext,
    ) -> crate::Result<ModelHandle<'a>> {
        let Some(found) = self.get(provider) else {
            log::error!("Provider '{provider}' is not configured");
            return Err(LlmError::ProviderNotFound(provider.to_string()));
        };

        let api_key = token::get(provider, found.config(), context)?.cloned();

        Ok(ModelHandle {
            provider: found,
            model: model.to_string(),
            api_key,
        })
    }
}

/// HTTP client shared by the provider implementations.
///
/// Only connecting is bounded in time, a completion stream may legitimately run for minutes.
pub(super) fn http_client(provider_name: &str) -> crate::Result<Client> {
    Client::builder()
        .connect_timeout(Duration::from_secs(10))
        .build()
        .map_err(|e| {
            log::error!("Failed to create HTTP client for provider '{provider_name}': {e}");
            LlmError::InternalError(None)
        })
}

/// Turns an unsuccessful provider response into an error.
pub(super) async fn error_from_response(provider_name: &str, response: Response) -> LlmError {
    let status = response.status();
    let error_text = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());

    log::error!("Provider '{provider_name}' returned an error ({status}): {error_text}");

    match status.as_u16() {
        401 => LlmError::AuthenticationFailed(error_text),
        500 => LlmError::InternalError(Some(error_text)),
        status => LlmError::ProviderApiError {
            status,
            message: error_text,
        },
    }
}

/// Serializes a provider request and lays the caller's extra fields over it.
pub(super) fn with_overrides<T: Serialize>(body: &T, overrides: &Map<String, Value>) -> crate::Result<Value> {
    let mut body = serde_json::to_value(body).map_err(|e| {
        log::error!("Failed to serialize provider request: {e}");
        LlmError::InternalError(None)
    })?;

    if let Value::Object(fields) = &mut body {
        for (key, value) in overrides {
            fields.insert(key.clone(), value.clone());
        }
    }

    Ok(body)
}

/// Strips trailing slashes so paths can be appended with a leading one.
pub(super) fn normalize_base_url(base_url: &str) -> String {
    base_url.trim_end_matches('/').to_string()
}
