mod input;
mod output;

use async_trait::async_trait;
use config::ApiProviderConfig;
use eventsource_stream::{EventStreamError, Eventsource};
use futures::StreamExt;
use reqwest::{Client, RequestBuilder};
use secrecy::{ExposeSecret, SecretString};

use self::{
    input::AnthropicRequest,
    output::{AnthropicBlockDelta, AnthropicModelsResponse, AnthropicStreamEvent},
};

use crate::{
    dispatch::TextRequest,
    error::LlmError,
    provider::{self, DiscoveredModel, Provider, TextStream},
};

const DEFAULT_ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1";
const ANTHROPIC_VERSION: &str = "2023-06-01";

pub(crate) struct AnthropicProvider {
    client: Client,
    base_url: String,
    name: String,
    config: ApiProviderConfig,
}

impl AnthropicProvider {
    pub fn new(name: String, config: ApiProviderConfig) -> crate::Result<Self> {
        let client = provider::http_client(&name)?;
        let base_url = provider::normalize_base_url(config.base_url.as_deref().unwrap_or(DEFAULT_ANTHROPIC_API_URL));

        Ok(Self {
            client,
            base_url,
            name,
            config,
        })
    }

    fn authorize(request: RequestBuilder, api_key: Option<&SecretString>) -> RequestBuilder {
        let request = request.header("anthropic-version", ANTHROPIC_VERSION);

        match api_key {
            Some(key) => request.header("x-api-key", key.expose_secret()),
            None => request,
        }
    }
}

#[async_trait]
impl Provider for AnthropicProvider {
    async fn stream_text(&self, mut request: TextRequest, api_key: Option<&SecretString>) -> crate::Result<TextStream> {
        let url = format!("{}/messages", self.base_url);
        let overrides = std::mem::take(&mut request.overrides);
        let body = provider::with_overrides(&AnthropicRequest::from(request), &overrides)?;

        let response = Self::authorize(self.client.post(&url), api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::ConnectionError(format!("Failed to send streaming request to {}: {e}", self.name)))?;

        if !response.status().is_success() {
            return Err(provider::error_from_response(&self.name, response).await);
        }

        let event_stream = response.bytes_stream().eventsource();
        let provider_name = self.name.clone();

        // The provider keeps the connection open briefly after `message_stop` or an
        // error event, so the stream is ended by hand once either arrives.
        let text_stream = futures::stream::unfold(
            Some((Box::pin(event_stream), provider_name)),
            |state| async move {
                let (mut stream, provider_name) = state?;

                loop {
                    let event = match stream.next().await? {
                        Ok(event) => event,
                        Err(EventStreamError::Transport(e)) => {
                            log::error!("Stream from provider '{provider_name}' broke off: {e}");
                            return Some((Err(LlmError::ConnectionError(e.to_string())), None));
                        }
                        Err(e) => {
                            log::warn!("SSE parsing error in stream from provider '{provider_name}': {e}");
                            continue;
                        }
                    };

                    let Ok(anthropic_event) = sonic_rs::from_str::<AnthropicStreamEvent>(&event.data) else {
                        log::warn!("Failed to parse streaming event from provider '{provider_name}'");
                        continue;
                    };

                    match anthropic_event {
                        AnthropicStreamEvent::ContentBlockDelta {
                            delta: AnthropicBlockDelta::Text { text },
                        } if !text.is_empty() => {
                            return Some((Ok(text), Some((stream, provider_name))));
                        }
                        AnthropicStreamEvent::MessageStop => return None,
                        AnthropicStreamEvent::Error { error } => {
                            log::error!(
                                "Provider '{provider_name}' stream error event: {} - {}",
                                error.error_type,
                                error.message
                            );

                            let error = LlmError::ProviderApiError {
                                status: 500,
                                message: error.message,
                            };

                            return Some((Err(error), None));
                        }
                        AnthropicStreamEvent::ContentBlockDelta { .. } | AnthropicStreamEvent::Other => continue,
                    }
                }
            },
        );

        Ok(Box::pin(text_stream))
    }

    async fn list_models(&self, api_key: Option<&SecretString>) -> crate::Result<Vec<DiscoveredModel>> {
        let url = format!("{}/models", self.base_url);

        let response = Self::authorize(self.client.get(&url), api_key)
            .send()
            .await
            .map_err(|e| LlmError::ConnectionError(format!("Failed to fetch models from {}: {e}", self.name)))?;

        if !response.status().is_success() {
            return Err(provider::error_from_response(&self.name, response).await);
        }

        let response_text = response.text().await.map_err(|e| {
            log::error!("Failed to read models response body of provider '{}': {e}", self.name);
            LlmError::InternalError(None)
        })?;

        let models_response: AnthropicModelsResponse = sonic_rs::from_str(&response_text).map_err(|e| {
            log::error!("Failed to parse models list of provider '{}': {e}", self.name);
            log::error!("Raw response that failed to parse: {response_text}");
            LlmError::InternalError(None)
        })?;

        Ok(models_response.data.into_iter().map(Into::into).collect())
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn config(&self) -> &ApiProviderConfig {
        &self.config
    }
}
