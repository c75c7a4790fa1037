mod input;
mod output;

use async_trait::async_trait;
use config::ApiProviderConfig;
use eventsource_stream::{EventStreamError, Eventsource};
use futures::StreamExt;
use reqwest::{Client, RequestBuilder, header::AUTHORIZATION};
use secrecy::{ExposeSecret, SecretString};

use self::{
    input::OpenAIRequest,
    output::{OpenAIModelsResponse, OpenAIStreamChunk, OpenAIStreamError},
};

use crate::{
    dispatch::TextRequest,
    error::LlmError,
    provider::{self, DiscoveredModel, Provider, TextStream},
};

const DEFAULT_OPENAI_API_URL: &str = "https://api.openai.com/v1";

/// Any server speaking the OpenAI chat completions protocol.
pub(crate) struct OpenAIProvider {
    client: Client,
    base_url: String,
    name: String,
    config: ApiProviderConfig,
}

impl OpenAIProvider {
    pub fn new(name: String, config: ApiProviderConfig) -> crate::Result<Self> {
        let client = provider::http_client(&name)?;

        // Use custom base URL if provided, otherwise use default
        let base_url = provider::normalize_base_url(config.base_url.as_deref().unwrap_or(DEFAULT_OPENAI_API_URL));

        Ok(Self {
            client,
            base_url,
            name,
            config,
        })
    }

    fn authorize(request: RequestBuilder, api_key: Option<&SecretString>) -> RequestBuilder {
        match api_key {
            Some(key) => request.header(AUTHORIZATION, format!("Bearer {}", key.expose_secret())),
            None => request,
        }
    }
}

#[async_trait]
impl Provider for OpenAIProvider {
    async fn stream_text(&self, mut request: TextRequest, api_key: Option<&SecretString>) -> crate::Result<TextStream> {
        let url = format!("{}/chat/completions", self.base_url);
        let overrides = std::mem::take(&mut request.overrides);
        let body = provider::with_overrides(&OpenAIRequest::from(request), &overrides)?;

        let response = Self::authorize(self.client.post(&url), api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::ConnectionError(format!("Failed to send streaming request to {}: {e}", self.name)))?;

        // Check for HTTP errors before attempting to stream
        if !response.status().is_success() {
            return Err(provider::error_from_response(&self.name, response).await);
        }

        let provider_name = self.name.clone();

        let text_stream = response.bytes_stream().eventsource().filter_map(move |event| {
            let provider_name = provider_name.clone();

            async move {
                let event = match event {
                    Ok(event) => event,
                    Err(EventStreamError::Transport(e)) => {
                        log::error!("Stream from provider '{provider_name}' broke off: {e}");
                        return Some(Err(LlmError::ConnectionError(e.to_string())));
                    }
                    Err(e) => {
                        log::warn!("SSE parsing error in stream from provider '{provider_name}': {e}");
                        return None;
                    }
                };

                // Check for end marker
                if event.data == "[DONE]" {
                    return None;
                }

                let Ok(chunk) = sonic_rs::from_str::<OpenAIStreamChunk>(&event.data) else {
                    log::warn!("Failed to parse streaming chunk from provider '{provider_name}'");
                    return None;
                };

                if let Some(text) = chunk.into_text() {
                    return Some(Ok(text));
                }

                let error = sonic_rs::from_str::<OpenAIStreamError>(&event.data).ok()?;
                log::error!("Provider '{provider_name}' sent an error mid-stream: {}", error.error.message);

                Some(Err(LlmError::InternalError(Some(error.error.message))))
            }
        });

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

        // First get the response as text to log if parsing fails
        let response_text = response.text().await.map_err(|e| {
            log::error!("Failed to read models response body of provider '{}': {e}", self.name);
            LlmError::InternalError(None)
        })?;

        let models_response: OpenAIModelsResponse = sonic_rs::from_str(&response_text).map_err(|e| {
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
