use std::sync::Arc;

use config::LlmConfig;

use crate::{
    directive::Route,
    dispatch::{StreamOptions, TextRequest},
    messages::{ConversationMessage, ModelsResponse},
    normalize::{self, ResolvedRequest},
    prompt,
    provider::{Providers, TextStream},
    registry::ModelRegistry,
    request::RequestContext,
};

/// Shared state of the LLM endpoints.
pub(crate) struct LlmServer {
    providers: Arc<Providers>,
    registry: ModelRegistry,
    defaults: Route,
    max_tokens: u32,
    system_prompt: String,
}

impl LlmServer {
    pub fn new(config: &LlmConfig) -> crate::Result<Self> {
        let providers = Arc::new(Providers::from_config(&config.providers)?);
        let registry = ModelRegistry::new(providers.clone(), config.discovery_cache_ttl);

        let defaults = Route {
            model: config.default_model.clone(),
            provider: config.default_provider.clone(),
        };

        let system_prompt = config
            .system_prompt
            .clone()
            .unwrap_or_else(|| prompt::DEFAULT_SYSTEM_PROMPT.to_string());

        log::debug!(
            "LLM server ready with {} providers, defaulting to model '{}' of provider '{}'",
            config.providers.len(),
            defaults.model,
            defaults.provider
        );

        Ok(Self {
            providers,
            registry,
            defaults,
            max_tokens: config.max_tokens,
            system_prompt,
        })
    }

    /// List the models the caller can route to.
    pub async fn list_models(&self, context: &RequestContext) -> ModelsResponse {
        ModelsResponse {
            data: self.registry.list(context).await,
        }
    }

    /// Resolve model, provider, ceiling and flat messages of a conversation.
    pub async fn resolve(&self, messages: Vec<ConversationMessage>, context: &RequestContext) -> ResolvedRequest {
        let models = self.registry.list(context).await;

        normalize::resolve(messages, &models, &self.defaults, self.max_tokens)
    }

    /// Route a conversation and start streaming the answer.
    pub async fn stream_text(
        &self,
        messages: Vec<ConversationMessage>,
        context: &RequestContext,
        options: StreamOptions,
    ) -> crate::Result<TextStream> {
        let resolved = self.resolve(messages, context).await;
        let handle = self.providers.resolve(&resolved.provider, &resolved.model, context)?;

        let request = TextRequest::new(resolved, self.system_prompt.as_str()).with_options(options);

        handle.stream_text(request).await
    }
}
