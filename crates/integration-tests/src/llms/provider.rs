use std::future::Future;
use std::net::SocketAddr;

use indoc::formatdoc;

#[derive(Clone, Debug, Copy)]
pub enum ProviderType {
    OpenAI,
    Anthropic,
}

/// A model listed statically in the provider configuration.
#[derive(Clone, Debug)]
pub struct MockModel {
    pub id: String,
    pub label: Option<String>,
    pub max_token_allowed: Option<u32>,
}

impl MockModel {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: None,
            max_token_allowed: None,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_max_tokens(mut self, max_token_allowed: u32) -> Self {
        self.max_token_allowed = Some(max_token_allowed);
        self
    }
}

/// Configuration for a running test LLM provider
pub struct LlmProviderConfig {
    pub name: String,
    pub address: SocketAddr,
    pub provider_type: ProviderType,
    pub models: Vec<MockModel>,
    pub api_key: Option<String>,
    pub requires_api_key: bool,
    pub discover_models: bool,
}

impl LlmProviderConfig {
    /// The `[llm.providers.<name>]` tables pointing the server at the mock.
    pub fn to_toml(&self) -> String {
        let provider_type = match self.provider_type {
            ProviderType::OpenAI => "openai",
            ProviderType::Anthropic => "anthropic",
        };

        let api_key = match &self.api_key {
            Some(key) => format!("api_key = \"{key}\""),
            None => String::new(),
        };

        let mut models_section = String::new();

        for model in &self.models {
            // Quoted keys, model ids contain dots
            models_section.push_str(&format!("\n[llm.providers.\"{}\".models.\"{}\"]\n", self.name, model.id));

            if let Some(label) = &model.label {
                models_section.push_str(&format!("label = \"{label}\"\n"));
            }

            if let Some(max) = model.max_token_allowed {
                models_section.push_str(&format!("max_token_allowed = {max}\n"));
            }
        }

        formatdoc! {r#"

            [llm.providers."{name}"]
            type = "{provider_type}"
            {api_key}
            base_url = "http://{address}/v1"
            requires_api_key = {requires_api_key}
            discover_models = {discover_models}
            {models_section}
        "#,
            name = self.name,
            address = self.address,
            requires_api_key = self.requires_api_key,
            discover_models = self.discover_models,
        }
    }
}

/// Trait for test LLM providers
pub trait TestLlmProvider: Send + 'static {
    /// Start the mock server and return its configuration
    fn spawn(self) -> impl Future<Output = anyhow::Result<LlmProviderConfig>> + Send;
}
