//! LLM configuration structures for model providers and routing defaults.

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::time::Duration;

use duration_str::deserialize_duration;
use secrecy::SecretString;
use serde::Deserialize;

/// Token ceiling used when the resolved model declares none.
const DEFAULT_MAX_TOKENS: u32 = 8000;

/// Configuration for an individual model of a provider.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModelConfig {
    /// Human readable name shown in model listings.
    #[serde(default)]
    pub label: Option<String>,
    /// Maximum number of tokens the model may generate for one request.
    #[serde(default)]
    pub max_token_allowed: Option<u32>,
}

/// LLM routing configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LlmConfig {
    /// Whether the LLM functionality is enabled.
    enabled: bool,

    /// The path where the chat, enhancer and models endpoints will be mounted.
    pub path: Cow<'static, str>,

    /// Model used when no user message names a registered model.
    pub default_model: String,

    /// Provider used when no user message names a provider.
    pub default_provider: String,

    /// Token ceiling used when the resolved model does not declare one.
    pub max_tokens: u32,

    /// Replaces the built-in system prompt.
    pub system_prompt: Option<String>,

    /// How long discovered provider model lists are reused.
    #[serde(deserialize_with = "deserialize_duration")]
    pub discovery_cache_ttl: Duration,

    /// Map of LLM provider configurations, keyed by the provider name used in directives.
    pub providers: BTreeMap<String, LlmProviderConfig>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: Cow::Borrowed("/api"),
            default_model: "claude-3-5-sonnet-latest".to_string(),
            default_provider: "Anthropic".to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
            system_prompt: None,
            discovery_cache_ttl: Duration::from_secs(300),
            providers: BTreeMap::new(),
        }
    }
}

impl LlmConfig {
    /// Whether the LLM functionality is enabled.
    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// Whether there are any LLM providers configured.
    pub fn has_providers(&self) -> bool {
        !self.providers.is_empty()
    }
}

/// Provider type enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProviderType {
    /// OpenAI, or any server speaking the OpenAI chat completions protocol.
    Openai,
    /// Anthropic messages API.
    Anthropic,
}

impl std::fmt::Display for ProviderType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProviderType::Openai => f.write_str("openai"),
            ProviderType::Anthropic => f.write_str("anthropic"),
        }
    }
}

fn default_true() -> bool {
    true
}

/// Configuration shared by all HTTP API based providers.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiProviderConfig {
    /// API key for authentication.
    #[serde(default)]
    pub api_key: Option<SecretString>,

    /// Custom base URL for the provider API.
    #[serde(default)]
    pub base_url: Option<String>,

    /// Accept API keys supplied by the caller in the request body.
    #[serde(default = "default_true")]
    pub forward_token: bool,

    /// Whether the provider needs an API key at all. Local servers usually do not.
    #[serde(default = "default_true")]
    pub requires_api_key: bool,

    /// Ask the provider for its model list in addition to the configured models.
    #[serde(default)]
    pub discover_models: bool,

    /// Statically configured models for this provider.
    #[serde(default)]
    pub models: BTreeMap<String, ModelConfig>,
}

/// Complete LLM provider configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case", deny_unknown_fields)]
pub enum LlmProviderConfig {
    /// OpenAI compatible provider configuration.
    Openai(ApiProviderConfig),

    /// Anthropic provider configuration.
    Anthropic(ApiProviderConfig),
}

impl LlmProviderConfig {
    /// Get the provider type for this configuration.
    pub fn provider_type(&self) -> ProviderType {
        match self {
            Self::Openai(_) => ProviderType::Openai,
            Self::Anthropic(_) => ProviderType::Anthropic,
        }
    }

    /// The settings shared by every provider type.
    pub fn api(&self) -> &ApiProviderConfig {
        match self {
            Self::Openai(config) | Self::Anthropic(config) => config,
        }
    }

    /// Get the configured API key.
    pub fn api_key(&self) -> Option<&SecretString> {
        self.api().api_key.as_ref()
    }

    /// Get the custom base URL, if any.
    pub fn base_url(&self) -> Option<&str> {
        self.api().base_url.as_deref()
    }

    /// Whether caller supplied keys are honored.
    pub fn forward_token(&self) -> bool {
        self.api().forward_token
    }

    /// Whether the provider needs an API key.
    pub fn requires_api_key(&self) -> bool {
        self.api().requires_api_key
    }

    /// Whether the provider model list is discovered at runtime.
    pub fn discover_models(&self) -> bool {
        self.api().discover_models
    }

    /// Get the statically configured models for this provider.
    pub fn models(&self) -> &BTreeMap<String, ModelConfig> {
        &self.api().models
    }
}
