//! Switchboard configuration structures to map the switchboard.toml configuration.

#![deny(missing_docs)]

mod cors;
mod health;
mod llm;
mod loader;
mod server;

use std::path::Path;

pub use cors::{AllowedOrigins, CorsConfig};
pub use health::HealthConfig;
pub use llm::{ApiProviderConfig, LlmConfig, LlmProviderConfig, ModelConfig, ProviderType};
pub use server::{ServerConfig, TlsServerConfig};
use serde::Deserialize;

/// Main configuration structure for the Switchboard application.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// HTTP server configuration settings.
    #[serde(default)]
    pub server: ServerConfig,
    /// LLM routing configuration settings.
    #[serde(default)]
    pub llm: LlmConfig,
}

impl Config {
    /// Load configuration from a file path.
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Config> {
        loader::load(path)
    }

    /// Validates that the configuration can route at least one request.
    pub fn validate(&self) -> anyhow::Result<Vec<String>> {
        loader::validate(self)
    }
}
