use std::{path::Path, str::FromStr};

use anyhow::bail;
use indoc::indoc;
use serde::Deserialize;
use serde_dynamic_string::DynamicString;
use toml::Value;

use crate::Config;

/// Keys that are dropped instead of failing the load when their environment variable is missing.
const OPTIONAL_DYNAMIC_KEYS: &[&str] = &["base_url", "api_key"];

pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Config> {
    let content = std::fs::read_to_string(path.as_ref())?;
    let mut raw_config: Value = toml::from_str(&content)?;

    expand_dynamic_strings(&mut Vec::new(), &mut raw_config)?;

    let config = Config::deserialize(raw_config)?;

    for warning in validate(&config)? {
        log::warn!("{warning}");
    }

    Ok(config)
}

/// Checks that the configuration can route requests, returning non-fatal warnings.
pub(crate) fn validate(config: &Config) -> anyhow::Result<Vec<String>> {
    let mut warnings = Vec::new();

    if !config.llm.enabled() {
        warnings.push("LLM routing is disabled, only the health endpoint will be served".to_string());
        return Ok(warnings);
    }

    if !config.llm.has_providers() {
        bail!(
            "{}",
            indoc! {r#"
            No LLM providers configured. Switchboard requires at least one provider to route requests.

            Example configuration:

              [llm.providers.OpenAI]
              type = "openai"
              api_key = "{{ env.OPENAI_API_KEY }}"

              [llm.providers.OpenAI.models."gpt-4o"]
              max_token_allowed = 8000
        "#}
        );
    }

    for (name, provider) in &config.llm.providers {
        if provider.models().is_empty() && !provider.discover_models() {
            bail!("Provider '{name}' has no configured models and model discovery is disabled");
        }

        if provider.requires_api_key() && provider.api_key().is_none() && !provider.forward_token() {
            warnings.push(format!(
                "Provider '{name}' requires an API key but none is configured and caller keys are not accepted"
            ));
        }
    }

    if !config.llm.providers.contains_key(&config.llm.default_provider) {
        warnings.push(format!(
            "Default provider '{}' is not configured, requests without a provider directive will fail",
            config.llm.default_provider
        ));
    }

    Ok(warnings)
}

fn expand_dynamic_strings(path: &mut Vec<String>, value: &mut Value) -> anyhow::Result<()> {
    match value {
        Value::String(s) => match DynamicString::<String>::from_str(s) {
            Ok(out) => *s = out.into_inner(),
            Err(err) => bail!("Failed to expand dynamic string at path '{}': {err}", render_path(path)),
        },
        Value::Array(values) => {
            for (i, value) in values.iter_mut().enumerate() {
                path.push(format!("[{i}]"));
                expand_dynamic_strings(path, value)?;
                path.pop();
            }
        }
        Value::Table(map) => {
            let mut unresolved = Vec::new();

            for (key, value) in map.iter_mut() {
                path.push(key.clone());
                let result = expand_dynamic_strings(path, value);
                path.pop();

                match result {
                    Ok(()) => (),
                    Err(err) if OPTIONAL_DYNAMIC_KEYS.contains(&key.as_str()) && value.is_str() => {
                        log::debug!("Dropping optional field '{key}': {err}");
                        unresolved.push(key.clone());
                    }
                    Err(err) => return Err(err),
                }
            }

            for key in unresolved {
                map.remove(&key);
            }
        }
        Value::Integer(_) | Value::Float(_) | Value::Boolean(_) | Value::Datetime(_) => (),
    }

    Ok(())
}

fn render_path(path: &[String]) -> String {
    let mut rendered = String::new();

    for segment in path {
        if !rendered.is_empty() && !segment.starts_with('[') {
            rendered.push('.');
        }
        rendered.push_str(segment);
    }

    rendered
}
