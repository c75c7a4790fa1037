use config::ApiProviderConfig;
use secrecy::SecretString;

use crate::{error::LlmError, request::RequestContext};

/// Picks the API key for a provider.
///
/// 1. A key the caller supplied, if the provider accepts forwarded keys
/// 2. Otherwise the configured key
/// 3. No key at all for providers that do not need one
///
/// Fails when a key is needed and none is available.
pub(crate) fn get<'a>(
    provider_name: &str,
    config: &'a ApiProviderConfig,
    context: &'a RequestContext,
) -> crate::Result<Option<&'a SecretString>> {
    if config.forward_token
        && let Some(api_key) = context.api_key(provider_name)
    {
        return Ok(Some(api_key));
    }

    if let Some(api_key) = config.api_key.as_ref() {
        return Ok(Some(api_key));
    }

    if !config.requires_api_key {
        return Ok(None);
    }

    Err(LlmError::MissingApiKey(provider_name.to_string()))
}
