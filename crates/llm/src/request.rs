use std::collections::BTreeMap;

use secrecy::SecretString;

/// Runtime context for provider requests.
///
/// Carries the per-provider API keys a caller sent along with the request. They
/// take precedence over configured keys for providers that accept forwarded keys.
#[derive(Debug, Clone, Default)]
pub(crate) struct RequestContext {
    api_keys: BTreeMap<String, SecretString>,
}

impl RequestContext {
    /// Builds a context from the `apiKeys` map of a request body. Empty keys are ignored.
    pub(crate) fn from_api_keys(api_keys: Option<BTreeMap<String, String>>) -> Self {
        let api_keys = api_keys
            .unwrap_or_default()
            .into_iter()
            .filter(|(_, key)| !key.trim().is_empty())
            .map(|(provider, key)| (provider, SecretString::from(key)))
            .collect();

        Self { api_keys }
    }

    /// The key the caller supplied for the given provider, if any.
    pub(crate) fn api_key(&self, provider: &str) -> Option<&SecretString> {
        self.api_keys.get(provider)
    }
}
