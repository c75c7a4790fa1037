use std::{collections::BTreeMap, sync::Arc, time::Duration};

use futures::stream::{FuturesUnordered, StreamExt};
use mini_moka::sync::Cache;
use serde::Serialize;

use crate::{
    provider::{DiscoveredModel, Provider, Providers, token},
    request::RequestContext,
};

/// A model a request can be routed to.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ModelRecord {
    pub(crate) name: String,
    pub(crate) label: String,
    pub(crate) provider: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) max_token_allowed: Option<u32>,
}

/// Lists the models of every provider the caller can currently use.
pub(crate) struct ModelRegistry {
    providers: Arc<Providers>,
    discovered: Cache<String, Vec<DiscoveredModel>>,
}

impl ModelRegistry {
    pub(crate) fn new(providers: Arc<Providers>, discovery_ttl: Duration) -> Self {
        let discovered = Cache::builder().time_to_live(discovery_ttl).build();

        Self { providers, discovered }
    }

    /// Builds the model list for a request.
    ///
    /// Providers without a usable API key are left out. Configured models come
    /// first, followed by discovered models the configuration does not mention.
    /// Discovery runs concurrently for all providers that enable it, failures
    /// only cost that provider its discovered models.
    pub(crate) async fn list(&self, context: &RequestContext) -> Vec<ModelRecord> {
        let available: Vec<&dyn Provider> = self
            .providers
            .iter()
            .filter(|provider| {
                let usable = token::get(provider.name(), provider.config(), context).is_ok();

                if !usable {
                    log::debug!("Skipping models of provider '{}', no API key available", provider.name());
                }

                usable
            })
            .collect();

        let mut discovery = available
            .iter()
            .copied()
            .filter(|provider| provider.config().discover_models)
            .map(|provider| async move { (provider.name(), self.discover(provider, context).await) })
            .collect::<FuturesUnordered<_>>();

        let mut discovered = BTreeMap::new();

        while let Some((name, models)) = discovery.next().await {
            discovered.insert(name, models);
        }

        available
            .into_iter()
            .flat_map(|provider| {
                let discovered = discovered.remove(provider.name()).unwrap_or_default();
                records(provider, discovered)
            })
            .collect()
    }

    async fn discover(&self, provider: &dyn Provider, context: &RequestContext) -> Vec<DiscoveredModel> {
        let name = provider.name().to_string();

        if let Some(models) = self.discovered.get(&name) {
            log::debug!("Using cached model list of provider '{name}'");
            return models;
        }

        let api_key = match token::get(&name, provider.config(), context) {
            Ok(api_key) => api_key,
            Err(_) => return Vec::new(),
        };

        match provider.list_models(api_key).await {
            Ok(models) => {
                log::debug!("Provider '{name}' reported {} models", models.len());
                self.discovered.insert(name, models.clone());

                models
            }
            Err(e) => {
                log::warn!("Failed to list models from provider '{name}': {e}");
                Vec::new()
            }
        }
    }
}

fn records(provider: &dyn Provider, discovered: Vec<DiscoveredModel>) -> Vec<ModelRecord> {
    let configured = &provider.config().models;

    let from_config = configured.iter().map(|(name, model)| ModelRecord {
        name: name.clone(),
        label: model.label.clone().unwrap_or_else(|| name.clone()),
        provider: provider.name().to_string(),
        max_token_allowed: model.max_token_allowed,
    });

    let from_discovery = discovered
        .into_iter()
        .filter(|model| !configured.contains_key(&model.id))
        .map(|model| ModelRecord {
            label: model.label.unwrap_or_else(|| model.id.clone()),
            name: model.id,
            provider: provider.name().to_string(),
            max_token_allowed: None,
        });

    from_config.chain(from_discovery).collect()
}
