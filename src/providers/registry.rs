use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use tracing::info;

use crate::config::types::ProvidersConfig;
use crate::error::{RelayError, Result};
use crate::providers::anthropic::AnthropicProvider;
use crate::providers::gemini::GeminiProvider;
use crate::providers::openai::OpenAIProvider;
use crate::providers::traits::{ChatProvider, ProviderId};
use crate::secrets::Credential;

/// Whether a provider takes part in fan-out. Decided once at startup.
#[derive(Clone)]
pub enum ProviderSlot {
    Configured(Arc<dyn ChatProvider>),
    NotConfigured,
}

/// Immutable set of provider clients shared by every request handler.
pub struct ProviderRegistry {
    slots: BTreeMap<ProviderId, ProviderSlot>,
}

impl ProviderRegistry {
    /// Build a client for every provider enabled in `config`.
    ///
    /// An enabled provider without a credential, or whose key the client
    /// rejects, fails the whole initialization.
    pub fn initialize(
        config: &ProvidersConfig,
        credentials: &HashMap<ProviderId, Credential>,
    ) -> Result<Self> {
        let mut slots = BTreeMap::new();

        for id in ProviderId::ALL {
            if !config.get(id).enabled {
                info!(provider = %id, "Provider disabled, responses will be null");
                slots.insert(id, ProviderSlot::NotConfigured);
                continue;
            }

            let credential = credentials.get(&id).ok_or_else(|| RelayError::ClientInit {
                provider: id.to_string(),
                reason: "no credential was resolved".to_string(),
            })?;

            let provider = create_provider(id, config, credential)?;
            info!(provider = %id, "Provider client initialized");
            slots.insert(id, ProviderSlot::Configured(provider));
        }

        Ok(Self { slots })
    }

    /// Registry over already-built clients; every other provider is
    /// `NotConfigured`.
    pub fn from_providers(providers: impl IntoIterator<Item = Arc<dyn ChatProvider>>) -> Self {
        let mut slots: BTreeMap<ProviderId, ProviderSlot> = ProviderId::ALL
            .into_iter()
            .map(|id| (id, ProviderSlot::NotConfigured))
            .collect();

        for provider in providers {
            slots.insert(provider.id(), ProviderSlot::Configured(provider));
        }

        Self { slots }
    }

    pub fn empty() -> Self {
        Self::from_providers(Vec::new())
    }

    pub fn slot(&self, id: ProviderId) -> ProviderSlot {
        self.slots
            .get(&id)
            .cloned()
            .unwrap_or(ProviderSlot::NotConfigured)
    }

    /// Absent means "skip this provider", not an error.
    pub fn get(&self, id: ProviderId) -> Option<Arc<dyn ChatProvider>> {
        match self.slots.get(&id) {
            Some(ProviderSlot::Configured(provider)) => Some(Arc::clone(provider)),
            _ => None,
        }
    }

    /// Configured providers in response key order.
    pub fn configured(&self) -> impl Iterator<Item = &Arc<dyn ChatProvider>> {
        self.slots.values().filter_map(|slot| match slot {
            ProviderSlot::Configured(provider) => Some(provider),
            ProviderSlot::NotConfigured => None,
        })
    }

    pub fn configured_ids(&self) -> Vec<ProviderId> {
        self.configured().map(|provider| provider.id()).collect()
    }
}

pub fn create_provider(
    id: ProviderId,
    config: &ProvidersConfig,
    credential: &Credential,
) -> Result<Arc<dyn ChatProvider>> {
    let provider_config = config.get(id);
    let api_key = credential.expose().to_string();
    let model = provider_config.model_for(id);
    let base_url = provider_config.base_url.clone();
    let max_tokens = provider_config.max_tokens;

    let provider: Arc<dyn ChatProvider> = match id {
        ProviderId::ChatGpt => Arc::new(OpenAIProvider::new(api_key, model, base_url, max_tokens)?),
        ProviderId::Gemini => Arc::new(GeminiProvider::new(api_key, model, base_url, max_tokens)?),
        ProviderId::Claude => {
            Arc::new(AnthropicProvider::new(api_key, model, base_url, max_tokens)?)
        }
    };

    Ok(provider)
}
