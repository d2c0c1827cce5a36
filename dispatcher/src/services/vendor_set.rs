//! Static provider → adapter mapping

use std::sync::Arc;

use shared::ProviderId;
use crate::config::EngineConfig;
use crate::error::{DispatchError, DispatchResult};
use crate::services::{DeepInfraClient, OpenAiClient, StabilityAiClient};
use crate::traits::VendorClient;

/// The sealed set of vendor adapters
#[derive(Clone)]
pub struct VendorSet {
    openai: Arc<dyn VendorClient>,
    deepinfra: Arc<dyn VendorClient>,
    stability: Arc<dyn VendorClient>,
}

impl VendorSet {
    pub fn new(openai: Arc<dyn VendorClient>, deepinfra: Arc<dyn VendorClient>, stability: Arc<dyn VendorClient>) -> Self {
        Self {
            openai,
            deepinfra,
            stability,
        }
    }

    /// Route every vendor slot to one client
    pub fn uniform(client: Arc<dyn VendorClient>) -> Self {
        Self::new(client.clone(), client.clone(), client)
    }

    /// Build the real HTTP adapters
    pub fn from_config(config: &EngineConfig) -> DispatchResult<Self> {
        let retry = config.retry_policy();
        let timeout = config.request_timeout();
        Ok(Self::new(
            Arc::new(OpenAiClient::new(config.openai.clone(), retry.clone(), timeout)?),
            Arc::new(DeepInfraClient::new(config.deepinfra.clone(), retry.clone(), timeout)?),
            Arc::new(StabilityAiClient::new(config.stability.clone(), retry, timeout)?),
        ))
    }

    /// Adapter serving a provider; `None` for catalogue providers without one
    pub fn client_for(&self, provider: ProviderId) -> Option<Arc<dyn VendorClient>> {
        match provider {
            ProviderId::OpenAI => Some(self.openai.clone()),
            ProviderId::Llama2
            | ProviderId::Mistral
            | ProviderId::WizardCoder
            | ProviderId::RunwayML
            | ProviderId::PromptHero => Some(self.deepinfra.clone()),
            ProviderId::StabilityAI => Some(self.stability.clone()),
            ProviderId::Falcon | ProviderId::Mpt => None,
        }
    }

    /// Parse a stored provider name and pick its adapter
    pub fn resolve(&self, provider: &str) -> DispatchResult<(ProviderId, Arc<dyn VendorClient>)> {
        let id: ProviderId = provider.parse()?;
        let client = self.client_for(id).ok_or_else(|| DispatchError::ProviderNotFound {
            provider: provider.to_string(),
        })?;
        Ok((id, client))
    }
}
