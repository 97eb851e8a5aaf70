//! Orchestrator client.

use async_trait::async_trait;
use sensor_core::{
    CapabilityRequest, ProviderDescriptor, Result, SensorError, ServiceEndpoint, SystemIdentity,
};
use tracing::debug;

use crate::transport::ensure_success;
use crate::wire::{
    OrchestrationFlags, OrchestrationForm, OrchestrationResponse, RequestedService, SystemRecord,
};

/// Resolves capabilities to ranked provider lists.
#[async_trait]
pub trait OrchestratorClient: Send + Sync {
    async fn resolve(
        &self,
        capability: &CapabilityRequest,
        requester: &SystemIdentity,
    ) -> Result<Vec<ProviderDescriptor>>;
}

/// Orchestrator client speaking JSON over mutually authenticated HTTPS.
#[derive(Clone)]
pub struct HttpOrchestratorClient {
    base_url: String,
    http_client: reqwest::Client,
}

impl HttpOrchestratorClient {
    pub fn new(endpoint: &ServiceEndpoint, http_client: reqwest::Client) -> Self {
        Self {
            base_url: format!("{}/orchestrator", endpoint.base_url()),
            http_client,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl OrchestratorClient for HttpOrchestratorClient {
    async fn resolve(
        &self,
        capability: &CapabilityRequest,
        requester: &SystemIdentity,
    ) -> Result<Vec<ProviderDescriptor>> {
        let url = format!("{}/orchestration", self.base_url);

        let form = OrchestrationForm {
            requester_system: SystemRecord::from(requester),
            requested_service: RequestedService {
                service_definition_requirement: capability.name(),
            },
            orchestration_flags: OrchestrationFlags {
                override_store: true,
            },
        };

        let response = self
            .http_client
            .post(&url)
            .json(&form)
            .send()
            .await
            .map_err(|e| SensorError::Orchestration(e.to_string()))?;

        let response = ensure_success(response)
            .await
            .map_err(SensorError::Orchestration)?;

        let orchestration: OrchestrationResponse = response.json().await.map_err(|e| {
            SensorError::Orchestration(format!("malformed orchestration response: {}", e))
        })?;

        let providers = orchestration.providers();
        debug!("Orchestrator resolved {} to {} providers", capability, providers.len());
        Ok(providers)
    }
}
