//! Resolve-and-fetch pipeline.

use std::sync::Arc;

use sensor_connect::{OrchestratorClient, RegistryClient, TransportFactory};
use sensor_core::{
    CapabilityRequest, ProviderDescriptor, Result, SensorError, ServiceEndpoint, SystemIdentity,
    SystemState,
};
use tracing::{debug, info, warn};

/// Registers this client with the registry and fetches sensor data from
/// providers chosen by the orchestrator.
pub struct RetrievalSystem {
    identity: SystemIdentity,
    registry: Arc<dyn RegistryClient>,
    orchestrator: Arc<dyn OrchestratorClient>,
    transports: Arc<dyn TransportFactory>,
    state: SystemState,
}

impl RetrievalSystem {
    /// Locate the orchestrator through the registry and bind a client to it.
    ///
    /// Only the first registry result is used. No retry.
    pub async fn connect<F>(
        identity: SystemIdentity,
        registry: Arc<dyn RegistryClient>,
        discovery: &CapabilityRequest,
        bind_orchestrator: F,
        transports: Arc<dyn TransportFactory>,
    ) -> Result<Self>
    where
        F: FnOnce(&ServiceEndpoint) -> Result<Arc<dyn OrchestratorClient>>,
    {
        let endpoints = registry.query(discovery).await.map_err(|e| match e {
            SensorError::Discovery(_) => e,
            other => SensorError::Discovery(other.to_string()),
        })?;

        let endpoint = endpoints.first().ok_or_else(|| {
            SensorError::Discovery(format!("no provider of '{}' is registered", discovery))
        })?;

        info!("🔎 Orchestrator located at {}", endpoint);
        let orchestrator = bind_orchestrator(endpoint)?;

        Ok(Self {
            identity,
            registry,
            orchestrator,
            transports,
            state: SystemState::Uninitialized,
        })
    }

    pub fn identity(&self) -> &SystemIdentity {
        &self.identity
    }

    pub fn state(&self) -> SystemState {
        self.state
    }

    /// Register with the registry.
    pub async fn start(&mut self) -> Result<()> {
        if self.state == SystemState::Deregistered {
            return Err(SensorError::InvalidState(
                "system has already been deregistered".to_string(),
            ));
        }

        self.registry
            .register(&self.identity)
            .await
            .map_err(|e| match e {
                SensorError::Registration(_) => e,
                other => SensorError::Registration(other.to_string()),
            })?;

        self.state = SystemState::Registered;
        info!("✅ {} registered", self.identity);
        Ok(())
    }

    /// Unregister from the registry.
    ///
    /// The system stops servicing requests even if the registry call fails.
    pub async fn stop(&mut self) -> Result<()> {
        if self.state == SystemState::Deregistered {
            return Ok(());
        }

        let result = self
            .registry
            .unregister(&self.identity)
            .await
            .map_err(|e| match e {
                SensorError::Deregistration(_) => e,
                other => SensorError::Deregistration(other.to_string()),
            });
        self.state = SystemState::Deregistered;

        match &result {
            Ok(()) => info!("👋 {} deregistered", self.identity),
            Err(e) => warn!("Deregistration of {} failed: {}", self.identity, e),
        }
        result
    }

    /// Fetch the raw response body of the first provider the orchestrator
    /// resolves for `capability`.
    pub async fn get_sensor_data(&self, capability: &CapabilityRequest) -> Result<Vec<u8>> {
        if !self.state.is_serving() {
            return Err(SensorError::InvalidState(format!(
                "cannot fetch '{}' while {:?}",
                capability, self.state
            )));
        }

        let providers = self.orchestrator.resolve(capability, &self.identity).await?;
        let provider = select_provider(&providers).ok_or_else(|| SensorError::NoProvider {
            capability: capability.to_string(),
        })?;

        let url = provider.url();
        debug!("Fetching {} from {}", capability, url);

        let transport = self.transports.build()?;
        let response = transport.get(&url).await?;

        if response.status != 200 {
            warn!("Provider {} answered {}", url, response.status_line());
            return Err(SensorError::Provider {
                status: response.status_line(),
                body: response.body_text(),
            });
        }

        Ok(response.body)
    }
}

/// First entry wins; ranking is the orchestrator's job.
fn select_provider(providers: &[ProviderDescriptor]) -> Option<&ProviderDescriptor> {
    providers.first()
}
