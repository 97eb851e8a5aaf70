//! In-memory registry, orchestrator and transport used by the unit tests.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use sensor_connect::{
    OrchestratorClient, ProviderResponse, RegistryClient, Transport, TransportFactory,
};
use sensor_core::{
    CapabilityRequest, ProviderDescriptor, Result, SensorError, ServiceEndpoint, SystemIdentity,
};

use crate::system::RetrievalSystem;

#[derive(Debug, Clone, PartialEq)]
pub enum RegistryCall {
    Register(SystemIdentity),
    Unregister(SystemIdentity),
    Query(String),
}

#[derive(Default)]
pub struct FakeRegistry {
    pub endpoints: Vec<ServiceEndpoint>,
    pub fail_register: bool,
    pub fail_unregister: bool,
    pub calls: Mutex<Vec<RegistryCall>>,
}

impl FakeRegistry {
    pub fn with_orchestrator(address: &str, port: u16) -> Self {
        Self {
            endpoints: vec![ServiceEndpoint::new(address, port)],
            ..Default::default()
        }
    }

    pub fn calls(&self) -> Vec<RegistryCall> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl RegistryClient for FakeRegistry {
    async fn register(&self, identity: &SystemIdentity) -> Result<()> {
        self.calls
            .lock()
            .unwrap()
            .push(RegistryCall::Register(identity.clone()));
        if self.fail_register {
            return Err(SensorError::Registration("system name already taken".into()));
        }
        Ok(())
    }

    async fn unregister(&self, identity: &SystemIdentity) -> Result<()> {
        self.calls
            .lock()
            .unwrap()
            .push(RegistryCall::Unregister(identity.clone()));
        if self.fail_unregister {
            return Err(SensorError::Deregistration("registry unreachable".into()));
        }
        Ok(())
    }

    async fn query(&self, capability: &CapabilityRequest) -> Result<Vec<ServiceEndpoint>> {
        self.calls
            .lock()
            .unwrap()
            .push(RegistryCall::Query(capability.name().to_string()));
        Ok(self.endpoints.clone())
    }
}

#[derive(Default)]
pub struct FakeOrchestrator {
    pub providers: Vec<ProviderDescriptor>,
    pub requests: Mutex<Vec<(String, SystemIdentity)>>,
}

impl FakeOrchestrator {
    pub fn resolving(providers: Vec<ProviderDescriptor>) -> Self {
        Self {
            providers,
            ..Default::default()
        }
    }
}

#[async_trait]
impl OrchestratorClient for FakeOrchestrator {
    async fn resolve(
        &self,
        capability: &CapabilityRequest,
        requester: &SystemIdentity,
    ) -> Result<Vec<ProviderDescriptor>> {
        self.requests
            .lock()
            .unwrap()
            .push((capability.name().to_string(), requester.clone()));
        Ok(self.providers.clone())
    }
}

/// Answers every GET with a fixed response and records the URLs.
pub struct FakeTransport {
    pub response: ProviderResponse,
    pub urls: Mutex<Vec<String>>,
}

impl FakeTransport {
    pub fn answering(status: u16, body: &str) -> Arc<Self> {
        Arc::new(Self {
            response: ProviderResponse::new(status, body),
            urls: Mutex::new(Vec::new()),
        })
    }

    pub fn urls(&self) -> Vec<String> {
        self.urls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn get(&self, url: &str) -> Result<ProviderResponse> {
        self.urls.lock().unwrap().push(url.to_string());
        Ok(self.response.clone())
    }
}

pub struct FakeTransportFactory(pub Arc<FakeTransport>);

impl TransportFactory for FakeTransportFactory {
    fn build(&self) -> Result<Arc<dyn Transport>> {
        Ok(self.0.clone())
    }
}

pub fn scenario_identity() -> SystemIdentity {
    SystemIdentity::new("10.0.0.5", 8080, "sensor-client")
}

/// Constructed (not yet registered) system wired to the given fakes.
pub async fn connected_system(
    registry: &Arc<FakeRegistry>,
    orchestrator: &Arc<FakeOrchestrator>,
    transport: &Arc<FakeTransport>,
) -> RetrievalSystem {
    let bound = orchestrator.clone();
    RetrievalSystem::connect(
        scenario_identity(),
        registry.clone(),
        &CapabilityRequest::orchestration(),
        move |_endpoint| Ok(bound as Arc<dyn OrchestratorClient>),
        Arc::new(FakeTransportFactory(transport.clone())),
    )
    .await
    .unwrap()
}

/// Constructed and registered system wired to the given fakes.
pub async fn registered_system(
    registry: &Arc<FakeRegistry>,
    orchestrator: &Arc<FakeOrchestrator>,
    transport: &Arc<FakeTransport>,
) -> RetrievalSystem {
    let mut system = connected_system(registry, orchestrator, transport).await;
    system.start().await.unwrap();
    system
}
