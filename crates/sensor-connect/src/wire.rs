//! JSON bodies exchanged with the service registry and orchestrator.

use sensor_core::{ProviderDescriptor, ServiceEndpoint, SystemIdentity};
use serde::{Deserialize, Serialize};

/// A system as the registry and orchestrator describe it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemRecord {
    #[serde(default)]
    pub system_name: String,
    pub address: String,
    pub port: u16,
}

impl From<&SystemIdentity> for SystemRecord {
    fn from(identity: &SystemIdentity) -> Self {
        Self {
            system_name: identity.system_name.clone(),
            address: identity.address.clone(),
            port: identity.port,
        }
    }
}

/// Body of `POST /serviceregistry/query`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceQueryForm<'a> {
    pub service_definition_requirement: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceQueryList {
    #[serde(default)]
    pub service_query_data: Vec<ServiceQueryEntry>,
    #[serde(default)]
    pub unfiltered_hits: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceQueryEntry {
    pub provider: SystemRecord,
    #[serde(default)]
    pub service_uri: String,
}

impl ServiceQueryList {
    pub fn endpoints(self) -> Vec<ServiceEndpoint> {
        self.service_query_data
            .into_iter()
            .map(|entry| ServiceEndpoint::new(entry.provider.address, entry.provider.port))
            .collect()
    }
}

/// Body of `POST /orchestrator/orchestration`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrchestrationForm<'a> {
    pub requester_system: SystemRecord,
    pub requested_service: RequestedService<'a>,
    pub orchestration_flags: OrchestrationFlags,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestedService<'a> {
    pub service_definition_requirement: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrchestrationFlags {
    pub override_store: bool,
}

#[derive(Debug, Deserialize)]
pub struct OrchestrationResponse {
    #[serde(default)]
    pub response: Vec<OrchestrationResult>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrchestrationResult {
    pub provider: SystemRecord,
    #[serde(default)]
    pub service_uri: String,
}

impl OrchestrationResponse {
    /// Providers in the order the orchestrator ranked them.
    pub fn providers(self) -> Vec<ProviderDescriptor> {
        self.response
            .into_iter()
            .map(|result| {
                ProviderDescriptor::new(
                    result.provider.address,
                    result.provider.port,
                    result.service_uri,
                )
            })
            .collect()
    }
}
