//! Service registry client.

use async_trait::async_trait;
use sensor_core::{CapabilityRequest, Result, SensorError, ServiceEndpoint, SystemIdentity};
use tracing::{debug, info};

use crate::transport::ensure_success;
use crate::wire::{ServiceQueryForm, ServiceQueryList, SystemRecord};

/// Registration and lookup against a service registry.
#[async_trait]
pub trait RegistryClient: Send + Sync {
    /// Announce a system.
    async fn register(&self, identity: &SystemIdentity) -> Result<()>;

    /// Withdraw a previously announced system.
    async fn unregister(&self, identity: &SystemIdentity) -> Result<()>;

    /// Find providers of a capability.
    async fn query(&self, capability: &CapabilityRequest) -> Result<Vec<ServiceEndpoint>>;
}

/// Registry client speaking JSON over mutually authenticated HTTPS.
#[derive(Clone)]
pub struct HttpRegistryClient {
    base_url: String,
    http_client: reqwest::Client,
}

impl HttpRegistryClient {
    pub fn new(endpoint: &ServiceEndpoint, http_client: reqwest::Client) -> Self {
        Self {
            base_url: format!("{}/serviceregistry", endpoint.base_url()),
            http_client,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl RegistryClient for HttpRegistryClient {
    async fn register(&self, identity: &SystemIdentity) -> Result<()> {
        let url = format!("{}/register-system", self.base_url);

        let response = self
            .http_client
            .post(&url)
            .json(&SystemRecord::from(identity))
            .send()
            .await
            .map_err(|e| SensorError::Registration(e.to_string()))?;

        ensure_success(response)
            .await
            .map_err(SensorError::Registration)?;

        info!("Registered {} with registry", identity);
        Ok(())
    }

    async fn unregister(&self, identity: &SystemIdentity) -> Result<()> {
        let url = format!("{}/unregister-system", self.base_url);
        let port = identity.port.to_string();

        let response = self
            .http_client
            .delete(&url)
            .query(&[
                ("system_name", identity.system_name.as_str()),
                ("address", identity.address.as_str()),
                ("port", port.as_str()),
            ])
            .send()
            .await
            .map_err(|e| SensorError::Deregistration(e.to_string()))?;

        ensure_success(response)
            .await
            .map_err(SensorError::Deregistration)?;

        info!("Unregistered {} from registry", identity);
        Ok(())
    }

    async fn query(&self, capability: &CapabilityRequest) -> Result<Vec<ServiceEndpoint>> {
        let url = format!("{}/query", self.base_url);

        let response = self
            .http_client
            .post(&url)
            .json(&ServiceQueryForm {
                service_definition_requirement: capability.name(),
            })
            .send()
            .await
            .map_err(|e| SensorError::Discovery(e.to_string()))?;

        let response = ensure_success(response)
            .await
            .map_err(SensorError::Discovery)?;

        let list: ServiceQueryList = response
            .json()
            .await
            .map_err(|e| SensorError::Discovery(format!("malformed query response: {}", e)))?;

        debug!(
            "Registry query for {} matched {} of {} services",
            capability,
            list.service_query_data.len(),
            list.unfiltered_hits
        );
        Ok(list.endpoints())
    }
}
