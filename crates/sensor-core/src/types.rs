//! Common types used across the sensor retrieval system.

use std::fmt;

use serde::Deserialize;

use crate::error::{Result, SensorError};

/// Capability under which the orchestrator registers itself.
pub const ORCHESTRATION_CAPABILITY: &str = "orchestration-service";

/// Capability served by temperature sensor providers.
pub const TEMPERATURE_CAPABILITY: &str = "temperature";

/// Identity this client presents to the registry and orchestrator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemIdentity {
    /// Network address of this system.
    pub address: String,

    /// Port of this system.
    pub port: u16,

    /// Registered system name.
    pub system_name: String,
}

impl SystemIdentity {
    /// Create a new identity.
    pub fn new(address: impl Into<String>, port: u16, system_name: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            port,
            system_name: system_name.into(),
        }
    }
}

impl fmt::Display for SystemIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}:{}", self.system_name, self.address, self.port)
    }
}

/// A symbolic capability name such as `temperature`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapabilityRequest(String);

impl CapabilityRequest {
    /// Create a request for the named capability.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// The orchestrator discovery capability.
    pub fn orchestration() -> Self {
        Self::new(ORCHESTRATION_CAPABILITY)
    }

    /// The temperature sensing capability.
    pub fn temperature() -> Self {
        Self::new(TEMPERATURE_CAPABILITY)
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CapabilityRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Network location of a registered service provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceEndpoint {
    pub address: String,
    pub port: u16,
}

impl ServiceEndpoint {
    pub fn new(address: impl Into<String>, port: u16) -> Self {
        Self {
            address: address.into(),
            port,
        }
    }

    /// HTTPS base URL for this endpoint.
    pub fn base_url(&self) -> String {
        format!("https://{}:{}", self.address, self.port)
    }
}

impl fmt::Display for ServiceEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.address, self.port)
    }
}

/// A provider resolved by the orchestrator for one request.
///
/// Never cached: providers may change between calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderDescriptor {
    /// Provider address.
    pub address: String,

    /// Provider port.
    pub port: u16,

    /// Path of the service on the provider, e.g. `/temp`.
    pub service_uri: String,
}

impl ProviderDescriptor {
    pub fn new(address: impl Into<String>, port: u16, service_uri: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            port,
            service_uri: service_uri.into(),
        }
    }

    /// Request URL in the form `https://{address}:{port}{serviceUri}`.
    pub fn url(&self) -> String {
        format!("https://{}:{}{}", self.address, self.port, self.service_uri)
    }
}

/// A temperature reading decoded from a provider response.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct SensorReading {
    pub temperature: f64,
}

impl SensorReading {
    /// Decode a provider response body.
    pub fn decode(body: &[u8]) -> Result<Self> {
        serde_json::from_slice(body).map_err(|e| SensorError::Decode(e.to_string()))
    }
}

/// Lifecycle of the retrieval system with respect to the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SystemState {
    /// Orchestrator located, not yet registered.
    Uninitialized,
    /// Registered and able to service requests.
    Registered,
    /// Unregistered; no further requests are serviced.
    Deregistered,
}

impl SystemState {
    /// Returns true if requests may be serviced.
    pub fn is_serving(&self) -> bool {
        matches!(self, SystemState::Registered)
    }
}

/// Running flag of the command loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunState {
    #[default]
    Running,
    Stopped,
}

impl RunState {
    pub fn is_running(&self) -> bool {
        matches!(self, RunState::Running)
    }

    pub fn stop(&mut self) {
        *self = RunState::Stopped;
    }
}
