//! # Sensor Connect
//!
//! Credentials, mutually authenticated transport, and clients for the
//! service registry and orchestrator.

pub mod credentials;
pub mod orchestrator;
pub mod registry;
#[cfg(test)]
mod test_support;
pub mod transport;
pub mod wire;

pub use credentials::{CredentialPaths, CredentialStore, Credentials};
pub use orchestrator::{HttpOrchestratorClient, OrchestratorClient};
pub use registry::{HttpRegistryClient, RegistryClient};
pub use transport::{
    HttpsTransport, ProviderResponse, SecureTransportFactory, Transport, TransportFactory,
    DEFAULT_REQUEST_TIMEOUT,
};

/// Prelude module for common imports.
pub mod prelude {
    pub use crate::credentials::CredentialStore;
    pub use crate::orchestrator::OrchestratorClient;
    pub use crate::registry::RegistryClient;
    pub use crate::transport::{SecureTransportFactory, Transport, TransportFactory};
    pub use sensor_core::prelude::*;
}
