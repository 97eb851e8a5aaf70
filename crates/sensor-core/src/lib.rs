//! # Sensor Core
//!
//! Core data model and error types for the sensor retrieval system.
//!
//! - [`SystemIdentity`] - who this client is to the registry and orchestrator
//! - [`ProviderDescriptor`] - a provider resolved for one request
//! - [`SensorReading`] - a decoded temperature value
//! - [`SensorError`] - every failure the pipeline can report

pub mod error;
pub mod types;

// Re-exports for convenience
pub use error::{Result, SensorError};
pub use types::*;

/// Prelude module for common imports
pub mod prelude {
    pub use crate::error::{Result, SensorError};
    pub use crate::types::{
        CapabilityRequest, ProviderDescriptor, RunState, SensorReading, ServiceEndpoint,
        SystemIdentity, SystemState,
    };
}
