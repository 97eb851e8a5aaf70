//! Error types for the sensor retrieval system.

use thiserror::Error;

/// Main error type for sensor retrieval operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SensorError {
    /// Identity certificate or private key could not be loaded.
    #[error("Credential error: {0}")]
    Credential(String),

    /// Trust bundle missing or without usable roots.
    #[error("Trust store error: {0}")]
    TrustStore(String),

    /// The mutually authenticated HTTP client could not be built.
    #[error("Transport build failed: {0}")]
    TransportBuild(String),

    /// No orchestrator could be located through the registry.
    #[error("Discovery failed: {0}")]
    Discovery(String),

    /// The registry rejected or never received the registration.
    #[error("Registration failed: {0}")]
    Registration(String),

    /// The registry rejected or never received the deregistration.
    #[error("Deregistration failed: {0}")]
    Deregistration(String),

    /// The orchestrator request itself failed.
    #[error("Orchestration failed: {0}")]
    Orchestration(String),

    /// The orchestrator returned no providers for a capability.
    #[error("found no providers for capability '{capability}'")]
    NoProvider { capability: String },

    /// A provider answered with a non-200 status.
    #[error("status: {status}, body: {body}")]
    Provider { status: String, body: String },

    /// A provider could not be reached.
    #[error("Connection error: {0}")]
    Connection(String),

    /// Operation timed out.
    #[error("Operation timed out after {duration_ms}ms: {message}")]
    Timeout { duration_ms: u64, message: String },

    /// A response body could not be decoded.
    #[error("Decode error: {0}")]
    Decode(String),

    /// Unknown or empty command input.
    #[error("{0}")]
    Command(String),

    /// Operation attempted in the wrong lifecycle state.
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Configuration missing or invalid.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl SensorError {
    /// Shorthand for the "no command found" error.
    pub fn no_command() -> Self {
        SensorError::Command("no command found".to_string())
    }
}

/// Convenience Result type for sensor retrieval operations.
pub type Result<T> = std::result::Result<T, SensorError>;

impl From<serde_json::Error> for SensorError {
    fn from(err: serde_json::Error) -> Self {
        SensorError::Decode(err.to_string())
    }
}
