//! Startup configuration.
//!
//! Values come from an optional TOML file and are overridden by environment
//! variables. Every identity, registry and credential setting is required.

use std::env;
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::time::Duration;

use sensor_connect::DEFAULT_REQUEST_TIMEOUT;
use sensor_core::{
    CapabilityRequest, Result, SensorError, ServiceEndpoint, SystemIdentity,
    ORCHESTRATION_CAPABILITY,
};
use serde::Deserialize;
use tracing::{debug, info};

/// Names the config file; when unset the default path is tried.
pub const CONFIG_PATH_ENV: &str = "SENSOR_RETRIEVAL_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "sensor-retrieval.toml";

/// Resolved configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub identity: SystemIdentity,
    pub registry: ServiceEndpoint,
    pub orchestrator_capability: CapabilityRequest,
    /// Bound on registry and orchestrator calls; unbounded when `None`.
    pub registry_timeout: Option<Duration>,
    pub provider_timeout: Duration,
    pub cert_file: PathBuf,
    pub key_file: PathBuf,
    pub truststore_file: PathBuf,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct FileConfig {
    system: SystemSection,
    registry: RegistrySection,
    tls: TlsSection,
    provider: ProviderSection,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct SystemSection {
    address: Option<String>,
    port: Option<u16>,
    name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct RegistrySection {
    address: Option<String>,
    port: Option<u16>,
    orchestrator_capability: Option<String>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct TlsSection {
    cert_file: Option<PathBuf>,
    key_file: Option<PathBuf>,
    truststore_file: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct ProviderSection {
    timeout_secs: Option<u64>,
}

impl Config {
    /// Load from the config file (if any) and the process environment.
    pub fn load() -> Result<Self> {
        let (path, explicit) = match env::var(CONFIG_PATH_ENV) {
            Ok(path) => (PathBuf::from(path), true),
            Err(_) => (PathBuf::from(DEFAULT_CONFIG_PATH), false),
        };

        let contents = match fs::read_to_string(&path) {
            Ok(contents) => {
                info!("Loaded config from {}", path.display());
                Some(contents)
            }
            Err(e) if !explicit && e.kind() == ErrorKind::NotFound => {
                debug!("No config file at {}, using environment only", path.display());
                None
            }
            Err(e) => {
                return Err(SensorError::Config(format!(
                    "failed to read {}: {}",
                    path.display(),
                    e
                )))
            }
        };

        Self::from_sources(contents.as_deref(), |key| env::var(key).ok())
    }

    /// Build from TOML text and an environment lookup.
    pub fn from_sources<E>(toml_text: Option<&str>, env: E) -> Result<Self>
    where
        E: Fn(&str) -> Option<String>,
    {
        let mut file = match toml_text {
            Some(text) => toml::from_str::<FileConfig>(text)
                .map_err(|e| SensorError::Config(format!("invalid config file: {}", e)))?,
            None => FileConfig::default(),
        };
        file.apply_env(&env)?;
        file.resolve()
    }
}

impl FileConfig {
    fn apply_env<E>(&mut self, env: &E) -> Result<()>
    where
        E: Fn(&str) -> Option<String>,
    {
        if let Some(v) = env("ADDRESS") {
            self.system.address = Some(v);
        }
        if let Some(v) = env("PORT") {
            self.system.port = Some(parse_number("PORT", &v)?);
        }
        if let Some(v) = env("SYSTEM_NAME") {
            self.system.name = Some(v);
        }
        if let Some(v) = env("SERVICE_REGISTRY_ADDRESS") {
            self.registry.address = Some(v);
        }
        if let Some(v) = env("SERVICE_REGISTRY_PORT") {
            self.registry.port = Some(parse_number("SERVICE_REGISTRY_PORT", &v)?);
        }
        if let Some(v) = env("ORCHESTRATOR_CAPABILITY") {
            self.registry.orchestrator_capability = Some(v);
        }
        if let Some(v) = env("REGISTRY_TIMEOUT_SECS") {
            self.registry.timeout_secs = Some(parse_number("REGISTRY_TIMEOUT_SECS", &v)?);
        }
        if let Some(v) = env("PROVIDER_TIMEOUT_SECS") {
            self.provider.timeout_secs = Some(parse_number("PROVIDER_TIMEOUT_SECS", &v)?);
        }
        if let Some(v) = env("CERT_FILE_PATH") {
            self.tls.cert_file = Some(PathBuf::from(v));
        }
        if let Some(v) = env("KEY_FILE_PATH") {
            self.tls.key_file = Some(PathBuf::from(v));
        }
        if let Some(v) = env("TRUSTSTORE_FILE_PATH") {
            self.tls.truststore_file = Some(PathBuf::from(v));
        }
        Ok(())
    }

    fn resolve(self) -> Result<Config> {
        let identity = SystemIdentity::new(
            required_text(self.system.address, "system address (ADDRESS)")?,
            required_port(self.system.port, "system port (PORT)")?,
            required_text(self.system.name, "system name (SYSTEM_NAME)")?,
        );

        let registry = ServiceEndpoint::new(
            required_text(
                self.registry.address,
                "registry address (SERVICE_REGISTRY_ADDRESS)",
            )?,
            required_port(self.registry.port, "registry port (SERVICE_REGISTRY_PORT)")?,
        );

        let orchestrator_capability = CapabilityRequest::new(
            self.registry
                .orchestrator_capability
                .filter(|name| !name.trim().is_empty())
                .unwrap_or_else(|| ORCHESTRATION_CAPABILITY.to_string()),
        );

        let registry_timeout = match self.registry.timeout_secs {
            Some(0) => return Err(SensorError::Config("registry timeout must be positive".into())),
            other => other.map(Duration::from_secs),
        };
        let provider_timeout = match self.provider.timeout_secs {
            Some(0) => return Err(SensorError::Config("provider timeout must be positive".into())),
            Some(secs) => Duration::from_secs(secs),
            None => DEFAULT_REQUEST_TIMEOUT,
        };

        Ok(Config {
            identity,
            registry,
            orchestrator_capability,
            registry_timeout,
            provider_timeout,
            cert_file: required_path(self.tls.cert_file, "certificate (CERT_FILE_PATH)")?,
            key_file: required_path(self.tls.key_file, "private key (KEY_FILE_PATH)")?,
            truststore_file: required_path(
                self.tls.truststore_file,
                "trust bundle (TRUSTSTORE_FILE_PATH)",
            )?,
        })
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| SensorError::Config(format!("{} is not a valid number: '{}'", key, value)))
}

fn missing(what: &str) -> SensorError {
    SensorError::Config(format!("missing required setting: {}", what))
}

fn required_text(value: Option<String>, what: &str) -> Result<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| missing(what))
}

fn required_port(value: Option<u16>, what: &str) -> Result<u16> {
    match value {
        Some(0) => Err(SensorError::Config(format!("{} must not be 0", what))),
        Some(port) => Ok(port),
        None => Err(missing(what)),
    }
}

fn required_path(value: Option<PathBuf>, what: &str) -> Result<PathBuf> {
    value
        .filter(|p| !p.as_os_str().is_empty())
        .ok_or_else(|| missing(what))
}
