//! # Sensor Retrieval
//!
//! Registers with the service registry, locates the orchestrator, and
//! serves an interactive command loop that fetches sensor readings over
//! mutually authenticated HTTPS.

use std::sync::Arc;

use sensor_connect::{
    CredentialStore, HttpOrchestratorClient, HttpRegistryClient, OrchestratorClient,
    SecureTransportFactory,
};
use tokio::io::BufReader;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

mod cli;
mod config;
mod system;
#[cfg(test)]
mod testing;

use cli::CommandLoop;
use config::Config;
use system::RetrievalSystem;

fn init_tracing() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

/// Load credentials, locate the orchestrator and register.
async fn bootstrap(config: &Config) -> sensor_core::Result<RetrievalSystem> {
    let store =
        CredentialStore::load(&config.cert_file, &config.key_file, &config.truststore_file).await?;

    let transports = Arc::new(SecureTransportFactory::new(
        store.credentials(),
        config.provider_timeout,
    ));
    let control_client = transports.http_client(config.registry_timeout)?;
    let registry = Arc::new(HttpRegistryClient::new(
        &config.registry,
        control_client.clone(),
    ));
    info!("📒 Using registry at {}", registry.base_url());

    let mut system = RetrievalSystem::connect(
        config.identity.clone(),
        registry,
        &config.orchestrator_capability,
        move |endpoint| {
            Ok(Arc::new(HttpOrchestratorClient::new(endpoint, control_client))
                as Arc<dyn OrchestratorClient>)
        },
        transports,
    )
    .await?;

    system.start().await?;
    Ok(system)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing()?;

    info!("🚀 Sensor retrieval system starting...");

    let config = Config::load()?;
    let system = match bootstrap(&config).await {
        Ok(system) => system,
        Err(e) => {
            error!("❌ Startup failed: {}", e);
            return Err(e.into());
        }
    };

    info!("✅ Ready as {}", system.identity());

    let input = BufReader::new(tokio::io::stdin());
    CommandLoop::new(system, input, std::io::stdout())
        .run()
        .await?;

    info!("Sensor retrieval system stopped");
    Ok(())
}
