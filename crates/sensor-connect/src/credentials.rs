//! Identity certificate, private key and trust roots loaded from PEM files.

use std::fmt;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use rustls::pki_types::{CertificateDer, PrivateKeyDer};
use rustls::RootCertStore;
use sensor_core::{Result, SensorError};
use tokio::fs;
use tracing::{debug, info, warn};

/// Where the credentials were loaded from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialPaths {
    /// Identity certificate (PEM chain, leaf first).
    pub cert_file: PathBuf,
    /// Private key matching the identity certificate.
    pub key_file: PathBuf,
    /// Trusted root bundle (PEM).
    pub truststore_file: PathBuf,
}

/// Loaded credentials. Read-only after load.
pub struct Credentials {
    paths: CredentialPaths,
    cert_pem: Vec<u8>,
    key_pem: Vec<u8>,
    cert_chain: Vec<CertificateDer<'static>>,
    trust_roots: Vec<CertificateDer<'static>>,
}

impl Credentials {
    pub fn paths(&self) -> &CredentialPaths {
        &self.paths
    }

    /// Identity certificate chain as read from disk.
    pub fn cert_pem(&self) -> &[u8] {
        &self.cert_pem
    }

    /// Private key as read from disk.
    pub fn key_pem(&self) -> &[u8] {
        &self.key_pem
    }

    pub fn cert_chain(&self) -> &[CertificateDer<'static>] {
        &self.cert_chain
    }

    /// Roots accepted into the trust store.
    pub fn trust_roots(&self) -> &[CertificateDer<'static>] {
        &self.trust_roots
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("paths", &self.paths)
            .field("cert_chain_len", &self.cert_chain.len())
            .field("trust_roots", &self.trust_roots.len())
            .finish_non_exhaustive()
    }
}

/// Holds the credentials shared by every transport built during the process.
#[derive(Debug, Clone)]
pub struct CredentialStore {
    credentials: Arc<Credentials>,
}

impl CredentialStore {
    /// Load and validate the identity pair and the trust bundle.
    pub async fn load(
        cert_path: impl AsRef<Path>,
        key_path: impl AsRef<Path>,
        truststore_path: impl AsRef<Path>,
    ) -> Result<Self> {
        let paths = CredentialPaths {
            cert_file: cert_path.as_ref().to_path_buf(),
            key_file: key_path.as_ref().to_path_buf(),
            truststore_file: truststore_path.as_ref().to_path_buf(),
        };

        let cert_pem = fs::read(&paths.cert_file).await.map_err(|e| {
            SensorError::Credential(format!(
                "failed to read certificate {}: {}",
                paths.cert_file.display(),
                e
            ))
        })?;
        let cert_chain = parse_cert_chain(&cert_pem, &paths.cert_file)?;

        let key_pem = fs::read(&paths.key_file).await.map_err(|e| {
            SensorError::Credential(format!(
                "failed to read private key {}: {}",
                paths.key_file.display(),
                e
            ))
        })?;
        let key = parse_private_key(&key_pem, &paths.key_file)?;
        check_key_pair(&cert_chain, &key)?;

        let truststore_pem = fs::read(&paths.truststore_file).await.map_err(|e| {
            SensorError::TrustStore(format!(
                "failed to read trust bundle {}: {}",
                paths.truststore_file.display(),
                e
            ))
        })?;
        let trust_roots = parse_trust_roots(&truststore_pem, &paths.truststore_file)?;

        info!(
            cert = %paths.cert_file.display(),
            roots = trust_roots.len(),
            "✓ Credentials loaded"
        );

        Ok(Self {
            credentials: Arc::new(Credentials {
                paths,
                cert_pem,
                key_pem,
                cert_chain,
                trust_roots,
            }),
        })
    }

    pub fn credentials(&self) -> Arc<Credentials> {
        Arc::clone(&self.credentials)
    }
}

fn parse_cert_chain(pem: &[u8], path: &Path) -> Result<Vec<CertificateDer<'static>>> {
    let chain = rustls_pemfile::certs(&mut BufReader::new(pem))
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| {
            SensorError::Credential(format!(
                "failed to parse certificate {}: {}",
                path.display(),
                e
            ))
        })?;

    if chain.is_empty() {
        return Err(SensorError::Credential(format!(
            "no certificates found in {}",
            path.display()
        )));
    }

    Ok(chain)
}

fn parse_private_key(pem: &[u8], path: &Path) -> Result<PrivateKeyDer<'static>> {
    rustls_pemfile::private_key(&mut BufReader::new(pem))
        .map_err(|e| {
            SensorError::Credential(format!(
                "failed to parse private key {}: {}",
                path.display(),
                e
            ))
        })?
        .ok_or_else(|| {
            SensorError::Credential(format!("no private key found in {}", path.display()))
        })
}

fn check_key_pair(chain: &[CertificateDer<'static>], key: &PrivateKeyDer<'static>) -> Result<()> {
    let signing_key = rustls::crypto::ring::sign::any_supported_type(key)
        .map_err(|e| SensorError::Credential(format!("unsupported private key: {}", e)))?;

    let certified = rustls::sign::CertifiedKey::new(chain.to_vec(), signing_key);
    match certified.keys_match() {
        Ok(()) => Ok(()),
        // The key type does not expose its public half; rely on the handshake.
        Err(rustls::Error::InconsistentKeys(rustls::InconsistentKeys::Unknown)) => {
            debug!("Key type cannot be matched against certificate offline");
            Ok(())
        }
        Err(e) => Err(SensorError::Credential(format!(
            "certificate and private key do not form a pair: {}",
            e
        ))),
    }
}

fn parse_trust_roots(pem: &[u8], path: &Path) -> Result<Vec<CertificateDer<'static>>> {
    let candidates = rustls_pemfile::certs(&mut BufReader::new(pem))
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| {
            SensorError::TrustStore(format!(
                "failed to parse trust bundle {}: {}",
                path.display(),
                e
            ))
        })?;

    let mut store = RootCertStore::empty();
    let mut roots = Vec::with_capacity(candidates.len());
    for cert in candidates {
        match store.add(cert.clone()) {
            Ok(()) => roots.push(cert),
            Err(e) => warn!("Skipping unusable root in {}: {}", path.display(), e),
        }
    }

    if roots.is_empty() {
        return Err(SensorError::TrustStore(format!(
            "no usable root certificates in {}",
            path.display()
        )));
    }

    Ok(roots)
}
