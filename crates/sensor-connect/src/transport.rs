//! Mutually authenticated HTTPS transport.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use sensor_core::{Result, SensorError};
use tracing::debug;

use crate::credentials::Credentials;

/// Per-request timeout applied to provider calls.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Status and body of a provider response, read in full.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderResponse {
    pub status: u16,
    pub reason: Option<String>,
    pub body: Vec<u8>,
}

impl ProviderResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            reason: reqwest::StatusCode::from_u16(status)
                .ok()
                .and_then(|s| s.canonical_reason())
                .map(str::to_string),
            body: body.into(),
        }
    }

    /// Status line such as `503 Service Unavailable`, using the reason
    /// phrase the provider sent.
    pub fn status_line(&self) -> String {
        match &self.reason {
            Some(reason) => format!("{} {}", self.status, reason),
            None => self.status.to_string(),
        }
    }

    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Issues GET requests against providers.
#[async_trait]
pub trait Transport: Send + Sync {
    /// GET `url` with `Content-Type: application/json` and read the full body.
    async fn get(&self, url: &str) -> Result<ProviderResponse>;
}

/// Produces transports; consulted once per provider request.
pub trait TransportFactory: Send + Sync {
    fn build(&self) -> Result<Arc<dyn Transport>>;
}

/// Builds reqwest clients that present the loaded identity and trust only
/// the loaded roots.
#[derive(Debug, Clone)]
pub struct SecureTransportFactory {
    credentials: Arc<Credentials>,
    timeout: Duration,
}

impl SecureTransportFactory {
    pub fn new(credentials: Arc<Credentials>, timeout: Duration) -> Self {
        Self {
            credentials,
            timeout,
        }
    }

    /// Provider request timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Build a mutually authenticated client with an optional timeout.
    ///
    /// Certificate verification is always on and web PKI roots are never
    /// consulted.
    pub fn http_client(&self, timeout: Option<Duration>) -> Result<reqwest::Client> {
        let mut identity_pem = self.credentials.cert_pem().to_vec();
        identity_pem.push(b'\n');
        identity_pem.extend_from_slice(self.credentials.key_pem());

        let identity = reqwest::Identity::from_pem(&identity_pem)
            .map_err(|e| SensorError::TransportBuild(format!("invalid client identity: {}", e)))?;

        let mut builder = reqwest::Client::builder()
            .use_rustls_tls()
            .tls_built_in_root_certs(false)
            .https_only(true)
            .identity(identity);

        for root in self.credentials.trust_roots() {
            let cert = reqwest::Certificate::from_der(root.as_ref()).map_err(|e| {
                SensorError::TransportBuild(format!("invalid trust root: {}", e))
            })?;
            builder = builder.add_root_certificate(cert);
        }

        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        builder
            .build()
            .map_err(|e| SensorError::TransportBuild(e.to_string()))
    }
}

impl TransportFactory for SecureTransportFactory {
    fn build(&self) -> Result<Arc<dyn Transport>> {
        let client = self.http_client(Some(self.timeout))?;
        Ok(Arc::new(HttpsTransport {
            client,
            timeout: self.timeout,
        }))
    }
}

/// Transport backed by a mutually authenticated reqwest client.
pub struct HttpsTransport {
    client: reqwest::Client,
    timeout: Duration,
}

#[async_trait]
impl Transport for HttpsTransport {
    async fn get(&self, url: &str) -> Result<ProviderResponse> {
        debug!("GET {}", url);

        let response = self
            .client
            .get(url)
            .header(CONTENT_TYPE, "application/json")
            .send()
            .await
            .map_err(|e| request_error(e, Some(self.timeout)))?;

        let status = response.status();
        // hyper only records the phrase when it differs from the canonical one.
        let reason = response
            .extensions()
            .get::<hyper::ext::ReasonPhrase>()
            .map(|phrase| String::from_utf8_lossy(phrase.as_bytes()).into_owned())
            .or_else(|| status.canonical_reason().map(str::to_string));
        let body = response
            .bytes()
            .await
            .map_err(|e| request_error(e, Some(self.timeout)))?;

        Ok(ProviderResponse {
            status: status.as_u16(),
            reason,
            body: body.to_vec(),
        })
    }
}

/// Classify a reqwest failure.
pub(crate) fn request_error(err: reqwest::Error, timeout: Option<Duration>) -> SensorError {
    if err.is_timeout() {
        SensorError::Timeout {
            duration_ms: timeout.map(|t| t.as_millis() as u64).unwrap_or_default(),
            message: err.to_string(),
        }
    } else {
        SensorError::Connection(err.to_string())
    }
}

/// Fail with status and body text unless the response is a success.
pub(crate) async fn ensure_success(
    response: reqwest::Response,
) -> std::result::Result<reqwest::Response, String> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(format!("status: {}, body: {}", status, body))
}
