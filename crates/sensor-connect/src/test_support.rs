//! Loopback mutual-TLS peers for exercising the HTTPS clients.

use std::convert::Infallible;
use std::net::{IpAddr, Ipv4Addr};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use http_body_util::{BodyExt, Full};
use hyper::body::{Bytes, Incoming};
use hyper::ext::ReasonPhrase;
use hyper::header::CONTENT_TYPE;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use rcgen::{
    BasicConstraints, CertificateParams, DnType, ExtendedKeyUsagePurpose, IsCa, KeyPair,
    KeyUsagePurpose, SanType,
};
use rustls::pki_types::{PrivateKeyDer, PrivatePkcs8KeyDer};
use rustls::server::WebPkiClientVerifier;
use rustls::{RootCertStore, ServerConfig};
use sensor_core::ServiceEndpoint;
use tempfile::TempDir;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_rustls::TlsAcceptor;

use crate::credentials::CredentialStore;
use crate::transport::SecureTransportFactory;

/// A throwaway certificate authority.
pub(crate) struct Authority {
    cert: rcgen::Certificate,
    key: KeyPair,
}

impl Authority {
    pub(crate) fn new(name: &str) -> Self {
        let key = KeyPair::generate().unwrap();
        let mut params = CertificateParams::default();
        params.distinguished_name.push(DnType::CommonName, name);
        params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
        params.key_usages = vec![
            KeyUsagePurpose::KeyCertSign,
            KeyUsagePurpose::CrlSign,
            KeyUsagePurpose::DigitalSignature,
        ];
        let cert = params.self_signed(&key).unwrap();
        Self { cert, key }
    }

    pub(crate) fn pem(&self) -> String {
        self.cert.pem()
    }

    fn roots(&self) -> RootCertStore {
        let mut roots = RootCertStore::empty();
        roots.add(self.cert.der().clone()).unwrap();
        roots
    }

    fn issue(
        &self,
        name: &str,
        subject_alt_names: Vec<SanType>,
        usage: ExtendedKeyUsagePurpose,
    ) -> (rcgen::Certificate, KeyPair) {
        let key = KeyPair::generate().unwrap();
        let mut params = CertificateParams::default();
        params.distinguished_name.push(DnType::CommonName, name);
        params.subject_alt_names = subject_alt_names;
        params.extended_key_usages = vec![usage];
        let cert = params.signed_by(&key, &self.cert, &self.key).unwrap();
        (cert, key)
    }
}

/// Builds a transport factory whose identity is issued by `issuer` and
/// whose trust bundle holds only `trusted`.
pub(crate) async fn client_factory(
    dir: &TempDir,
    issuer: &Authority,
    trusted: &Authority,
    timeout: Duration,
) -> SecureTransportFactory {
    let (cert, key) = issuer.issue(
        "sensor-client",
        Vec::new(),
        ExtendedKeyUsagePurpose::ClientAuth,
    );

    let cert_path = dir.path().join("client.pem");
    let key_path = dir.path().join("client.key");
    let trust_path = dir.path().join("truststore.pem");
    std::fs::write(&cert_path, cert.pem()).unwrap();
    std::fs::write(&key_path, key.serialize_pem()).unwrap();
    std::fs::write(&trust_path, trusted.pem()).unwrap();

    let store = CredentialStore::load(&cert_path, &key_path, &trust_path)
        .await
        .unwrap();
    SecureTransportFactory::new(store.credentials(), timeout)
}

/// What the loopback server answers to every request.
#[derive(Debug, Clone)]
pub(crate) struct CannedReply {
    status: u16,
    reason: Option<&'static str>,
    body: String,
    delay: Duration,
}

impl CannedReply {
    pub(crate) fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            reason: None,
            body: body.into(),
            delay: Duration::ZERO,
        }
    }

    /// Send `reason` in the status line instead of the canonical phrase.
    pub(crate) fn with_reason(mut self, reason: &'static str) -> Self {
        self.reason = Some(reason);
        self
    }

    /// Hold the response back for `delay`.
    pub(crate) fn delayed(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

#[derive(Debug, Clone)]
pub(crate) struct RecordedRequest {
    pub method: String,
    /// Path and query as sent.
    pub target: String,
    pub content_type: Option<String>,
    pub body: String,
    /// Certificates the client presented during the handshake.
    pub client_certs: usize,
}

/// HTTPS server on 127.0.0.1 that requires a client certificate issued by
/// the given authority.
pub(crate) struct LoopbackServer {
    endpoint: ServiceEndpoint,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
    task: JoinHandle<()>,
}

impl LoopbackServer {
    pub(crate) async fn start(
        server_ca: &Authority,
        client_ca: &Authority,
        reply: CannedReply,
    ) -> Self {
        let (cert, key) = server_ca.issue(
            "loopback",
            vec![SanType::IpAddress(IpAddr::V4(Ipv4Addr::LOCALHOST))],
            ExtendedKeyUsagePurpose::ServerAuth,
        );

        let provider = Arc::new(rustls::crypto::ring::default_provider());
        let verifier = WebPkiClientVerifier::builder_with_provider(
            Arc::new(client_ca.roots()),
            provider.clone(),
        )
        .build()
        .unwrap();
        let config = ServerConfig::builder_with_provider(provider)
            .with_safe_default_protocol_versions()
            .unwrap()
            .with_client_cert_verifier(verifier)
            .with_single_cert(
                vec![cert.der().clone()],
                PrivateKeyDer::Pkcs8(PrivatePkcs8KeyDer::from(key.serialize_der())),
            )
            .unwrap();
        let acceptor = TlsAcceptor::from(Arc::new(config));

        let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let requests = Arc::new(Mutex::new(Vec::new()));

        let log = requests.clone();
        let task = tokio::spawn(async move {
            while let Ok((tcp, _)) = listener.accept().await {
                let acceptor = acceptor.clone();
                let reply = reply.clone();
                let log = log.clone();
                tokio::spawn(async move {
                    let Ok(tls) = acceptor.accept(tcp).await else {
                        return;
                    };
                    let client_certs = tls.get_ref().1.peer_certificates().map_or(0, |c| c.len());
                    let service = service_fn(move |request| {
                        answer(request, client_certs, reply.clone(), log.clone())
                    });
                    let _ = http1::Builder::new()
                        .serve_connection(TokioIo::new(tls), service)
                        .await;
                });
            }
        });

        Self {
            endpoint: ServiceEndpoint::new("127.0.0.1", port),
            requests,
            task,
        }
    }

    pub(crate) fn endpoint(&self) -> &ServiceEndpoint {
        &self.endpoint
    }

    pub(crate) fn url(&self, path: &str) -> String {
        format!("{}{}", self.endpoint.base_url(), path)
    }

    pub(crate) fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl Drop for LoopbackServer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn answer(
    request: Request<Incoming>,
    client_certs: usize,
    reply: CannedReply,
    log: Arc<Mutex<Vec<RecordedRequest>>>,
) -> Result<Response<Full<Bytes>>, Infallible> {
    let method = request.method().to_string();
    let target = request.uri().to_string();
    let content_type = request
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let body = request
        .into_body()
        .collect()
        .await
        .map(|collected| collected.to_bytes())
        .unwrap_or_default();

    log.lock().unwrap().push(RecordedRequest {
        method,
        target,
        content_type,
        body: String::from_utf8_lossy(&body).into_owned(),
        client_certs,
    });

    if !reply.delay.is_zero() {
        tokio::time::sleep(reply.delay).await;
    }

    let mut response = Response::new(Full::new(Bytes::from(reply.body)));
    *response.status_mut() = StatusCode::from_u16(reply.status).unwrap();
    if let Some(reason) = reply.reason {
        response
            .extensions_mut()
            .insert(ReasonPhrase::from_static(reason.as_bytes()));
    }
    Ok(response)
}
