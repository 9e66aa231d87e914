//! Transport security for directory connections
//!
//! Selects between plaintext, implicit TLS (LDAPS) and STARTTLS, and builds the
//! rustls client configuration from PEM material on disk.

use crate::ldap::error::{DirectoryError, DirectoryResult};
use dirauth_core::{TlsSettings, DEFAULT_LDAPS_PORT, DEFAULT_LDAP_PORT};
use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::crypto::{self, CryptoProvider};
use rustls::pki_types::{CertificateDer, PrivateKeyDer, ServerName, UnixTime};
use rustls::{ClientConfig, DigitallySignedStruct, RootCertStore, SignatureScheme};
use std::fmt;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, warn};

/// How the connection to a server is secured
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportMode {
    /// Plain TCP
    Plain,
    /// TLS from the first byte
    Tls,
    /// Plain TCP upgraded with the StartTLS extended operation
    StartTls,
}

impl TransportMode {
    /// Implicit TLS wins when both TLS and STARTTLS are requested.
    pub fn from_settings(settings: &TlsSettings) -> Self {
        if settings.enabled {
            TransportMode::Tls
        } else if settings.start_tls {
            TransportMode::StartTls
        } else {
            TransportMode::Plain
        }
    }

    pub fn is_secure(&self) -> bool {
        !matches!(self, TransportMode::Plain)
    }

    pub fn scheme(&self) -> &'static str {
        match self {
            TransportMode::Tls => "ldaps",
            TransportMode::Plain | TransportMode::StartTls => "ldap",
        }
    }

    pub fn default_port(&self) -> u16 {
        match self {
            TransportMode::Tls => DEFAULT_LDAPS_PORT,
            TransportMode::Plain | TransportMode::StartTls => DEFAULT_LDAP_PORT,
        }
    }
}

impl fmt::Display for TransportMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportMode::Plain => write!(f, "plain"),
            TransportMode::Tls => write!(f, "tls"),
            TransportMode::StartTls => write!(f, "starttls"),
        }
    }
}

/// Hostname part of a `host:port` server URL, used as the expected TLS server name
pub fn server_name(url: &str) -> &str {
    url.split(':').next().unwrap_or(url)
}

/// Builds a TLS client configuration from certificate material on disk.
pub trait SecureTransportBuilder: Send + Sync {
    fn build(
        &self,
        ca_cert_path: Option<&Path>,
        cert_path: Option<&Path>,
        key_path: Option<&Path>,
        skip_verify: bool,
    ) -> DirectoryResult<Arc<ClientConfig>>;
}

/// Transport decision for one call: the mode plus, for secure modes, the TLS configuration.
#[derive(Clone)]
pub struct TransportSecurity {
    pub mode: TransportMode,
    pub config: Option<Arc<ClientConfig>>,
}

impl TransportSecurity {
    pub fn plain() -> Self {
        Self {
            mode: TransportMode::Plain,
            config: None,
        }
    }

    /// Select the mode and build the TLS configuration once for all endpoints.
    ///
    /// Errors here are configuration errors and are returned before any
    /// connection attempt is made.
    pub fn negotiate(
        settings: &TlsSettings,
        builder: &dyn SecureTransportBuilder,
    ) -> DirectoryResult<Self> {
        let mode = TransportMode::from_settings(settings);
        if !mode.is_secure() {
            return Ok(Self::plain());
        }

        let config = builder.build(
            settings.ca_cert_path.as_deref(),
            settings.cert_path.as_deref(),
            settings.key_path.as_deref(),
            settings.skip_verify,
        )?;

        Ok(Self {
            mode,
            config: Some(config),
        })
    }
}

impl fmt::Debug for TransportSecurity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransportSecurity")
            .field("mode", &self.mode)
            .field("config", &self.config.is_some())
            .finish()
    }
}

// ============================================================================
// PEM-backed builder
// ============================================================================

/// Loads PEM files and builds a rustls configuration using the ring provider.
///
/// Without a CA file the platform trust store is used.
#[derive(Debug, Default, Clone, Copy)]
pub struct PemTransportBuilder;

impl SecureTransportBuilder for PemTransportBuilder {
    fn build(
        &self,
        ca_cert_path: Option<&Path>,
        cert_path: Option<&Path>,
        key_path: Option<&Path>,
        skip_verify: bool,
    ) -> DirectoryResult<Arc<ClientConfig>> {
        let provider = Arc::new(crypto::ring::default_provider());

        let roots = match ca_cert_path {
            Some(path) => {
                let mut roots = RootCertStore::empty();
                for cert in load_certs(path)? {
                    roots.add(cert).map_err(|e| {
                        DirectoryError::Config(format!("Invalid CA certificate in {:?}: {}", path, e))
                    })?;
                }
                debug!("Loaded {} CA certificate(s) from {:?}", roots.len(), path);
                roots
            }
            None => native_roots(),
        };

        let builder = ClientConfig::builder_with_provider(provider.clone())
            .with_safe_default_protocol_versions()
            .map_err(|e| DirectoryError::Config(format!("TLS config error: {}", e)))?
            .with_root_certificates(roots);

        let mut config = match (cert_path, key_path) {
            (Some(cert), Some(key)) => {
                let certs = load_certs(cert)?;
                let key = load_private_key(key)?;
                builder
                    .with_client_auth_cert(certs, key)
                    .map_err(|e| DirectoryError::Config(format!("TLS client cert error: {}", e)))?
            }
            (None, None) => builder.with_no_client_auth(),
            _ => {
                return Err(DirectoryError::Config(
                    "TLS client certificate and key must be given together".into(),
                ))
            }
        };

        if skip_verify {
            warn!("TLS certificate verification is disabled for directory connections");
            config
                .dangerous()
                .set_certificate_verifier(Arc::new(NoCertVerification { provider }));
        }

        Ok(Arc::new(config))
    }
}

fn native_roots() -> RootCertStore {
    let mut roots = RootCertStore::empty();
    let result = rustls_native_certs::load_native_certs();
    for err in &result.errors {
        warn!("Failed to load a platform certificate: {}", err);
    }
    let (added, ignored) = roots.add_parsable_certificates(result.certs);
    debug!("Loaded {} platform CA certificate(s), ignored {}", added, ignored);
    roots
}

/// Load certificates from PEM file
fn load_certs(path: &Path) -> DirectoryResult<Vec<CertificateDer<'static>>> {
    let file = File::open(path).map_err(|e| {
        DirectoryError::Config(format!("Failed to open certificate file {:?}: {}", path, e))
    })?;
    let mut reader = BufReader::new(file);

    let certs: Vec<CertificateDer<'static>> = rustls_pemfile::certs(&mut reader)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| DirectoryError::Config(format!("Failed to parse certificates: {}", e)))?;

    if certs.is_empty() {
        return Err(DirectoryError::Config(format!(
            "No certificates found in {:?}",
            path
        )));
    }

    Ok(certs)
}

/// Load private key from PEM file
fn load_private_key(path: &Path) -> DirectoryResult<PrivateKeyDer<'static>> {
    let file = File::open(path).map_err(|e| {
        DirectoryError::Config(format!("Failed to open key file {:?}: {}", path, e))
    })?;
    let mut reader = BufReader::new(file);

    loop {
        match rustls_pemfile::read_one(&mut reader) {
            Ok(Some(rustls_pemfile::Item::Pkcs1Key(key))) => return Ok(PrivateKeyDer::Pkcs1(key)),
            Ok(Some(rustls_pemfile::Item::Pkcs8Key(key))) => return Ok(PrivateKeyDer::Pkcs8(key)),
            Ok(Some(rustls_pemfile::Item::Sec1Key(key))) => return Ok(PrivateKeyDer::Sec1(key)),
            Ok(None) => break,
            Ok(Some(_)) => continue,
            Err(e) => {
                return Err(DirectoryError::Config(format!(
                    "Failed to parse private key: {}",
                    e
                )));
            }
        }
    }

    Err(DirectoryError::Config(format!(
        "No private key found in {:?}",
        path
    )))
}

/// Accepts any server certificate but still checks handshake signatures.
#[derive(Debug)]
struct NoCertVerification {
    provider: Arc<CryptoProvider>,
}

impl ServerCertVerifier for NoCertVerification {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> Result<ServerCertVerified, rustls::Error> {
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        crypto::verify_tls12_signature(
            message,
            cert,
            dss,
            &self.provider.signature_verification_algorithms,
        )
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        crypto::verify_tls13_signature(
            message,
            cert,
            dss,
            &self.provider.signature_verification_algorithms,
        )
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.provider
            .signature_verification_algorithms
            .supported_schemes()
    }
}
