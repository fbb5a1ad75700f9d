//! Client configuration and credential material
//!
//! A client is configured programmatically: network endpoint, per-call
//! timeout, and three PEM credential artifacts (CA bundle, client key, client
//! certificate chain). Credentials supplied as file paths are read exactly
//! once, at client construction; a missing or malformed artifact fails fast
//! with [`ClientError::Configuration`] before any network activity.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::ClientError;

/// Per-call deadline applied when none is configured explicitly.
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(5);

/// A PEM credential artifact, either in memory or on disk.
#[derive(Debug, Clone)]
pub enum Credential {
    /// Raw PEM bytes already in memory.
    Pem(Vec<u8>),

    /// Path to a PEM file, read once at client construction.
    File(PathBuf),
}

impl Credential {
    pub fn pem(bytes: impl Into<Vec<u8>>) -> Self {
        Credential::Pem(bytes.into())
    }

    pub fn file(path: impl AsRef<Path>) -> Self {
        Credential::File(path.as_ref().to_path_buf())
    }

    fn resolve(&self, what: &str) -> Result<Vec<u8>, ClientError> {
        match self {
            Credential::Pem(bytes) => Ok(bytes.clone()),
            Credential::File(path) => std::fs::read(path).map_err(|e| {
                ClientError::Configuration(format!(
                    "reading {} from {}: {}",
                    what,
                    path.display(),
                    e
                ))
            }),
        }
    }
}

/// Connection parameters for a [`RouteControlClient`](crate::RouteControlClient).
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Control-plane host (name or address).
    pub host: String,

    /// Control-plane port.
    pub port: u16,

    /// CA bundle the server identity is validated against.
    pub ca_cert: Credential,

    /// Private key presented as the client identity.
    pub client_key: Credential,

    /// Certificate chain presented as the client identity.
    pub client_cert_chain: Credential,

    /// Per-call deadline.
    pub timeout: Duration,

    /// TLS server name, when it differs from `host` (e.g. dialing by address
    /// while the server certificate names a DNS hostname).
    pub tls_server_name: Option<String>,
}

impl ClientConfig {
    pub fn new(
        host: impl Into<String>,
        port: u16,
        ca_cert: Credential,
        client_key: Credential,
        client_cert_chain: Credential,
    ) -> Self {
        Self {
            host: host.into(),
            port,
            ca_cert,
            client_key,
            client_cert_chain,
            timeout: DEFAULT_CALL_TIMEOUT,
            tls_server_name: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_tls_server_name(mut self, name: impl Into<String>) -> Self {
        self.tls_server_name = Some(name.into());
        self
    }

    /// Reads and validates all three credential artifacts.
    pub(crate) fn resolve_credentials(&self) -> Result<TlsMaterial, ClientError> {
        let ca_cert = self.ca_cert.resolve("CA bundle")?;
        ensure_pem_certificates(&ca_cert, "CA bundle")?;

        let client_key = self.client_key.resolve("client key")?;
        ensure_pem_private_key(&client_key, "client key")?;

        let client_cert_chain = self.client_cert_chain.resolve("client certificate chain")?;
        ensure_pem_certificates(&client_cert_chain, "client certificate chain")?;

        Ok(TlsMaterial {
            ca_cert,
            client_key,
            client_cert_chain,
        })
    }
}

/// Resolved PEM bytes for the TLS handshake.
pub(crate) struct TlsMaterial {
    pub ca_cert: Vec<u8>,
    pub client_key: Vec<u8>,
    pub client_cert_chain: Vec<u8>,
}

fn ensure_pem_certificates(pem: &[u8], what: &str) -> Result<(), ClientError> {
    let certs: Vec<_> = rustls_pemfile::certs(&mut &pem[..])
        .collect::<Result<_, _>>()
        .map_err(|e| ClientError::Configuration(format!("parsing {}: {}", what, e)))?;
    if certs.is_empty() {
        return Err(ClientError::Configuration(format!(
            "{} contains no PEM certificates",
            what
        )));
    }
    Ok(())
}

fn ensure_pem_private_key(pem: &[u8], what: &str) -> Result<(), ClientError> {
    match rustls_pemfile::private_key(&mut &pem[..]) {
        Ok(Some(_)) => Ok(()),
        Ok(None) => Err(ClientError::Configuration(format!(
            "{} contains no PEM private key",
            what
        ))),
        Err(e) => Err(ClientError::Configuration(format!(
            "parsing {}: {}",
            what, e
        ))),
    }
}
