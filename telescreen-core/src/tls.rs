//! Mutual-TLS configuration for both endpoints.
//!
//! Both sides present a certificate and validate the peer against one
//! shared trusted root. The host requires a client certificate; the
//! viewer validates the host's chain and, by default, skips the
//! hostname check (see [`client_config`]).
//!
//! No revocation checking is performed.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use rustls::client::WebPkiServerVerifier;
use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::pki_types::{CertificateDer, PrivateKeyDer, ServerName, UnixTime};
use rustls::server::WebPkiClientVerifier;
use rustls::{
    CertificateError, ClientConfig, DigitallySignedStruct, RootCertStore, ServerConfig,
    SignatureScheme,
};

use crate::error::TsError;

// ── Identity loading ─────────────────────────────────────────────

/// A certificate chain plus its private key, loaded from PEM.
pub struct TlsIdentity {
    pub cert_chain: Vec<CertificateDer<'static>>,
    pub key: PrivateKeyDer<'static>,
}

impl TlsIdentity {
    /// Load an identity from PEM files on disk.
    pub fn load(cert_path: &Path, key_path: &Path) -> Result<Self, TsError> {
        let cert_pem = fs::read(cert_path).map_err(|e| {
            TsError::Config(format!("failed to read cert '{}': {e}", cert_path.display()))
        })?;
        let key_pem = fs::read(key_path).map_err(|e| {
            TsError::Config(format!("failed to read key '{}': {e}", key_path.display()))
        })?;
        Self::from_pem(&cert_pem, &key_pem)
    }

    /// Build an identity from in-memory PEM data.
    pub fn from_pem(cert_pem: &[u8], key_pem: &[u8]) -> Result<Self, TsError> {
        let cert_chain = rustls_pemfile::certs(&mut &cert_pem[..])
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| TsError::Config(format!("failed to parse certificates: {e}")))?;
        if cert_chain.is_empty() {
            return Err(TsError::Config("no certificates in PEM data".into()));
        }

        let key = rustls_pemfile::private_key(&mut &key_pem[..])
            .map_err(|e| TsError::Config(format!("failed to parse private key: {e}")))?
            .ok_or_else(|| TsError::Config("no private key found".into()))?;

        Ok(Self { cert_chain, key })
    }
}

/// Load the shared trusted root from a PEM file.
pub fn load_root_store(ca_path: &Path) -> Result<RootCertStore, TsError> {
    let pem = fs::read(ca_path).map_err(|e| {
        TsError::Config(format!("failed to read CA '{}': {e}", ca_path.display()))
    })?;
    root_store_from_pem(&pem)
}

/// Build a root store from in-memory PEM data.
pub fn root_store_from_pem(pem: &[u8]) -> Result<RootCertStore, TsError> {
    let certs = rustls_pemfile::certs(&mut &pem[..])
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| TsError::Config(format!("failed to parse CA certificates: {e}")))?;

    let mut store = RootCertStore::empty();
    for cert in certs {
        store
            .add(cert)
            .map_err(|e| TsError::Config(format!("invalid CA certificate: {e}")))?;
    }
    if store.is_empty() {
        return Err(TsError::Config("no CA certificates in PEM data".into()));
    }
    Ok(store)
}

// ── Server side ──────────────────────────────────────────────────

/// TLS configuration for the host: presents `identity` and **requires** a
/// client certificate chained to `roots`.
pub fn server_config(
    identity: TlsIdentity,
    roots: RootCertStore,
) -> Result<Arc<ServerConfig>, TsError> {
    let verifier = WebPkiClientVerifier::builder(Arc::new(roots))
        .build()
        .map_err(|e| TsError::Config(format!("client verifier: {e}")))?;

    let config = ServerConfig::builder()
        .with_client_cert_verifier(verifier)
        .with_single_cert(identity.cert_chain, identity.key)?;

    Ok(Arc::new(config))
}

// ── Client side ──────────────────────────────────────────────────

/// TLS configuration for the viewer: presents `identity` and validates the
/// host's chain against `roots`.
///
/// With `verify_hostname == false` (the default, a documented security
/// gap) the certificate chain is still validated but a name mismatch is
/// tolerated.
pub fn client_config(
    identity: TlsIdentity,
    roots: RootCertStore,
    verify_hostname: bool,
) -> Result<Arc<ClientConfig>, TsError> {
    let roots = Arc::new(roots);

    let mut config = ClientConfig::builder()
        .with_root_certificates(Arc::clone(&roots))
        .with_client_auth_cert(identity.cert_chain, identity.key)?;

    if !verify_hostname {
        let inner = WebPkiServerVerifier::builder(roots)
            .build()
            .map_err(|e| TsError::Config(format!("server verifier: {e}")))?;
        config
            .dangerous()
            .set_certificate_verifier(Arc::new(ChainOnlyVerifier { inner }));
    }

    Ok(Arc::new(config))
}

/// Verifier that delegates to webpki but tolerates a hostname mismatch.
///
/// Chain validation, expiry, and signature checks all still apply; only
/// the name check is waived.
#[derive(Debug)]
struct ChainOnlyVerifier {
    inner: Arc<WebPkiServerVerifier>,
}

impl ServerCertVerifier for ChainOnlyVerifier {
    fn verify_server_cert(
        &self,
        end_entity: &CertificateDer<'_>,
        intermediates: &[CertificateDer<'_>],
        server_name: &ServerName<'_>,
        ocsp_response: &[u8],
        now: UnixTime,
    ) -> Result<ServerCertVerified, rustls::Error> {
        match self.inner.verify_server_cert(
            end_entity,
            intermediates,
            server_name,
            ocsp_response,
            now,
        ) {
            Err(rustls::Error::InvalidCertificate(
                CertificateError::NotValidForName
                | CertificateError::NotValidForNameContext { .. },
            )) => Ok(ServerCertVerified::assertion()),
            other => other,
        }
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        self.inner.verify_tls12_signature(message, cert, dss)
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        self.inner.verify_tls13_signature(message, cert, dss)
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.inner.supported_verify_schemes()
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use rcgen::{BasicConstraints, CertificateParams, IsCa, KeyPair};

    fn ca_and_leaf() -> (String, String, String) {
        let ca_key = KeyPair::generate().unwrap();
        let mut ca_params = CertificateParams::new(Vec::new()).unwrap();
        ca_params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
        let ca_cert = ca_params.self_signed(&ca_key).unwrap();

        let leaf_key = KeyPair::generate().unwrap();
        let leaf_params = CertificateParams::new(vec!["localhost".into()]).unwrap();
        let leaf_cert = leaf_params.signed_by(&leaf_key, &ca_cert, &ca_key).unwrap();

        (ca_cert.pem(), leaf_cert.pem(), leaf_key.serialize_pem())
    }

    #[test]
    fn identity_from_pem() {
        let (_ca, cert, key) = ca_and_leaf();
        let identity = TlsIdentity::from_pem(cert.as_bytes(), key.as_bytes()).unwrap();
        assert_eq!(identity.cert_chain.len(), 1);
    }

    #[test]
    fn identity_rejects_garbage() {
        assert!(TlsIdentity::from_pem(b"not pem", b"also not pem").is_err());
    }

    #[test]
    fn root_store_from_ca_pem() {
        let (ca, _cert, _key) = ca_and_leaf();
        let store = root_store_from_pem(ca.as_bytes()).unwrap();
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn empty_root_store_rejected() {
        assert!(root_store_from_pem(b"").is_err());
    }

    #[test]
    fn configs_build() {
        let (ca, cert, key) = ca_and_leaf();

        let identity = TlsIdentity::from_pem(cert.as_bytes(), key.as_bytes()).unwrap();
        let roots = root_store_from_pem(ca.as_bytes()).unwrap();
        server_config(identity, roots).unwrap();

        let identity = TlsIdentity::from_pem(cert.as_bytes(), key.as_bytes()).unwrap();
        let roots = root_store_from_pem(ca.as_bytes()).unwrap();
        client_config(identity, roots, false).unwrap();
    }
}
