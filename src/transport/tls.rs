//! TLS trust evaluation.
//!
//! TVs serve self-signed certificates, so the usual web PKI check always
//! fails. Trust is decided by a pluggable [`TrustEvaluator`] instead, wired
//! into rustls as a custom server certificate verifier. Handshake signatures
//! are still verified with the ring provider.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use rustc_hash::FxHashMap;
use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::crypto::{CryptoProvider, verify_tls12_signature, verify_tls13_signature};
use rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use rustls::{CertificateError, ClientConfig, DigitallySignedStruct, SignatureScheme};
use tracing::{debug, warn};

use crate::error::{Error, Result};

// ============================================================================
// TrustEvaluator
// ============================================================================

/// Decides whether a server certificate is acceptable.
pub trait TrustEvaluator: Send + Sync + fmt::Debug {
    /// Returns `true` to accept `end_entity` (DER) presented by `host`.
    fn evaluate(&self, host: &str, end_entity: &[u8]) -> bool;
}

// ============================================================================
// TrustAll
// ============================================================================

/// Accepts every certificate.
///
/// Only used when the caller supplies no evaluator.
#[derive(Debug, Clone, Copy, Default)]
pub struct TrustAll;

impl TrustEvaluator for TrustAll {
    fn evaluate(&self, _host: &str, _end_entity: &[u8]) -> bool {
        true
    }
}

// ============================================================================
// PinnedCertificates
// ============================================================================

/// Accepts only certificates pinned for the presenting host.
#[derive(Debug, Clone, Default)]
pub struct PinnedCertificates {
    pins: FxHashMap<String, Vec<Vec<u8>>>,
}

impl PinnedCertificates {
    /// Creates an empty pin set that rejects everything.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Pins a DER certificate for a host.
    #[must_use]
    pub fn pin(mut self, host: impl Into<String>, der: impl Into<Vec<u8>>) -> Self {
        self.pins.entry(host.into()).or_default().push(der.into());
        self
    }

    /// Number of pinned hosts.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.pins.len()
    }

    /// Returns `true` if nothing is pinned.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pins.is_empty()
    }
}

impl TrustEvaluator for PinnedCertificates {
    fn evaluate(&self, host: &str, end_entity: &[u8]) -> bool {
        self.pins
            .get(host)
            .is_some_and(|certs| certs.iter().any(|c| c.as_slice() == end_entity))
    }
}

// ============================================================================
// Verifier
// ============================================================================

/// Adapts a [`TrustEvaluator`] to rustls.
struct EvaluatorVerifier {
    evaluator: Arc<dyn TrustEvaluator>,
    provider: Arc<CryptoProvider>,
}

impl fmt::Debug for EvaluatorVerifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EvaluatorVerifier")
            .field("evaluator", &self.evaluator)
            .finish_non_exhaustive()
    }
}

impl ServerCertVerifier for EvaluatorVerifier {
    fn verify_server_cert(
        &self,
        end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> std::result::Result<ServerCertVerified, rustls::Error> {
        let host = server_name.to_str();
        if self.evaluator.evaluate(&host, end_entity.as_ref()) {
            debug!(host = %host, "Server certificate accepted");
            Ok(ServerCertVerified::assertion())
        } else {
            warn!(host = %host, "Server certificate rejected by trust evaluator");
            Err(rustls::Error::InvalidCertificate(
                CertificateError::ApplicationVerificationFailure,
            ))
        }
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> std::result::Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls12_signature(
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
    ) -> std::result::Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls13_signature(
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

// ============================================================================
// Config
// ============================================================================

/// Resolves the caller's evaluator, falling back to [`TrustAll`].
#[must_use]
pub fn resolve_evaluator(evaluator: Option<Arc<dyn TrustEvaluator>>) -> Arc<dyn TrustEvaluator> {
    evaluator.unwrap_or_else(|| {
        warn!("No trust evaluator configured, accepting any TV certificate");
        Arc::new(TrustAll)
    })
}

/// Builds a rustls client config that defers certificate trust to `evaluator`.
///
/// # Errors
///
/// Returns [`Error::Config`] if the ring provider rejects the default
/// protocol versions.
pub fn client_config(evaluator: Arc<dyn TrustEvaluator>) -> Result<Arc<ClientConfig>> {
    let provider = Arc::new(rustls::crypto::ring::default_provider());
    let verifier = EvaluatorVerifier {
        evaluator,
        provider: Arc::clone(&provider),
    };

    let config = ClientConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()
        .map_err(|e| Error::config(format!("TLS setup failed: {e}")))?
        .dangerous()
        .with_custom_certificate_verifier(Arc::new(verifier))
        .with_no_client_auth();

    Ok(Arc::new(config))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trust_all_accepts() {
        assert!(TrustAll.evaluate("10.0.0.2", b"anything"));
    }

    #[test]
    fn test_pinned_certificates() {
        let pins = PinnedCertificates::new().pin("10.0.0.2", b"cert-a".to_vec());

        assert!(pins.evaluate("10.0.0.2", b"cert-a"));
        assert!(!pins.evaluate("10.0.0.2", b"cert-b"));
        assert!(!pins.evaluate("10.0.0.3", b"cert-a"));
        assert_eq!(pins.len(), 1);
    }

    #[test]
    fn test_empty_pins_reject() {
        let pins = PinnedCertificates::new();
        assert!(pins.is_empty());
        assert!(!pins.evaluate("10.0.0.2", b"cert-a"));
    }

    #[test]
    fn test_client_config_builds() {
        let config = client_config(Arc::new(TrustAll)).expect("config");
        assert!(config.alpn_protocols.is_empty());
    }

    #[test]
    fn test_verifier_rejects_unpinned_host() {
        let verifier = EvaluatorVerifier {
            evaluator: Arc::new(PinnedCertificates::new()),
            provider: Arc::new(rustls::crypto::ring::default_provider()),
        };
        let cert = CertificateDer::from(b"cert".to_vec());
        let name = ServerName::try_from("tv.local").expect("name");

        let result = verifier.verify_server_cert(&cert, &[], &name, &[], UnixTime::now());
        assert!(result.is_err());
    }
}
