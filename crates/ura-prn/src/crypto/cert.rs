//! Certificate loading and RSA payload encryption.
//!
//! The payment-registration API expects the payload encrypted directly under
//! the authority's certificate key with RSA PKCS#1 v1.5 padding, so the
//! plaintext must fit in a single RSA block: at most
//! `modulus_bytes - 11` bytes (245 bytes for a 2048-bit key).
//!
//! # Examples
//!
//! ```no_run
//! use ura_prn::crypto::cert;
//!
//! let ciphertext = cert::encrypt("TIN1000000000|25000", "ura_public.pem")?;
//! assert!(!ciphertext.is_empty());
//! # Ok::<(), ura_prn::Error>(())
//! ```

use crate::{Error, ErrorKind, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use rand::rngs::OsRng;
use rsa::pkcs1::DecodeRsaPublicKey;
use rsa::traits::PublicKeyParts;
use rsa::{Pkcs1v15Encrypt, RsaPublicKey};
use std::fs;
use std::path::Path;
use tracing::{debug, warn};
use x509_certificate::{KeyAlgorithm, X509Certificate};

/// Bytes of PKCS#1 v1.5 encryption padding overhead.
pub const PKCS1_V15_OVERHEAD: usize = 11;

/// Encrypt `plaintext` under the public key of the PEM certificate at
/// `certificate_path` and return the base64 ciphertext.
///
/// # Errors
///
/// - [`Error::CertificateLoad`] if the file is missing, unreadable, or not a
///   PEM X.509 certificate
/// - [`Error::EncryptionFailed`] if the key is not RSA, is malformed, or the
///   payload is too long for it
pub fn encrypt(plaintext: &str, certificate_path: impl AsRef<Path>) -> Result<String> {
    let pem = read_certificate_file(certificate_path.as_ref())?;
    encrypt_with_certificate(plaintext, &pem)
}

/// Same as [`encrypt`], for a certificate already in memory.
pub fn encrypt_with_certificate(plaintext: &str, certificate_pem: &[u8]) -> Result<String> {
    let certificate = parse_certificate(certificate_pem)?;
    let public_key =
        rsa_public_key(&certificate).map_err(|e| Error::new(ErrorKind::EncryptionFailed, e))?;

    let payload = plaintext.as_bytes();
    let limit = max_payload_for(&public_key);
    if payload.len() > limit {
        return Err(Error::new(
            ErrorKind::EncryptionFailed,
            format!(
                "payload is {} bytes but a {}-bit key accepts at most {} bytes",
                payload.len(),
                public_key.size() * 8,
                limit
            ),
        ));
    }

    let ciphertext = public_key
        .encrypt(&mut OsRng, Pkcs1v15Encrypt, payload)
        .map_err(|e| Error::new(ErrorKind::EncryptionFailed, e.to_string()))?;

    debug!(ciphertext_len = ciphertext.len(), "encrypted payload");
    Ok(STANDARD.encode(ciphertext))
}

/// Largest plaintext, in bytes, the certificate's key can encrypt.
pub fn max_payload_len(certificate_pem: &[u8]) -> Result<usize> {
    let certificate = parse_certificate(certificate_pem)?;
    let public_key =
        rsa_public_key(&certificate).map_err(|e| Error::new(ErrorKind::EncryptionFailed, e))?;
    Ok(max_payload_for(&public_key))
}

fn max_payload_for(key: &RsaPublicKey) -> usize {
    key.size().saturating_sub(PKCS1_V15_OVERHEAD)
}

pub(crate) fn read_certificate_file(path: &Path) -> Result<Vec<u8>> {
    debug!(path = %path.display(), "reading certificate");
    fs::read(path).map_err(|e| {
        Error::new(
            ErrorKind::CertificateLoad,
            format!("{}: {}", path.display(), e),
        )
    })
}

/// Parse a PEM X.509 certificate.
///
/// A certificate outside its validity window is still accepted; only its
/// public key is used. A warning is logged instead.
pub(crate) fn parse_certificate(pem: &[u8]) -> Result<X509Certificate> {
    let certificate = X509Certificate::from_pem(pem).map_err(|e| {
        Error::new(
            ErrorKind::CertificateLoad,
            format!("Failed to parse certificate PEM: {}", e),
        )
    })?;

    if !certificate.time_constraints_valid(None) {
        let subject = certificate.subject_common_name().unwrap_or_default();
        warn!(
            subject = %subject,
            not_after = %certificate.validity_not_after(),
            "certificate is outside its validity period"
        );
    }
    Ok(certificate)
}

/// Decode the certificate's subject public key as PKCS#1 `RSAPublicKey`.
///
/// The error string is left for the caller to classify.
pub(crate) fn rsa_public_key(
    certificate: &X509Certificate,
) -> std::result::Result<RsaPublicKey, String> {
    match certificate.key_algorithm() {
        Some(KeyAlgorithm::Rsa) => {}
        Some(other) => return Err(format!("certificate key is {}, not RSA", other)),
        None => {
            return Err(format!(
                "unrecognized certificate key algorithm {}",
                certificate.key_algorithm_oid()
            ))
        }
    }

    RsaPublicKey::from_pkcs1_der(&certificate.public_key_data())
        .map_err(|e| format!("malformed RSA public key: {}", e))
}
