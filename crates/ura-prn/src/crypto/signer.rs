//! PKCS#12 keystore signing.
//!
//! A signing call loads the keystore, selects one private key with a
//! [`KeySelector`], and produces an RSASSA-PKCS1-v1.5 signature over the SHA-1
//! digest of the message. PKCS#1 v1.5 signing is deterministic: the same key
//! and message always give the same signature.
//!
//! Per call the signer moves through `KeystoreLoaded -> KeyFound -> Signed`,
//! exiting early with [`Error::KeystoreLoad`], [`Error::PrivateKeyNotFound`]
//! or [`Error::SignatureFailed`].

use crate::crypto::cert;
use crate::crypto::pkcs12::{self, KeyBag};
use crate::{Error, ErrorKind, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use pkcs8::DecodePrivateKey;
use rsa::{Pkcs1v15Sign, RsaPrivateKey};
use sha1::{Digest, Sha1};
use std::fs;
use std::path::Path;
use tracing::debug;

/// Policy for choosing one private key among the keystore's key bags.
///
/// Bags are visited in container order and the first accepted bag wins. When
/// several bags share a friendly name, the first one is authoritative.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeySelector<'a> {
    /// Accept the first private-key bag, whatever its name.
    First,
    /// Accept only a bag whose friendly name equals this alias exactly
    /// (case-sensitive).
    Alias(&'a str),
}

impl<'a> KeySelector<'a> {
    /// [`KeySelector::Alias`] when `alias` is set, [`KeySelector::First`]
    /// otherwise.
    ///
    /// # Arguments
    ///
    /// * `alias` - Friendly name of the wanted key entry, if any
    pub fn from_alias(alias: Option<&'a str>) -> Self {
        match alias {
            Some(alias) => KeySelector::Alias(alias),
            None => KeySelector::First,
        }
    }

    /// Whether a bag carrying `friendly_name` satisfies this selector.
    ///
    /// An unnamed bag (`None`) never matches an alias.
    pub fn accepts(&self, friendly_name: Option<&str>) -> bool {
        match self {
            KeySelector::First => true,
            KeySelector::Alias(alias) => friendly_name == Some(*alias),
        }
    }

    /// First bag accepted by this selector.
    pub fn select<'b>(&self, bags: &'b [KeyBag]) -> Option<&'b KeyBag> {
        bags.iter().find(|bag| self.accepts(bag.friendly_name.as_deref()))
    }

    fn not_found(&self) -> Error {
        match self {
            KeySelector::First => Error::new(
                ErrorKind::PrivateKeyNotFound,
                "keystore contains no private key entries",
            ),
            KeySelector::Alias(alias) => Error::new(
                ErrorKind::PrivateKeyNotFound,
                format!("no private key entry with friendly name '{}'", alias),
            ),
        }
    }
}

/// Sign `message` with a key from the PKCS#12 keystore at `pfx_path` and
/// return the base64 signature.
///
/// With `alias` set, only the entry with that friendly name is used;
/// otherwise the first private key in the container is used.
///
/// # Errors
///
/// - [`Error::KeystoreLoad`] if the file is unreadable, the password is wrong,
///   or the container is malformed
/// - [`Error::PrivateKeyNotFound`] if no key entry matches
/// - [`Error::SignatureFailed`] if the key is not RSA or signing fails
pub fn sign(
    message: &str,
    pfx_path: impl AsRef<Path>,
    password: &str,
    alias: Option<&str>,
) -> Result<String> {
    let bags = load_key_bags(pfx_path.as_ref(), password)?;

    let selector = KeySelector::from_alias(alias);
    let bag = selector.select(&bags).ok_or_else(|| selector.not_found())?;
    debug!(
        index = bag.index,
        friendly_name = bag.friendly_name.as_deref().unwrap_or(""),
        "selected key entry"
    );

    let pkcs8 = bag
        .decrypt(password)
        .map_err(|e| Error::new(ErrorKind::KeystoreLoad, e.to_string()))?;
    let key = RsaPrivateKey::from_pkcs8_der(&pkcs8).map_err(|e| {
        Error::new(
            ErrorKind::SignatureFailed,
            format!("selected key is not an RSA PKCS#8 key: {}", e),
        )
    })?;

    sign_with_key(message, &key)
}

/// Sign the SHA-1 digest of `message` with `key` (RSASSA-PKCS1-v1.5).
pub fn sign_with_key(message: &str, key: &RsaPrivateKey) -> Result<String> {
    let digest = Sha1::digest(message.as_bytes());
    let signature = key
        .sign(Pkcs1v15Sign::new::<Sha1>(), &digest)
        .map_err(|e| Error::new(ErrorKind::SignatureFailed, e.to_string()))?;

    debug!(signature_len = signature.len(), "signed message");
    Ok(STANDARD.encode(signature))
}

/// Verify a base64 signature produced by [`sign`] against the public key of a
/// PEM certificate.
///
/// # Errors
///
/// [`Error::CertificateLoad`] for an unparseable certificate, otherwise
/// [`Error::SignatureFailed`] when the signature is malformed or does not
/// match.
pub fn verify(message: &str, signature: &str, certificate_pem: &[u8]) -> Result<()> {
    let certificate = cert::parse_certificate(certificate_pem)?;
    let public_key = cert::rsa_public_key(&certificate)
        .map_err(|e| Error::new(ErrorKind::SignatureFailed, e))?;

    let raw = STANDARD.decode(signature.trim()).map_err(|e| {
        Error::new(
            ErrorKind::SignatureFailed,
            format!("signature is not base64: {}", e),
        )
    })?;

    let digest = Sha1::digest(message.as_bytes());
    public_key
        .verify(Pkcs1v15Sign::new::<Sha1>(), &digest, &raw)
        .map_err(|_| {
            Error::new(
                ErrorKind::SignatureFailed,
                "signature does not match message",
            )
        })
}

/// Friendly names of the keystore's private-key entries, in container order.
pub fn list_key_entries(
    pfx_path: impl AsRef<Path>,
    password: &str,
) -> Result<Vec<Option<String>>> {
    let bags = load_key_bags(pfx_path.as_ref(), password)?;
    Ok(bags.into_iter().map(|bag| bag.friendly_name).collect())
}

fn load_key_bags(path: &Path, password: &str) -> Result<Vec<KeyBag>> {
    debug!(path = %path.display(), "reading keystore");
    let data = fs::read(path).map_err(|e| {
        Error::new(
            ErrorKind::KeystoreLoad,
            format!("{}: {}", path.display(), e),
        )
    })?;

    let bags = pkcs12::read_key_bags(&data, password)
        .map_err(|e| Error::new(ErrorKind::KeystoreLoad, e.to_string()))?;
    debug!(key_entries = bags.len(), "keystore loaded");
    Ok(bags)
}
