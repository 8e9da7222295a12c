//! PKCS#12 (.p12/.pfx) reader.
//!
//! Verifies the container MAC, opens every safe contents (plain or
//! password-encrypted) and collects the private-key bags in container order.
//! Key material stays encrypted until [`KeyBag::decrypt`] is called for the
//! one entry the signer selects.
//!
//! Supports PBES2 (PBKDF2 + AES-CBC, the OpenSSL 3.x default) and the legacy
//! PKCS#12 PBE schemes (SHA-1 + 3DES-CBC, SHA-1 + RC2-40-CBC).

mod parse;
mod pbe;

use der::asn1::ObjectIdentifier;
use pkcs12::pbe_params::EncryptedPrivateKeyInfo;
use std::fmt;
use thiserror::Error;
use zeroize::Zeroizing;

pub use parse::read_key_bags;

/// Errors raised while reading a PKCS#12 container.
#[derive(Debug, Error)]
pub enum Pkcs12Error {
    #[error("malformed DER: {0}")]
    Der(#[from] der::Error),

    #[error("MAC verification failed (wrong password or corrupt container)")]
    MacMismatch,

    #[error("unsupported MAC digest algorithm {0}")]
    UnsupportedMac(ObjectIdentifier),

    #[error("unsupported content type {0}")]
    UnsupportedContentType(ObjectIdentifier),

    #[error("unsupported encryption scheme {0}")]
    UnsupportedEncryption(ObjectIdentifier),

    #[error("encryption scheme parameters missing")]
    MissingParameters,

    #[error("decryption failed (wrong password or corrupt container): {0}")]
    Decrypt(String),
}

/// A private key found in a safe bag, still protected as stored.
#[derive(Clone)]
pub struct KeyBag {
    /// Zero-based position among the key bags of the container.
    pub index: usize,
    /// First value of the bag's `friendlyName` attribute.
    pub friendly_name: Option<String>,
    material: KeyMaterial,
}

#[derive(Clone)]
enum KeyMaterial {
    /// `pkcs8ShroudedKeyBag`: PKCS#8 encrypted under the keystore password.
    Shrouded(EncryptedPrivateKeyInfo),
    /// `keyBag`: plain PKCS#8 `PrivateKeyInfo` DER.
    Plain(Vec<u8>),
}

impl KeyBag {
    /// Decrypt the key to PKCS#8 `PrivateKeyInfo` DER.
    pub fn decrypt(&self, password: &str) -> Result<Zeroizing<Vec<u8>>, Pkcs12Error> {
        match &self.material {
            KeyMaterial::Shrouded(info) => pbe::decrypt(
                &info.encryption_algorithm,
                info.encrypted_data.as_bytes(),
                password,
            ),
            KeyMaterial::Plain(der) => Ok(Zeroizing::new(der.clone())),
        }
    }

    #[cfg(test)]
    pub(crate) fn plain(index: usize, friendly_name: Option<String>, pkcs8_der: Vec<u8>) -> Self {
        Self {
            index,
            friendly_name,
            material: KeyMaterial::Plain(pkcs8_der),
        }
    }

    /// Whether the key is stored password-encrypted.
    pub fn is_shrouded(&self) -> bool {
        matches!(self.material, KeyMaterial::Shrouded(_))
    }
}

impl fmt::Debug for KeyBag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyBag")
            .field("index", &self.index)
            .field("friendly_name", &self.friendly_name)
            .field("shrouded", &self.is_shrouded())
            .finish_non_exhaustive()
    }
}
