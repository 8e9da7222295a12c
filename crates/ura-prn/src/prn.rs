//! Encrypt-then-sign facade.
//!
//! [`UraPrn`] ties the certificate encryptor and the keystore signer together
//! under one immutable [`PrnConfig`]. The payment-registration API wants the
//! payload encrypted for the authority and the resulting ciphertext signed
//! by the client, so the signature always covers the base64 `encryption`
//! string and never the plaintext.

use crate::config::PrnConfig;
use crate::crypto::{cert, signer};
use crate::Result;
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Ciphertext and the signature over it, both base64.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SealedPayload {
    pub encryption: String,
    pub signature: String,
}

/// Payment-registration sealer.
///
/// # Example
///
/// ```no_run
/// use ura_prn::{PrnConfig, UraPrn};
///
/// let prn = UraPrn::new(
///     PrnConfig::new("ura_public.pem", "client.pfx", "changeit").with_alias("client-signing"),
/// );
/// let sealed = prn.encrypt_and_sign("TIN1000000000|25000")?;
/// println!("{}", serde_json::to_string(&sealed).unwrap());
/// # Ok::<(), ura_prn::Error>(())
/// ```
#[derive(Debug, Clone)]
pub struct UraPrn {
    config: PrnConfig,
}

impl UraPrn {
    /// Create a sealer around `config`.
    ///
    /// Nothing is read until the first call; certificate and keystore are
    /// loaded fresh on every operation.
    pub fn new(config: PrnConfig) -> Self {
        Self { config }
    }

    /// The configuration this sealer was built with.
    pub fn config(&self) -> &PrnConfig {
        &self.config
    }

    /// Encrypt `plaintext` under the configured certificate.
    pub fn encrypt(&self, plaintext: &str) -> Result<String> {
        cert::encrypt(plaintext, self.config.certificate_path())
    }

    /// Sign `message` with the configured keystore, password and alias.
    pub fn sign(&self, message: &str) -> Result<String> {
        signer::sign(
            message,
            self.config.pfx_path(),
            self.config.keystore_password().expose_secret(),
            self.config.alias(),
        )
    }

    /// Encrypt `plaintext`, then sign the resulting ciphertext.
    ///
    /// The first failure is returned as is. If encryption fails the keystore
    /// is never opened.
    pub fn encrypt_and_sign(&self, plaintext: &str) -> Result<SealedPayload> {
        let encryption = self.encrypt(plaintext)?;
        let signature = self.sign(&encryption)?;
        debug!("sealed payload");
        Ok(SealedPayload {
            encryption,
            signature,
        })
    }
}
