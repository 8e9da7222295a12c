//! Sealing configuration.
//!
//! [`PrnConfig`] is an immutable value naming the encryption certificate, the
//! signing keystore, its password and an optional key alias. It is built once
//! (in code, or from a TOML file plus environment overrides) and shared by
//! every sealing call.
//!
//! ```toml
//! certificate_path = "certs/ura_public.pem"
//! pfx_path = "certs/taxpayer.pfx"
//! keystore_password = "changeit"
//! alias = "taxpayer-signing"   # optional
//! ```

use crate::{Error, ErrorKind, Result};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

/// Environment variable overriding `keystore_password`.
pub const PASSWORD_ENV: &str = "URA_PRN_KEYSTORE_PASSWORD";

/// Environment variable overriding `alias`.
pub const ALIAS_ENV: &str = "URA_PRN_ALIAS";

/// Paths and secrets used to seal payloads.
///
/// Fields are private and there are no setters after construction, so a
/// config can be shared freely between threads.
#[derive(Clone)]
pub struct PrnConfig {
    certificate_path: PathBuf,
    pfx_path: PathBuf,
    keystore_password: SecretString,
    alias: Option<String>,
}

impl PrnConfig {
    /// Create a configuration without an alias (first private key wins).
    pub fn new(
        certificate_path: impl AsRef<Path>,
        pfx_path: impl AsRef<Path>,
        keystore_password: impl Into<String>,
    ) -> Self {
        Self {
            certificate_path: certificate_path.as_ref().to_path_buf(),
            pfx_path: pfx_path.as_ref().to_path_buf(),
            keystore_password: SecretString::new(keystore_password.into()),
            alias: None,
        }
    }

    /// Select the key entry whose friendly name equals `alias`.
    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    /// Load a configuration from a TOML file, then apply environment overrides.
    ///
    /// Relative paths in the file are resolved against the file's directory.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the file cannot be read, is not valid TOML,
    /// or lacks a required key.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            Error::new(
                ErrorKind::Config,
                format!("Failed to read {}: {}", path.display(), e),
            )
        })?;

        let base = path.parent().unwrap_or_else(|| Path::new(""));
        let config = Self::from_toml_str(&content, base)?;
        Ok(config.apply_env(|key| std::env::var(key).ok()))
    }

    /// Parse TOML configuration text, resolving relative paths against `base`.
    ///
    /// Environment overrides are not applied.
    pub fn from_toml_str(content: &str, base: impl AsRef<Path>) -> Result<Self> {
        let raw: RawConfig = toml::from_str(content)
            .map_err(|e| Error::new(ErrorKind::Config, e.message().to_string()))?;

        let base = base.as_ref();
        let resolve = |p: PathBuf| if p.is_relative() { base.join(p) } else { p };

        Ok(Self {
            certificate_path: resolve(raw.certificate_path),
            pfx_path: resolve(raw.pfx_path),
            keystore_password: SecretString::new(raw.keystore_password),
            alias: raw.alias.filter(|a| !a.is_empty()),
        })
    }

    /// Apply [`PASSWORD_ENV`] and [`ALIAS_ENV`] from `lookup`.
    ///
    /// An empty alias variable clears the alias.
    pub fn apply_env<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(password) = lookup(PASSWORD_ENV) {
            self.keystore_password = SecretString::new(password);
        }
        if let Some(alias) = lookup(ALIAS_ENV) {
            self.alias = if alias.is_empty() { None } else { Some(alias) };
        }
        self
    }

    /// PEM certificate whose public key encrypts payloads.
    pub fn certificate_path(&self) -> &Path {
        &self.certificate_path
    }

    /// PKCS#12 keystore holding the signing key.
    pub fn pfx_path(&self) -> &Path {
        &self.pfx_path
    }

    /// Keystore password; call `expose_secret()` only where it is consumed.
    pub fn keystore_password(&self) -> &SecretString {
        &self.keystore_password
    }

    /// Friendly name of the key entry to sign with; `None` takes the first.
    pub fn alias(&self) -> Option<&str> {
        self.alias.as_deref()
    }
}

impl fmt::Debug for PrnConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrnConfig")
            .field("certificate_path", &self.certificate_path)
            .field("pfx_path", &self.pfx_path)
            .field("keystore_password", &"[REDACTED]")
            .field("alias", &self.alias)
            .finish()
    }
}

impl PartialEq for PrnConfig {
    fn eq(&self, other: &Self) -> bool {
        self.certificate_path == other.certificate_path
            && self.pfx_path == other.pfx_path
            && self.keystore_password.expose_secret() == other.keystore_password.expose_secret()
            && self.alias == other.alias
    }
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    certificate_path: PathBuf,
    pfx_path: PathBuf,
    keystore_password: String,
    #[serde(default)]
    alias: Option<String>,
}
