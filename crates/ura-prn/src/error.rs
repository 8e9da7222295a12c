//! Error types for ura-prn operations.
//!
//! This module defines the [`enum@Error`] enum covering every failure of the
//! sealing workflow (certificate loading, encryption, keystore loading, key
//! selection, signing) plus configuration and date/interest input errors.
//!
//! Each variant has a fixed machine-readable [`code`](Error::code) and a
//! default message, and carries an optional cause taken from the underlying
//! failure. Callers should branch on [`Error::kind`] rather than parse the
//! rendered message.
//!
//! # See Also
//!
//! - [`crate::Result`] - Convenience type alias using this error

use std::fmt;

use thiserror::Error;

/// Error type for ura-prn operations.
///
/// All public functions in this crate return [`crate::Result<T>`], which uses this error type.
///
/// # Examples
///
/// ```no_run
/// use ura_prn::{Error, PrnConfig, UraPrn};
///
/// let prn = UraPrn::new(PrnConfig::new("ura.pem", "client.pfx", "secret"));
/// match prn.encrypt_and_sign("TIN1000000000|25000") {
///     Ok(sealed) => println!("{}", sealed.signature),
///     Err(Error::KeystoreLoad(cause)) => eprintln!("bad keystore or password: {cause:?}"),
///     Err(Error::EncryptionFailed(_)) => eprintln!("payload too large for the certificate key"),
///     Err(e) => eprintln!("{} ({})", e, e.code()),
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// The certificate file is missing, unreadable, or not a PEM X.509 certificate.
    #[error("{}", Detail(ErrorKind::CertificateLoad, .0))]
    CertificateLoad(Option<String>),

    /// RSA encryption failed.
    ///
    /// Usually the payload is longer than the key modulus allows
    /// (`modulus_bytes - 11`), or the certificate key is not a usable RSA key.
    #[error("{}", Detail(ErrorKind::EncryptionFailed, .0))]
    EncryptionFailed(Option<String>),

    /// The keystore could not be read, decrypted, or parsed.
    ///
    /// A wrong password is always reported here, never as
    /// [`Error::PrivateKeyNotFound`].
    #[error("{}", Detail(ErrorKind::KeystoreLoad, .0))]
    KeystoreLoad(Option<String>),

    /// No private-key entry matched the selection policy.
    #[error("{}", Detail(ErrorKind::PrivateKeyNotFound, .0))]
    PrivateKeyNotFound(Option<String>),

    /// Signing (or signature verification) failed after a key was selected.
    #[error("{}", Detail(ErrorKind::SignatureFailed, .0))]
    SignatureFailed(Option<String>),

    /// Invalid configuration file or environment.
    #[error("{}", Detail(ErrorKind::Config, .0))]
    Config(Option<String>),

    /// Invalid input to a date or interest calculation.
    #[error("{}", Detail(ErrorKind::InvalidInput, .0))]
    InvalidInput(Option<String>),
}

/// Fieldless discriminant of [`enum@Error`], convenient for matching and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    CertificateLoad,
    EncryptionFailed,
    KeystoreLoad,
    PrivateKeyNotFound,
    SignatureFailed,
    Config,
    InvalidInput,
}

impl ErrorKind {
    /// Stable machine-readable code.
    pub const fn code(self) -> &'static str {
        match self {
            ErrorKind::CertificateLoad => "CERTIFICATE_LOAD_ERROR",
            ErrorKind::EncryptionFailed => "ENCRYPTION_FAILED",
            ErrorKind::KeystoreLoad => "KEYSTORE_LOAD_ERROR",
            ErrorKind::PrivateKeyNotFound => "PRIVATE_KEY_NOT_FOUND",
            ErrorKind::SignatureFailed => "SIGNATURE_FAILED",
            ErrorKind::Config => "CONFIG_ERROR",
            ErrorKind::InvalidInput => "INVALID_INPUT",
        }
    }

    /// Message used when no cause is attached.
    pub const fn default_message(self) -> &'static str {
        match self {
            ErrorKind::CertificateLoad => "Failed to load certificate",
            ErrorKind::EncryptionFailed => "Encryption failed",
            ErrorKind::KeystoreLoad => "Failed to load PKCS#12 keystore",
            ErrorKind::PrivateKeyNotFound => "Private key not found in keystore",
            ErrorKind::SignatureFailed => "Signature operation failed",
            ErrorKind::Config => "Invalid configuration",
            ErrorKind::InvalidInput => "Invalid input",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl Error {
    /// Build an error of `kind` with a cause attached.
    pub fn new(kind: ErrorKind, cause: impl Into<String>) -> Self {
        Self::from_parts(kind, Some(cause.into()))
    }

    /// Build an error of `kind` without a cause.
    pub fn bare(kind: ErrorKind) -> Self {
        Self::from_parts(kind, None)
    }

    fn from_parts(kind: ErrorKind, cause: Option<String>) -> Self {
        match kind {
            ErrorKind::CertificateLoad => Error::CertificateLoad(cause),
            ErrorKind::EncryptionFailed => Error::EncryptionFailed(cause),
            ErrorKind::KeystoreLoad => Error::KeystoreLoad(cause),
            ErrorKind::PrivateKeyNotFound => Error::PrivateKeyNotFound(cause),
            ErrorKind::SignatureFailed => Error::SignatureFailed(cause),
            ErrorKind::Config => Error::Config(cause),
            ErrorKind::InvalidInput => Error::InvalidInput(cause),
        }
    }

    /// Fieldless kind of this error, for matching without the cause.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::CertificateLoad(_) => ErrorKind::CertificateLoad,
            Error::EncryptionFailed(_) => ErrorKind::EncryptionFailed,
            Error::KeystoreLoad(_) => ErrorKind::KeystoreLoad,
            Error::PrivateKeyNotFound(_) => ErrorKind::PrivateKeyNotFound,
            Error::SignatureFailed(_) => ErrorKind::SignatureFailed,
            Error::Config(_) => ErrorKind::Config,
            Error::InvalidInput(_) => ErrorKind::InvalidInput,
        }
    }

    /// Stable machine-readable code, e.g. `KEYSTORE_LOAD_ERROR`.
    ///
    /// Shorthand for `self.kind().code()`.
    pub fn code(&self) -> &'static str {
        self.kind().code()
    }

    /// The underlying cause, if one was recorded.
    pub fn cause(&self) -> Option<&str> {
        match self {
            Error::CertificateLoad(c)
            | Error::EncryptionFailed(c)
            | Error::KeystoreLoad(c)
            | Error::PrivateKeyNotFound(c)
            | Error::SignatureFailed(c)
            | Error::Config(c)
            | Error::InvalidInput(c) => c.as_deref(),
        }
    }
}

/// Renders `"<default message>: <cause>"`, or the bare default message.
struct Detail<'a>(ErrorKind, &'a Option<String>);

impl fmt::Display for Detail<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.1 {
            Some(cause) => write!(f, "{}: {}", self.0.default_message(), cause),
            None => f.write_str(self.0.default_message()),
        }
    }
}
