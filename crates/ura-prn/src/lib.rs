pub mod config;
pub mod crypto;
pub mod error;
pub mod prn;
pub mod schedule;

pub use config::PrnConfig;
pub use crypto::KeySelector;
pub use error::{Error, ErrorKind};
pub use prn::{SealedPayload, UraPrn};

pub type Result<T> = std::result::Result<T, Error>;
