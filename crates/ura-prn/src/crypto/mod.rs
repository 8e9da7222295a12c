pub mod cert;
pub mod pkcs12;
pub mod signer;

pub use signer::KeySelector;
