//! End-to-end sealing through `UraPrn` and file-based configuration.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use rsa::pkcs8::DecodePrivateKey;
use rsa::{Pkcs1v15Encrypt, RsaPrivateKey};
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;
use ura_prn::crypto::signer;
use ura_prn::{ErrorKind, PrnConfig, SealedPayload, UraPrn};

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name)
}

fn client_config() -> PrnConfig {
    PrnConfig::new(fixture("ura_cert.pem"), fixture("client.pfx"), "changeit")
}

#[test]
fn test_encrypt_and_sign_signs_the_ciphertext() {
    let prn = UraPrn::new(client_config());
    let sealed = prn.encrypt_and_sign("hello").unwrap();
    let client_cert = fs::read(fixture("client_cert.pem")).unwrap();

    signer::verify(&sealed.encryption, &sealed.signature, &client_cert).unwrap();
    let err = signer::verify("hello", &sealed.signature, &client_cert).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::SignatureFailed);

    let key_pem = fs::read_to_string(fixture("ura_key.pem")).unwrap();
    let key = RsaPrivateKey::from_pkcs8_pem(&key_pem).unwrap();
    let raw = STANDARD.decode(&sealed.encryption).unwrap();
    assert_eq!(key.decrypt(Pkcs1v15Encrypt, &raw).unwrap(), b"hello");
}

#[test]
fn test_encrypt_and_sign_twice_differs_in_ciphertext() {
    let prn = UraPrn::new(client_config());
    let first = prn.encrypt_and_sign("hello").unwrap();
    let second = prn.encrypt_and_sign("hello").unwrap();

    assert_ne!(first.encryption, second.encryption);
    assert_ne!(first.signature, second.signature);
}

#[test]
fn test_steps_match_facade() {
    let prn = UraPrn::new(client_config());
    let encryption = prn.encrypt("hello").unwrap();
    let signature = prn.sign(&encryption).unwrap();

    assert_eq!(
        signature,
        signer::sign(&encryption, fixture("client.pfx"), "changeit", None).unwrap()
    );
}

#[test]
fn test_facade_propagates_keystore_errors() {
    let prn = UraPrn::new(PrnConfig::new(
        fixture("ura_cert.pem"),
        fixture("client.pfx"),
        "wrong",
    ));
    assert_eq!(
        prn.encrypt_and_sign("hello").unwrap_err().kind(),
        ErrorKind::KeystoreLoad
    );

    let prn = UraPrn::new(client_config().with_alias("nobody"));
    assert_eq!(
        prn.encrypt_and_sign("hello").unwrap_err().kind(),
        ErrorKind::PrivateKeyNotFound
    );
}

#[test]
fn test_facade_uses_configured_alias() {
    let config = PrnConfig::new(fixture("ura_cert.pem"), fixture("multi.pfx"), "changeit")
        .with_alias("beta");
    let sealed = UraPrn::new(config).encrypt_and_sign("hello").unwrap();

    let beta_cert = fs::read(fixture("beta_cert.pem")).unwrap();
    signer::verify(&sealed.encryption, &sealed.signature, &beta_cert).unwrap();
}

#[test]
fn test_sealed_payload_serializes_as_pair() {
    let sealed = UraPrn::new(client_config()).encrypt_and_sign("hello").unwrap();
    let json = serde_json::to_string(&sealed).unwrap();
    let back: SealedPayload = serde_json::from_str(&json).unwrap();
    assert_eq!(back, sealed);
}

#[test]
fn test_config_file_with_relative_paths() {
    let dir = TempDir::new().unwrap();
    fs::copy(fixture("ura_cert.pem"), dir.path().join("ura.pem")).unwrap();
    fs::copy(fixture("multi.pfx"), dir.path().join("client.pfx")).unwrap();

    let config_path = dir.path().join("ura-prn.toml");
    fs::write(
        &config_path,
        r#"
certificate_path = "ura.pem"
pfx_path = "client.pfx"
keystore_password = "changeit"
alias = "beta"
"#,
    )
    .unwrap();

    let content = fs::read_to_string(&config_path).unwrap();
    let config = PrnConfig::from_toml_str(&content, dir.path()).unwrap();
    assert_eq!(config.certificate_path(), dir.path().join("ura.pem"));
    assert_eq!(config.alias(), Some("beta"));

    let sealed = UraPrn::new(config).encrypt_and_sign("hello").unwrap();
    let beta_cert = fs::read(fixture("beta_cert.pem")).unwrap();
    signer::verify(&sealed.encryption, &sealed.signature, &beta_cert).unwrap();
}

#[test]
fn test_config_file_missing_required_key() {
    let dir = TempDir::new().unwrap();
    let config_path = dir.path().join("ura-prn.toml");
    fs::write(&config_path, "certificate_path = \"ura.pem\"\n").unwrap();

    let err = PrnConfig::from_file(&config_path).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Config);
}
