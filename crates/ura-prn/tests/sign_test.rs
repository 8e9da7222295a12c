//! Keystore loading, key selection and signing against fixture keystores.
//!
//! `multi.pfx` holds three keys named `alpha`, `beta`, `alpha` (the second
//! `alpha` is the gamma key); each has a matching `<name>_cert.pem`.
//!
//! The `client*.pfx` keystores all hold the `client-signing` key under
//! different protection: PBES2/AES (`client`), SHA-1 + 3DES (`client_legacy`),
//! SHA-1 + RC2-40 (`client_rc2`), no MAC (`client_nomac`) and an unencrypted
//! key bag (`client_plain`). `nested.pfx` holds `beta` followed by a
//! safe-contents bag wrapping `alpha`.

use std::fs;
use std::path::PathBuf;
use ura_prn::crypto::signer;
use ura_prn::ErrorKind;

const PASSWORD: &str = "changeit";

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name)
}

fn cert(name: &str) -> Vec<u8> {
    fs::read(fixture(name)).unwrap()
}

#[test]
fn test_sign_pbes2_keystore_verifies() {
    let signature = signer::sign("hello", fixture("client.pfx"), PASSWORD, None).unwrap();
    signer::verify("hello", &signature, &cert("client_cert.pem")).unwrap();
}

#[test]
fn test_sign_legacy_3des_keystore_verifies() {
    let signature = signer::sign("hello", fixture("client_legacy.pfx"), PASSWORD, None).unwrap();
    signer::verify("hello", &signature, &cert("client_cert.pem")).unwrap();
}

#[test]
fn test_sign_legacy_rc2_keystore_verifies() {
    let signature = signer::sign("hello", fixture("client_rc2.pfx"), PASSWORD, None).unwrap();
    signer::verify("hello", &signature, &cert("client_cert.pem")).unwrap();
}

#[test]
fn test_sign_keystore_without_mac() {
    let signature = signer::sign(
        "hello",
        fixture("client_nomac.pfx"),
        PASSWORD,
        Some("client-signing"),
    )
    .unwrap();
    signer::verify("hello", &signature, &cert("client_cert.pem")).unwrap();
}

#[test]
fn test_wrong_password_without_mac_fails_on_decrypt() {
    let err = signer::sign("hello", fixture("client_nomac.pfx"), "wrong", None).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::KeystoreLoad);
    assert!(err.cause().unwrap().contains("decryption failed"));
}

#[test]
fn test_sign_plain_key_bag() {
    let signature = signer::sign("hello", fixture("client_plain.pfx"), PASSWORD, None).unwrap();
    signer::verify("hello", &signature, &cert("client_cert.pem")).unwrap();

    let names = signer::list_key_entries(fixture("client_plain.pfx"), PASSWORD).unwrap();
    assert_eq!(names, vec![Some("client-signing".to_string())]);
}

#[test]
fn test_nested_safe_contents_expand_in_place() {
    let pfx = fixture("nested.pfx");

    let names = signer::list_key_entries(&pfx, PASSWORD).unwrap();
    assert_eq!(names, vec![Some("beta".to_string()), Some("alpha".to_string())]);

    let first = signer::sign("m", &pfx, PASSWORD, None).unwrap();
    signer::verify("m", &first, &cert("beta_cert.pem")).unwrap();

    let nested = signer::sign("m", &pfx, PASSWORD, Some("alpha")).unwrap();
    signer::verify("m", &nested, &cert("alpha_cert.pem")).unwrap();
}

#[test]
fn test_sign_is_deterministic() {
    let first = signer::sign("payload", fixture("client.pfx"), PASSWORD, None).unwrap();
    let second = signer::sign("payload", fixture("client.pfx"), PASSWORD, None).unwrap();
    assert_eq!(first, second);

    // Same key in a differently protected container.
    for pfx in ["client_legacy.pfx", "client_rc2.pfx", "client_plain.pfx"] {
        let other = signer::sign("payload", fixture(pfx), PASSWORD, None).unwrap();
        assert_eq!(first, other, "{}", pfx);
    }
}

#[test]
fn test_signature_does_not_verify_other_message() {
    let signature = signer::sign("hello", fixture("client.pfx"), PASSWORD, None).unwrap();
    let err = signer::verify("hello!", &signature, &cert("client_cert.pem")).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::SignatureFailed);
}

#[test]
fn test_sign_with_matching_alias() {
    let signature =
        signer::sign("hello", fixture("client.pfx"), PASSWORD, Some("client-signing")).unwrap();
    signer::verify("hello", &signature, &cert("client_cert.pem")).unwrap();
}

#[test]
fn test_wrong_password_is_keystore_error() {
    let keystores = [
        "client.pfx",
        "client_legacy.pfx",
        "client_rc2.pfx",
        "client_plain.pfx",
        "multi.pfx",
        "nested.pfx",
    ];
    for pfx in keystores {
        let err = signer::sign("hello", fixture(pfx), "wrong", None).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::KeystoreLoad, "{}", pfx);

        let err = signer::sign("hello", fixture(pfx), "wrong", Some("nobody")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::KeystoreLoad, "{}", pfx);
    }
}

#[test]
fn test_unknown_alias_is_not_found() {
    let err = signer::sign("hello", fixture("client.pfx"), PASSWORD, Some("nobody")).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::PrivateKeyNotFound);
    assert!(err.to_string().contains("nobody"));
}

#[test]
fn test_certificate_only_keystore_has_no_key() {
    let err = signer::sign("hello", fixture("certs_only.pfx"), PASSWORD, None).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::PrivateKeyNotFound);

    assert!(signer::list_key_entries(fixture("certs_only.pfx"), PASSWORD)
        .unwrap()
        .is_empty());
}

#[test]
fn test_non_pkcs12_file_is_keystore_error() {
    let err = signer::sign("hello", fixture("client_cert.pem"), PASSWORD, None).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::KeystoreLoad);
}

#[test]
fn test_multi_key_selection() {
    let pfx = fixture("multi.pfx");

    let first = signer::sign("m", &pfx, PASSWORD, None).unwrap();
    signer::verify("m", &first, &cert("alpha_cert.pem")).unwrap();

    let beta = signer::sign("m", &pfx, PASSWORD, Some("beta")).unwrap();
    signer::verify("m", &beta, &cert("beta_cert.pem")).unwrap();
    assert!(signer::verify("m", &beta, &cert("alpha_cert.pem")).is_err());
}

#[test]
fn test_duplicate_alias_uses_first_entry() {
    let signature = signer::sign("m", fixture("multi.pfx"), PASSWORD, Some("alpha")).unwrap();

    signer::verify("m", &signature, &cert("alpha_cert.pem")).unwrap();
    let err = signer::verify("m", &signature, &cert("gamma_cert.pem")).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::SignatureFailed);
}

#[test]
fn test_alias_is_case_sensitive() {
    let err = signer::sign("m", fixture("multi.pfx"), PASSWORD, Some("ALPHA")).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::PrivateKeyNotFound);
}

#[test]
fn test_list_key_entries_in_container_order() {
    let names = signer::list_key_entries(fixture("multi.pfx"), PASSWORD).unwrap();
    assert_eq!(
        names,
        vec![
            Some("alpha".to_string()),
            Some("beta".to_string()),
            Some("alpha".to_string())
        ]
    );

    let names = signer::list_key_entries(fixture("client_legacy.pfx"), PASSWORD).unwrap();
    assert_eq!(names, vec![Some("client-signing".to_string())]);
}
