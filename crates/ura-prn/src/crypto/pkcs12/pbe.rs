//! Password-based decryption and MAC verification.

use super::Pkcs12Error;
use cbc::cipher::{
    block_padding::Pkcs7, BlockCipher, BlockDecrypt, BlockDecryptMut, KeyInit, KeyIvInit,
};
use cms::cert::x509::spki::AlgorithmIdentifierOwned;
use der::asn1::ObjectIdentifier;
use der::{Decode, Encode};
use des::TdesEde3;
use hmac::digest::core_api::BlockSizeUser;
use hmac::digest::{Digest, FixedOutputReset};
use hmac::{Hmac, Mac};
use pkcs12::kdf::{self, Pkcs12KeyType};
use pkcs12::mac_data::MacData;
use pkcs12::pbe_params::Pkcs12PbeParams;
use pkcs5::pbes2;
use rc2::Rc2;
use sha1::Sha1;
use sha2::Sha256;
use zeroize::Zeroizing;

const SHA1_OID: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.3.14.3.2.26");
const SHA256_OID: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.16.840.1.101.3.4.2.1");

/// Legacy PBE cipher block size (3DES and RC2 both use 64-bit blocks).
const LEGACY_IV_LEN: usize = 8;

/// Verify the PFX integrity MAC over the authenticated-safe bytes.
pub(super) fn verify_mac(
    mac_data: &MacData,
    password: &str,
    auth_safe: &[u8],
) -> Result<(), Pkcs12Error> {
    let expected = mac_data.mac.digest.as_bytes();
    match mac_data.mac.algorithm.oid {
        SHA1_OID => {
            let key = mac_key::<Sha1>(mac_data, password)?;
            let mut mac = <Hmac<Sha1> as Mac>::new_from_slice(&key)
                .map_err(|_| Pkcs12Error::MacMismatch)?;
            mac.update(auth_safe);
            mac.verify_slice(expected).map_err(|_| Pkcs12Error::MacMismatch)
        }
        SHA256_OID => {
            let key = mac_key::<Sha256>(mac_data, password)?;
            let mut mac = <Hmac<Sha256> as Mac>::new_from_slice(&key)
                .map_err(|_| Pkcs12Error::MacMismatch)?;
            mac.update(auth_safe);
            mac.verify_slice(expected).map_err(|_| Pkcs12Error::MacMismatch)
        }
        other => Err(Pkcs12Error::UnsupportedMac(other)),
    }
}

fn mac_key<D>(mac_data: &MacData, password: &str) -> Result<Zeroizing<Vec<u8>>, Pkcs12Error>
where
    D: Digest + FixedOutputReset + BlockSizeUser,
{
    let key = kdf::derive_key_utf8::<D>(
        password,
        mac_data.mac_salt.as_bytes(),
        Pkcs12KeyType::Mac,
        mac_data.iterations,
        <D as Digest>::output_size(),
    )?;
    Ok(Zeroizing::new(key))
}

/// Decrypt `data` protected under `alg` with the keystore password.
pub(super) fn decrypt(
    alg: &AlgorithmIdentifierOwned,
    data: &[u8],
    password: &str,
) -> Result<Zeroizing<Vec<u8>>, Pkcs12Error> {
    let params = alg
        .parameters
        .as_ref()
        .ok_or(Pkcs12Error::MissingParameters)?
        .to_der()?;

    match alg.oid {
        pbes2::PBES2_OID => {
            let params = pbes2::Parameters::from_der(&params)?;
            params
                .decrypt(password.as_bytes(), data)
                .map(Zeroizing::new)
                .map_err(|e| Pkcs12Error::Decrypt(e.to_string()))
        }
        pkcs12::PKCS_12_PBE_WITH_SHAAND3_KEY_TRIPLE_DES_CBC => {
            legacy_cbc::<TdesEde3>(&Pkcs12PbeParams::from_der(&params)?, data, password, 24)
        }
        pkcs12::PKCS_12_PBEWITH_SHAAND40_BIT_RC2_CBC => {
            legacy_cbc::<Rc2>(&Pkcs12PbeParams::from_der(&params)?, data, password, 5)
        }
        other => Err(Pkcs12Error::UnsupportedEncryption(other)),
    }
}

/// PKCS#12 appendix B PBE: key and IV both come from the SHA-1 PKCS#12 KDF.
fn legacy_cbc<C>(
    params: &Pkcs12PbeParams,
    data: &[u8],
    password: &str,
    key_len: usize,
) -> Result<Zeroizing<Vec<u8>>, Pkcs12Error>
where
    C: KeyInit + BlockCipher + BlockDecrypt,
{
    let salt = params.salt.as_bytes();
    let key = Zeroizing::new(kdf::derive_key_utf8::<Sha1>(
        password,
        salt,
        Pkcs12KeyType::EncryptionKey,
        params.iterations,
        key_len,
    )?);
    let iv = kdf::derive_key_utf8::<Sha1>(
        password,
        salt,
        Pkcs12KeyType::Iv,
        params.iterations,
        LEGACY_IV_LEN,
    )?;

    let cipher = cbc::Decryptor::<C>::new_from_slices(&key, &iv)
        .map_err(|e| Pkcs12Error::Decrypt(e.to_string()))?;
    cipher
        .decrypt_padded_vec_mut::<Pkcs7>(data)
        .map(Zeroizing::new)
        .map_err(|_| Pkcs12Error::Decrypt("bad padding".into()))
}
