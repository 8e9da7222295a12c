//! PFX structure walking.

use super::{pbe, KeyBag, KeyMaterial, Pkcs12Error};
use cms::content_info::ContentInfo;
use cms::encrypted_data::EncryptedData;
use der::asn1::{BmpString, ContextSpecific, ObjectIdentifier, OctetString};
use der::{Decode, Encode};
use pkcs12::authenticated_safe::AuthenticatedSafe;
use pkcs12::pbe_params::EncryptedPrivateKeyInfo;
use pkcs12::pfx::Pfx;
use pkcs12::safe_bag::{SafeBag, SafeContents};

const CONTENT_TYPE_DATA: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.7.1");
const CONTENT_TYPE_ENCRYPTED_DATA: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.2.840.113549.1.7.6");
const FRIENDLY_NAME: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.9.20");

/// Nested `safeContentsBag` recursion limit.
const MAX_NESTING: usize = 8;

/// Parse a DER PFX, verify its MAC and return every private-key bag in
/// container order.
///
/// Order is authenticated-safe order, then bag order inside each safe
/// contents; nested safe-contents bags are expanded in place.
///
/// # Errors
///
/// Any structural problem, MAC mismatch, or failure to decrypt an encrypted
/// safe contents. A wrong password surfaces as [`Pkcs12Error::MacMismatch`]
/// when the container has a MAC and as [`Pkcs12Error::Decrypt`] otherwise.
pub fn read_key_bags(data: &[u8], password: &str) -> Result<Vec<KeyBag>, Pkcs12Error> {
    let pfx = Pfx::from_der(data)?;

    if pfx.auth_safe.content_type != CONTENT_TYPE_DATA {
        return Err(Pkcs12Error::UnsupportedContentType(pfx.auth_safe.content_type));
    }
    let auth_safe = OctetString::from_der(&pfx.auth_safe.content.to_der()?)?.into_bytes();

    if let Some(ref mac_data) = pfx.mac_data {
        pbe::verify_mac(mac_data, password, &auth_safe)?;
    }

    let safes = AuthenticatedSafe::from_der(&auth_safe)?;

    let mut keys = Vec::new();
    for safe in &safes {
        let contents = open_safe_contents(safe, password)?;
        collect_key_bags(contents, &mut keys, 0)?;
    }
    Ok(keys)
}

fn open_safe_contents(safe: &ContentInfo, password: &str) -> Result<SafeContents, Pkcs12Error> {
    match safe.content_type {
        CONTENT_TYPE_DATA => {
            let data = OctetString::from_der(&safe.content.to_der()?)?;
            Ok(SafeContents::from_der(data.as_bytes())?)
        }
        CONTENT_TYPE_ENCRYPTED_DATA => {
            let encrypted = EncryptedData::from_der(&safe.content.to_der()?)?;
            let info = &encrypted.enc_content_info;
            match info.encrypted_content {
                Some(ref ciphertext) => {
                    let plain =
                        pbe::decrypt(&info.content_enc_alg, ciphertext.as_bytes(), password)?;
                    Ok(SafeContents::from_der(&plain)?)
                }
                None => Ok(Vec::new()),
            }
        }
        other => Err(Pkcs12Error::UnsupportedContentType(other)),
    }
}

fn collect_key_bags(
    bags: SafeContents,
    keys: &mut Vec<KeyBag>,
    depth: usize,
) -> Result<(), Pkcs12Error> {
    for bag in bags {
        let material = match bag.bag_id {
            pkcs12::PKCS_12_PKCS8_KEY_BAG_OID => {
                let info: ContextSpecific<EncryptedPrivateKeyInfo> =
                    ContextSpecific::from_der(&bag.bag_value)?;
                KeyMaterial::Shrouded(info.value)
            }
            pkcs12::PKCS_12_KEY_BAG_OID => {
                let info: ContextSpecific<der::Any> = ContextSpecific::from_der(&bag.bag_value)?;
                KeyMaterial::Plain(info.value.to_der()?)
            }
            pkcs12::PKCS_12_SAFE_CONTENTS_BAG_OID if depth < MAX_NESTING => {
                let nested: ContextSpecific<SafeContents> =
                    ContextSpecific::from_der(&bag.bag_value)?;
                collect_key_bags(nested.value, keys, depth + 1)?;
                continue;
            }
            _ => continue,
        };

        keys.push(KeyBag {
            index: keys.len(),
            friendly_name: friendly_name(&bag),
            material,
        });
    }
    Ok(())
}

/// First value of the attribute `oid`, re-encoded as DER.
fn first_attribute_value(bag: &SafeBag, oid: ObjectIdentifier) -> Option<Vec<u8>> {
    bag.bag_attributes
        .as_ref()?
        .iter()
        .find(|attr| attr.oid == oid)
        .and_then(|attr| attr.values.iter().next())
        .and_then(|value| value.to_der().ok())
}

fn friendly_name(bag: &SafeBag) -> Option<String> {
    let der = first_attribute_value(bag, FRIENDLY_NAME)?;
    BmpString::from_der(&der).ok().map(|name| name.to_string())
}
