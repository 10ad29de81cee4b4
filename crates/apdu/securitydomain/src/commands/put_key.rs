//! PUT KEY command
//!
//! The data field starts with the new key version number followed by one key
//! block per component. Secret components are encrypted under the session DEK
//! before they are framed, so builders take an encryption callback.

use bytes::{BufMut, Bytes, BytesMut};

use crate::constants::{ins, key_type, put_key_p2};
use crate::crypto::{self, KCV_LEN};
use crate::keys::{EcPrivateKey, EcPublicKey, KeyRef, StaticKeys};
use crate::tlv::key_component;
use crate::{Error, Result};

gp_command! {
    /// PUT KEY command
    PutKeyCommand, ins::PUT_KEY
}

impl PutKeyCommand {
    /// Import an SCP03 static key set
    ///
    /// `encrypt` wraps each plaintext component under the session DEK.
    pub fn static_keys(
        key_ref: KeyRef,
        replace_kvn: u8,
        keys: &StaticKeys,
        mut encrypt: impl FnMut(&[u8]) -> Result<Bytes>,
    ) -> Result<Self> {
        let mut data = BytesMut::new();
        data.put_u8(key_ref.kvn());
        for key in keys.components() {
            let wrapped = encrypt(key)?;
            if wrapped.len() != key.len() {
                return Err(Error::Crypto("wrapped key has unexpected length"));
            }
            data.put_slice(&key_component(key_type::AES, &wrapped)?);
            data.put_u8(KCV_LEN as u8);
            data.put_slice(&crypto::kcv(key));
        }

        Ok(Self {
            p1: replace_kvn,
            p2: put_key_p2::MULTIPLE_KEYS | key_ref.kid(),
            data: data.freeze(),
        })
    }

    /// Import an EC public key, typically a CA key used to verify OCE certificates
    pub fn ec_public_key(key_ref: KeyRef, replace_kvn: u8, key: &EcPublicKey) -> Result<Self> {
        let params = key.curve().require_supported()?;
        let component = key_component(key_type::ECC_PUBLIC_KEY, key.as_bytes())?;
        Self::ec_key(key_ref, replace_kvn, &component, params)
    }

    /// Import an EC private key
    ///
    /// `encrypt` wraps the scalar under the session DEK.
    pub fn ec_private_key(
        key_ref: KeyRef,
        replace_kvn: u8,
        key: &EcPrivateKey,
        mut encrypt: impl FnMut(&[u8]) -> Result<Bytes>,
    ) -> Result<Self> {
        let params = key.curve().require_supported()?;
        let wrapped = encrypt(key.scalar())?;
        let component = key_component(key_type::ECC_PRIVATE_KEY, &wrapped)?;
        Self::ec_key(key_ref, replace_kvn, &component, params)
    }

    fn ec_key(key_ref: KeyRef, replace_kvn: u8, component: &[u8], params: u8) -> Result<Self> {
        let mut data = BytesMut::new();
        data.put_u8(key_ref.kvn());
        data.put_slice(component);
        data.put_slice(&key_component(key_type::ECC_KEY_PARAMS, &[params])?);
        data.put_u8(0x00);

        Ok(Self {
            p1: replace_kvn,
            p2: key_ref.kid(),
            data: data.freeze(),
        })
    }
}

/// Check the response to a static key import
///
/// The card echoes the key version number followed by one KCV per component.
pub fn verify_static_keys_response(response: &[u8], kvn: u8, keys: &StaticKeys) -> Result<()> {
    let components = keys.components();
    if response.len() < 1 + components.len() * KCV_LEN {
        return Err(Error::BadResponse("PUT KEY response too short"));
    }
    verify_version_echo(response, kvn)?;

    for (key, actual) in components.iter().zip(response[1..].chunks_exact(KCV_LEN)) {
        crypto::validate_kcv(key, actual)?;
    }
    Ok(())
}

/// Check that the response starts with the expected key version number
pub fn verify_version_echo(response: &[u8], kvn: u8) -> Result<()> {
    match response.first() {
        Some(echo) if crypto::ct_equal(&[kvn], &[*echo]) => Ok(()),
        Some(_) => Err(Error::ChecksumMismatch("key version echo does not match")),
        None => Err(Error::BadResponse("PUT KEY response is empty")),
    }
}
