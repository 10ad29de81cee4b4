//! GENERATE KEY command

use bytes::{BufMut, BytesMut};

use crate::constants::{ins, key_type};
use crate::keys::{Curve, EcPublicKey, KeyRef};
use crate::tlv::{key_component, unpack_key_component};
use crate::Result;

gp_command! {
    /// GENERATE KEY command, the card keeps the private key
    GenerateKeyCommand, ins::GENERATE_KEY
}

impl GenerateKeyCommand {
    /// Generate an EC key pair on the card
    pub fn ec(key_ref: KeyRef, replace_kvn: u8, curve: Curve) -> Result<Self> {
        let params = curve.require_supported()?;

        let mut data = BytesMut::new();
        data.put_u8(key_ref.kvn());
        data.put_slice(&key_component(key_type::ECC_KEY_PARAMS, &[params])?);

        Ok(Self {
            p1: replace_kvn,
            p2: key_ref.kid(),
            data: data.freeze(),
        })
    }

    /// Extract the generated public key from the response
    pub fn parse_response(curve: Curve, response: &[u8]) -> Result<EcPublicKey> {
        let point = unpack_key_component(key_type::ECC_PUBLIC_KEY, response)?;
        EcPublicKey::from_sec1_bytes(curve, &point)
    }
}
