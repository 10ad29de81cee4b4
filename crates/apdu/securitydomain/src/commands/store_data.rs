//! STORE DATA command and the Security Domain data objects written with it

use bytes::Bytes;

use crate::Result;
use crate::constants::{ins, kid, store_data_p1, tags};
use crate::keys::KeyRef;
use crate::tlv::{encode_map, tlv};

gp_command! {
    /// STORE DATA command, sent as a single BER-TLV block
    StoreDataCommand, ins::STORE_DATA
}

impl StoreDataCommand {
    /// Store a pre-encoded BER-TLV payload
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self {
            p1: store_data_p1::LAST_BLOCK_BER_TLV,
            p2: 0x00,
            data: data.into(),
        }
    }

    /// Restrict the OCE certificates accepted for `key_ref` to the given serial numbers
    ///
    /// An empty list clears the allow list.
    pub fn allowlist<S: AsRef<[u8]>>(key_ref: KeyRef, serials: &[S]) -> Result<Self> {
        let entries = encode_map(
            serials
                .iter()
                .map(|serial| (tags::SERIAL, Some(serial.as_ref()))),
        )?;

        Ok(Self::new(
            [key_ref.control_reference()?, tlv(tags::ALLOWLIST, entries)?].concat(),
        ))
    }

    /// Record the subject key identifier of the CA that issued `key_ref`'s certificate
    ///
    /// Card key references (SCP11a/b/c) are flagged as KLCC, everything else as KLOC.
    pub fn ca_issuer(key_ref: KeyRef, ski: &[u8]) -> Result<Self> {
        let klcc = [u8::from(matches!(
            key_ref.kid(),
            kid::SCP11A | kid::SCP11B | kid::SCP11C
        ))];
        let key_id = key_ref.to_bytes();
        let content = encode_map([
            (tags::KLCC_FLAG, Some(&klcc[..])),
            (tags::SUBJECT_KEY_ID, Some(ski)),
            (tags::KEY_ID, Some(&key_id[..])),
        ])?;

        Ok(Self::new(tlv(tags::CONTROL_REFERENCE, content)?))
    }

    /// Store the certificate chain for `key_ref`, leaf certificate last
    ///
    /// Each certificate must be a complete DER encoding.
    pub fn certificate_bundle<C: AsRef<[u8]>>(key_ref: KeyRef, certificates: &[C]) -> Result<Self> {
        let chain: Vec<u8> = certificates
            .iter()
            .flat_map(|cert| cert.as_ref().iter().copied())
            .collect();

        Ok(Self::new(
            [key_ref.control_reference()?, tlv(tags::CERTIFICATE_STORE, chain)?].concat(),
        ))
    }
}
