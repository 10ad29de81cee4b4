//! GET DATA command and the data objects read with it

use std::collections::BTreeMap;

use bytes::Bytes;

use crate::constants::{ins, tags};
use crate::keys::KeyRef;
use crate::tlv::{Tlv, TlvError};
use crate::{Error, Result};

/// Key information: every provisioned key and its `(component type, value)` pairs
pub type KeyInformation = BTreeMap<KeyRef, BTreeMap<u8, u8>>;

gp_command! {
    /// GET DATA command, P1-P2 carry the data object tag
    GetDataCommand, ins::GET_DATA
}

impl GetDataCommand {
    /// Read the data object with the given tag
    pub const fn new(tag: u16) -> Self {
        Self {
            p1: (tag >> 8) as u8,
            p2: tag as u8,
            data: Bytes::new(),
        }
    }

    /// Read the data object with the given tag, passing a selector payload
    pub fn with_data(tag: u16, data: impl Into<Bytes>) -> Self {
        Self {
            data: data.into(),
            ..Self::new(tag)
        }
    }
}

/// Parse the key information data object
///
/// Accepts the templates either bare or wrapped in the `E0` data object.
pub fn parse_key_information(data: &[u8]) -> Result<KeyInformation> {
    let mut records = Tlv::parse_all(data)?;
    if records.len() == 1 && records[0].tag() == tags::KEY_INFORMATION {
        let wrapper = records.remove(0);
        records = Tlv::parse_all(wrapper.value())?;
    }

    let mut info = KeyInformation::new();
    for record in records {
        if record.tag() != tags::KEY_INFORMATION_TEMPLATE {
            return Err(TlvError::TagMismatch {
                expected: tags::KEY_INFORMATION_TEMPLATE,
                found: record.tag(),
            }
            .into());
        }

        let value = record.value();
        let [kid, kvn, components @ ..] = value.as_ref() else {
            return Err(Error::BadResponse("key information template too short"));
        };
        if components.len() % 2 != 0 {
            return Err(Error::BadResponse("key information template has a dangling byte"));
        }
        let components = components
            .chunks_exact(2)
            .map(|pair| (pair[0], pair[1]))
            .collect();
        info.insert(KeyRef::new(*kid, *kvn), components);
    }
    Ok(info)
}

/// Parse CA identifiers: alternating subject key identifier and key reference
pub fn parse_ca_identifiers(data: &[u8]) -> Result<BTreeMap<KeyRef, Bytes>> {
    let records = Tlv::parse_all(data)?;
    if records.len() % 2 != 0 {
        return Err(Error::BadResponse("CA identifiers must come in pairs"));
    }

    let mut identifiers = BTreeMap::new();
    for pair in records.chunks_exact(2) {
        let (ski, key_id) = (&pair[0], &pair[1]);
        if ski.tag() != tags::SUBJECT_KEY_ID || key_id.tag() != tags::KEY_ID {
            return Err(Error::BadResponse("unexpected tag in CA identifiers"));
        }
        identifiers.insert(KeyRef::from_bytes(key_id.value())?, ski.value().clone());
    }
    Ok(identifiers)
}

/// Parse card recognition data, returning the content of the card data template
pub fn parse_card_recognition_data(data: &[u8]) -> Result<Bytes> {
    Ok(Tlv::unpack(tags::CARD_DATA, data)?)
}
