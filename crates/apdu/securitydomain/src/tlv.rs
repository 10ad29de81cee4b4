//! TLV records on top of `iso7816_tlv`
//!
//! Security Domain data objects are BER-TLV with one or two byte tags
//! (`0x83`, `0xBF21`, `0xFF33`) and DER lengths, handled by the `ber` codec.
//! Constructed tags carry nested records; [`Tlv`] exposes them as the flat
//! encoding of their children so callers can search them with [`Tlv::find`].
//!
//! Key components inside PUT KEY and GENERATE KEY are framed with the
//! GlobalPlatform key type byte (`0xB0`, `0xB1`, `0xF0`) even though it sets
//! the BER constructed bit, so those go through the `simple` codec instead.

use bytes::Bytes;
use iso7816_tlv::{ber, simple};
use thiserror::Error;

/// Errors raised while encoding or decoding TLV data
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TlvError {
    /// Rejected by the underlying codec: truncated input, bad length or inconsistent value
    #[error("malformed TLV: {0}")]
    Malformed(String),

    /// Not a valid one or two byte BER tag
    #[error("invalid TLV tag {0:#06x}")]
    InvalidTag(u16),

    /// Record carries a different tag than expected
    #[error("expected TLV tag {expected:#06x}, found {found:#06x}")]
    TagMismatch {
        /// Tag the caller asked for
        expected: u16,
        /// Tag present in the data
        found: u16,
    },

    /// Bytes left over after the expected record
    #[error("{0} trailing bytes after TLV")]
    TrailingData(usize),
}

impl From<iso7816_tlv::TlvError> for TlvError {
    fn from(error: iso7816_tlv::TlvError) -> Self {
        Self::Malformed(error.to_string())
    }
}

/// A single tag-length-value record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tlv {
    tag: u16,
    value: Bytes,
}

impl Tlv {
    /// Create a record from a tag and value
    pub fn new(tag: u16, value: impl Into<Bytes>) -> Self {
        Self {
            tag,
            value: value.into(),
        }
    }

    /// Record tag
    pub const fn tag(&self) -> u16 {
        self.tag
    }

    /// Record value
    pub const fn value(&self) -> &Bytes {
        &self.value
    }

    /// Encode the record
    ///
    /// Fails for tags that are not valid BER tags and for constructed tags
    /// whose value is not a sequence of records.
    pub fn to_bytes(&self) -> Result<Bytes, TlvError> {
        let tag = ber_tag(self.tag)?;
        let value = if tag.is_constructed() {
            ber::Value::Constructed(parse_ber(&self.value)?)
        } else {
            ber::Value::Primitive(self.value.to_vec())
        };
        Ok(ber::Tlv::new(tag, value)?.to_vec().into())
    }

    /// Decode one record from the front of `data`
    ///
    /// Returns the record and the number of bytes it occupied.
    pub fn parse(data: &[u8]) -> Result<(Self, usize), TlvError> {
        let (record, rest) = ber::Tlv::parse(data);
        let record = Self::try_from(&record?)?;
        Ok((record, data.len() - rest.len()))
    }

    /// Decode every top level record in `data`
    pub fn parse_all(data: &[u8]) -> Result<Vec<Self>, TlvError> {
        parse_ber(data)?.iter().map(Self::try_from).collect()
    }

    /// Split `data` into the raw encodings of its top level records
    pub fn split_raw(data: &[u8]) -> Result<Vec<Bytes>, TlvError> {
        let mut records = Vec::new();
        let mut rest = data;
        while !rest.is_empty() {
            let (_, used) = Self::parse(rest)?;
            records.push(Bytes::copy_from_slice(&rest[..used]));
            rest = &rest[used..];
        }
        Ok(records)
    }

    /// Decode exactly one record with the given tag and return its value
    pub fn unpack(tag: u16, data: &[u8]) -> Result<Bytes, TlvError> {
        let (record, used) = Self::parse(data)?;
        if record.tag != tag {
            return Err(TlvError::TagMismatch {
                expected: tag,
                found: record.tag,
            });
        }
        if used != data.len() {
            return Err(TlvError::TrailingData(data.len() - used));
        }
        Ok(record.value)
    }

    /// Find the first record with `tag` among the records nested in this value
    pub fn find(&self, tag: u16) -> Result<Option<Self>, TlvError> {
        find(&self.value, tag)
    }
}

impl TryFrom<&ber::Tlv> for Tlv {
    type Error = TlvError;

    fn try_from(record: &ber::Tlv) -> Result<Self, Self::Error> {
        let tag = match record.tag().to_bytes() {
            [tag] => u16::from(*tag),
            [high, low] => u16::from_be_bytes([*high, *low]),
            _ => return Err(TlvError::Malformed("tag longer than two bytes".into())),
        };
        let value = match record.value() {
            ber::Value::Primitive(bytes) => Bytes::copy_from_slice(bytes),
            ber::Value::Constructed(children) => children
                .iter()
                .flat_map(ber::Tlv::to_vec)
                .collect::<Vec<u8>>()
                .into(),
        };
        Ok(Self { tag, value })
    }
}

/// Find the first top level record with `tag` in `data`
pub fn find(data: &[u8], tag: u16) -> Result<Option<Tlv>, TlvError> {
    let mut rest = data;
    while !rest.is_empty() {
        let (record, used) = Tlv::parse(rest)?;
        if record.tag == tag {
            return Ok(Some(record));
        }
        rest = &rest[used..];
    }
    Ok(None)
}

/// Encode a single record
pub fn tlv(tag: u16, value: impl AsRef<[u8]>) -> Result<Bytes, TlvError> {
    Tlv::new(tag, Bytes::copy_from_slice(value.as_ref())).to_bytes()
}

/// Encode an ordered set of records as a flat concatenation
///
/// Entries without a value are omitted. An empty value is encoded with a
/// zero length.
pub fn encode_map<'a>(
    entries: impl IntoIterator<Item = (u16, Option<&'a [u8]>)>,
) -> Result<Bytes, TlvError> {
    let mut encoded = Vec::new();
    for (tag, value) in entries {
        if let Some(value) = value {
            encoded.extend_from_slice(&tlv(tag, value)?);
        }
    }
    Ok(encoded.into())
}

/// Encode a key component as `key type || length || data`
pub fn key_component(key_type: u8, data: &[u8]) -> Result<Bytes, TlvError> {
    let component = simple::Tlv::new(key_type.try_into()?, data.to_vec())?;
    Ok(component.to_vec().into())
}

/// Decode exactly one key component of the given type and return its data
pub fn unpack_key_component(key_type: u8, data: &[u8]) -> Result<Bytes, TlvError> {
    let (component, rest) = simple::Tlv::parse(data);
    let component = component?;
    let found: u8 = component.tag().into();
    if found != key_type {
        return Err(TlvError::TagMismatch {
            expected: key_type.into(),
            found: found.into(),
        });
    }
    if !rest.is_empty() {
        return Err(TlvError::TrailingData(rest.len()));
    }
    Ok(Bytes::copy_from_slice(component.value()))
}

/// Single byte tags must not use the multi byte marker; a second byte must end the tag.
fn ber_tag(tag: u16) -> Result<ber::Tag, TlvError> {
    let raw = tag.to_be_bytes();
    let [high, low] = raw;
    let start = match high {
        0 if low != 0 && low & 0x1F != 0x1F => 1,
        _ if high & 0x1F == 0x1F && low & 0x80 == 0 && low >= 0x1F => 0,
        _ => return Err(TlvError::InvalidTag(tag)),
    };
    ber::Tag::try_from(&raw[start..]).map_err(|_| TlvError::InvalidTag(tag))
}

fn parse_ber(data: &[u8]) -> Result<Vec<ber::Tlv>, TlvError> {
    let mut records = Vec::new();
    let mut rest = data;
    while !rest.is_empty() {
        let (record, remaining) = ber::Tlv::parse(rest);
        records.push(record?);
        rest = remaining;
    }
    Ok(records)
}
