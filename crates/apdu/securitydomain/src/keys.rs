//! Key references and key material
//!
//! Secret material ([`StaticKeys`], [`EcPrivateKey`]) zeroizes itself on
//! drop. Operations that borrow caller owned secrets wrap them in a guard
//! that wipes them when the operation returns, whichever way it returns.

use std::fmt;
use std::ops::Deref;

use bytes::Bytes;
use derive_more::Display;
use p256::elliptic_curve::sec1::ToEncodedPoint;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::constants::{EC_PARAMS_P256, kid, tags};
use crate::crypto::AES128_KEY_LEN;
use crate::tlv::tlv;
use crate::{Error, Result};

/// Reference to a key slot: key identifier (kind) and key version number
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display)]
#[display("KeyRef(kid={kid:#04x}, kvn={kvn:#04x})")]
pub struct KeyRef {
    kid: u8,
    kvn: u8,
}

impl KeyRef {
    /// Create a key reference
    pub const fn new(kid: u8, kvn: u8) -> Self {
        Self { kid, kvn }
    }

    /// Key identifier
    pub const fn kid(&self) -> u8 {
        self.kid
    }

    /// Key version number
    pub const fn kvn(&self) -> u8 {
        self.kvn
    }

    /// Both identifier and version are zero
    pub const fn is_wildcard(&self) -> bool {
        self.kid == 0 && self.kvn == 0
    }

    /// Whether the identifier addresses an SCP03 static key set
    pub const fn is_scp03(&self) -> bool {
        matches!(
            self.kid,
            kid::SCP03 | kid::SCP03_ALTERNATE_1 | kid::SCP03_ALTERNATE_2
        )
    }

    /// Wire encoding `kid || kvn`
    pub const fn to_bytes(&self) -> [u8; 2] {
        [self.kid, self.kvn]
    }

    /// Parse the two byte wire encoding
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        match data {
            [kid, kvn] => Ok(Self::new(*kid, *kvn)),
            _ => Err(Error::BadResponse("key reference must be two bytes")),
        }
    }

    /// Control reference template `A6 { 83 { kid kvn } }`
    pub(crate) fn control_reference(&self) -> Result<Bytes> {
        Ok(tlv(tags::CONTROL_REFERENCE, tlv(tags::KEY_ID, self.to_bytes())?)?)
    }
}

impl From<(u8, u8)> for KeyRef {
    fn from((kid, kvn): (u8, u8)) -> Self {
        Self::new(kid, kvn)
    }
}

/// SCP03 static key set
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct StaticKeys {
    enc: [u8; AES128_KEY_LEN],
    mac: [u8; AES128_KEY_LEN],
    dek: [u8; AES128_KEY_LEN],
}

impl StaticKeys {
    /// Create a key set from its three components
    pub const fn new(
        enc: [u8; AES128_KEY_LEN],
        mac: [u8; AES128_KEY_LEN],
        dek: [u8; AES128_KEY_LEN],
    ) -> Self {
        Self { enc, mac, dek }
    }

    /// Create a key set from slices, each sixteen bytes long
    pub fn from_slices(enc: &[u8], mac: &[u8], dek: &[u8]) -> Result<Self> {
        let convert = |key: &[u8]| {
            <[u8; AES128_KEY_LEN]>::try_from(key)
                .map_err(|_| Error::InvalidArgument("static keys must be 16 bytes"))
        };
        Ok(Self::new(convert(enc)?, convert(mac)?, convert(dek)?))
    }

    /// Encryption key
    pub const fn enc(&self) -> &[u8; AES128_KEY_LEN] {
        &self.enc
    }

    /// MAC key
    pub const fn mac(&self) -> &[u8; AES128_KEY_LEN] {
        &self.mac
    }

    /// Data encryption key
    pub const fn dek(&self) -> &[u8; AES128_KEY_LEN] {
        &self.dek
    }

    /// Keys in PUT KEY order
    pub(crate) const fn components(&self) -> [&[u8; AES128_KEY_LEN]; 3] {
        [&self.enc, &self.mac, &self.dek]
    }

    /// Every byte of every component is zero
    pub fn is_zeroed(&self) -> bool {
        self.components().iter().all(|key| key.iter().all(|b| *b == 0))
    }
}

impl fmt::Debug for StaticKeys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticKeys").finish_non_exhaustive()
    }
}

/// Named elliptic curves a key may claim
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum Curve {
    /// NIST P-256 (secp256r1)
    #[display("secp256r1")]
    P256,
    /// NIST P-384 (secp384r1)
    #[display("secp384r1")]
    P384,
    /// NIST P-521 (secp521r1)
    #[display("secp521r1")]
    P521,
}

impl Curve {
    /// Length of one field element in bytes
    pub const fn field_len(&self) -> usize {
        match self {
            Self::P256 => 32,
            Self::P384 => 48,
            Self::P521 => 66,
        }
    }

    /// Length of an uncompressed SEC1 point
    pub const fn uncompressed_point_len(&self) -> usize {
        1 + 2 * self.field_len()
    }

    /// Key parameter reference used by the Security Domain, if supported
    pub const fn key_params(&self) -> Option<u8> {
        match self {
            Self::P256 => Some(EC_PARAMS_P256),
            Self::P384 | Self::P521 => None,
        }
    }

    pub(crate) fn require_supported(&self) -> Result<u8> {
        self.key_params()
            .ok_or(Error::UnsupportedCurve("only secp256r1 keys are supported"))
    }
}

/// EC public key as an uncompressed SEC1 point
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EcPublicKey {
    curve: Curve,
    point: Bytes,
}

impl EcPublicKey {
    /// Parse a SEC1 encoded point
    ///
    /// P-256 points are validated and normalized to the uncompressed form.
    /// Other curves must already be uncompressed.
    pub fn from_sec1_bytes(curve: Curve, data: &[u8]) -> Result<Self> {
        match curve {
            Curve::P256 => {
                let key = p256::PublicKey::from_sec1_bytes(data)
                    .map_err(|_| Error::InvalidArgument("not a valid secp256r1 point"))?;
                Ok(Self::from_p256(&key))
            }
            Curve::P384 | Curve::P521 => {
                if data.len() != curve.uncompressed_point_len() || data.first() != Some(&0x04) {
                    return Err(Error::InvalidArgument("not an uncompressed point"));
                }
                Ok(Self {
                    curve,
                    point: Bytes::copy_from_slice(data),
                })
            }
        }
    }

    /// Wrap a P-256 public key
    pub fn from_p256(key: &p256::PublicKey) -> Self {
        Self {
            curve: Curve::P256,
            point: Bytes::copy_from_slice(key.to_encoded_point(false).as_bytes()),
        }
    }

    /// Convert to a P-256 public key
    pub fn to_p256(&self) -> Result<p256::PublicKey> {
        if self.curve != Curve::P256 {
            return Err(Error::UnsupportedCurve("key is not on secp256r1"));
        }
        p256::PublicKey::from_sec1_bytes(&self.point)
            .map_err(|_| Error::InvalidArgument("not a valid secp256r1 point"))
    }

    /// Curve the key lives on
    pub const fn curve(&self) -> Curve {
        self.curve
    }

    /// Uncompressed point `04 || X || Y`
    pub const fn as_bytes(&self) -> &Bytes {
        &self.point
    }
}

/// EC private key scalar
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct EcPrivateKey {
    #[zeroize(skip)]
    curve: Curve,
    scalar: Vec<u8>,
}

impl EcPrivateKey {
    /// Create a private key from its big endian scalar
    pub fn new(curve: Curve, scalar: &[u8]) -> Result<Self> {
        if scalar.len() != curve.field_len() {
            return Err(Error::InvalidArgument("scalar length does not match the curve"));
        }
        if curve == Curve::P256 && p256::SecretKey::from_slice(scalar).is_err() {
            return Err(Error::InvalidArgument("scalar out of range for secp256r1"));
        }
        Ok(Self {
            curve,
            scalar: scalar.to_vec(),
        })
    }

    /// Curve the key lives on
    pub const fn curve(&self) -> Curve {
        self.curve
    }

    /// Big endian scalar, empty once wiped
    pub fn scalar(&self) -> &[u8] {
        &self.scalar
    }

    /// The scalar has been wiped
    pub fn is_zeroed(&self) -> bool {
        self.scalar.iter().all(|b| *b == 0)
    }
}

impl fmt::Debug for EcPrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EcPrivateKey")
            .field("curve", &self.curve)
            .finish_non_exhaustive()
    }
}

/// Wipes a borrowed secret when dropped
pub(crate) struct ZeroizeGuard<'a, Z: Zeroize>(&'a mut Z);

impl<'a, Z: Zeroize> ZeroizeGuard<'a, Z> {
    pub(crate) const fn new(secret: &'a mut Z) -> Self {
        Self(secret)
    }
}

impl<Z: Zeroize> Deref for ZeroizeGuard<'_, Z> {
    type Target = Z;

    fn deref(&self) -> &Z {
        self.0
    }
}

impl<Z: Zeroize> Drop for ZeroizeGuard<'_, Z> {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}
