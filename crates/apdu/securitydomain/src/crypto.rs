//! Key check values for AES static keys
//!
//! A KCV is the first three bytes of AES-128-CBC over sixteen `0x01` bytes
//! with a zero IV and no padding.

use aes::Aes128;
use cipher::{BlockEncryptMut, KeyIvInit, generic_array::GenericArray};
use subtle::ConstantTimeEq;

use crate::{Error, Result};

/// Length of a key check value
pub const KCV_LEN: usize = 3;

/// Length of an AES-128 static key
pub const AES128_KEY_LEN: usize = 16;

/// Key check value type
pub type Kcv = [u8; KCV_LEN];

const KCV_PLAINTEXT: [u8; 16] = [0x01; 16];

/// Compute the key check value of an AES-128 key
pub fn kcv(key: &[u8; AES128_KEY_LEN]) -> Kcv {
    let mut block = GenericArray::from(KCV_PLAINTEXT);
    let mut encryptor =
        cbc::Encryptor::<Aes128>::new(GenericArray::from_slice(key), &GenericArray::default());
    encryptor.encrypt_block_mut(&mut block);

    let mut out = [0u8; KCV_LEN];
    out.copy_from_slice(&block[..KCV_LEN]);
    out
}

/// Verify a key check value returned by the card against the plaintext key
///
/// The comparison runs in constant time.
pub fn validate_kcv(key: &[u8; AES128_KEY_LEN], actual: &[u8]) -> Result<()> {
    if bool::from(kcv(key).as_slice().ct_eq(actual)) {
        Ok(())
    } else {
        Err(Error::ChecksumMismatch("key check value does not match"))
    }
}

/// Constant time equality for response echoes
pub(crate) fn ct_equal(expected: &[u8], actual: &[u8]) -> bool {
    bool::from(expected.ct_eq(actual))
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;
    use rand::RngCore;

    #[test]
    fn test_kcv_known_vectors() {
        assert_eq!(kcv(&[0x00; 16]), hex!("E14D5D"));
        assert_eq!(kcv(&[0x11; 16]), hex!("098542"));
        assert_eq!(kcv(&[0x22; 16]), hex!("C65591"));
        assert_eq!(kcv(&[0x40; 16]), hex!("B9BC49"));
    }

    #[test]
    fn test_kcv_is_deterministic() {
        let mut rng = rand::rng();
        for _ in 0..32 {
            let mut key = [0u8; 16];
            rng.fill_bytes(&mut key);
            assert_eq!(kcv(&key), kcv(&key));
            assert!(validate_kcv(&key, &kcv(&key)).is_ok());
        }
    }

    #[test]
    fn test_kcv_detects_single_bit_flips() {
        let key = hex!("000102030405060708090A0B0C0D0E0F");
        let expected = kcv(&key);
        assert_eq!(expected, hex!("C35280"));

        for bit in 0..128 {
            let mut flipped = key;
            flipped[bit / 8] ^= 1 << (bit % 8);
            assert_eq!(
                validate_kcv(&flipped, &expected),
                Err(Error::ChecksumMismatch("key check value does not match")),
                "bit {bit} flip was not detected"
            );
        }
    }

    #[test]
    fn test_validate_rejects_wrong_length() {
        let key = [0x11; 16];
        assert!(validate_kcv(&key, &hex!("0985")).is_err());
        assert!(validate_kcv(&key, &hex!("09854200")).is_err());
        assert!(validate_kcv(&key, &hex!("098542")).is_ok());
    }
}
