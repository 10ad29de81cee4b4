//! DELETE command for keys
//!
//! A zero KID or KVN acts as a wildcard. The SCP03 key identifiers always
//! address the whole key set, so a set is deleted by version alone.

use crate::constants::{ins, tags};
use crate::keys::KeyRef;
use crate::tlv::encode_map;
use crate::{Error, Result};

gp_command! {
    /// DELETE command addressing keys
    DeleteKeyCommand, ins::DELETE
}

impl DeleteKeyCommand {
    /// Delete the keys matching `key_ref`
    ///
    /// With `delete_last` set the card also allows removing its final key.
    pub fn new(key_ref: KeyRef, delete_last: bool) -> Result<Self> {
        let (mut kid, kvn) = (key_ref.kid(), key_ref.kvn());
        if kid == 0 && kvn == 0 {
            return Err(Error::InvalidKeyRef(key_ref, "at least one of KID and KVN must be set"));
        }

        if key_ref.is_scp03() {
            if kvn == 0 {
                return Err(Error::InvalidKeyRef(key_ref, "SCP03 keys are deleted by KVN"));
            }
            kid = 0;
        }

        let kid = [kid];
        let kvn = [kvn];
        let data = encode_map([
            (tags::DELETE_KEY_ID, (kid[0] != 0).then_some(kid.as_slice())),
            (tags::DELETE_KEY_VERSION, (kvn[0] != 0).then_some(kvn.as_slice())),
        ])?;

        Ok(Self {
            p1: 0x00,
            p2: u8::from(delete_last),
            data,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;
    use sdtoken_apdu_core::ApduCommand;

    #[test]
    fn test_delete_by_kid_and_kvn() {
        let cmd = DeleteKeyCommand::new(KeyRef::new(0x13, 0x01), false).unwrap();
        assert_eq!(cmd.to_bytes().as_ref(), hex!("80E4000006D00113D20101"));
    }

    #[test]
    fn test_delete_wildcards() {
        let by_kid = DeleteKeyCommand::new(KeyRef::new(0x10, 0x00), false).unwrap();
        assert_eq!(by_kid.data().unwrap(), hex!("D00110"));

        let by_kvn = DeleteKeyCommand::new(KeyRef::new(0x00, 0x03), true).unwrap();
        assert_eq!(by_kvn.data().unwrap(), hex!("D20103"));
        assert_eq!(by_kvn.p2(), 0x01);
    }

    #[test]
    fn test_delete_scp03_set() {
        for kid in [0x01, 0x02, 0x03] {
            let cmd = DeleteKeyCommand::new(KeyRef::new(kid, 0x05), false).unwrap();
            assert_eq!(cmd.data().unwrap(), hex!("D20105"));
        }

        let result = DeleteKeyCommand::new(KeyRef::new(0x01, 0x00), false);
        assert!(matches!(result, Err(Error::InvalidKeyRef(..))));
    }

    #[test]
    fn test_delete_everything_rejected() {
        let result = DeleteKeyCommand::new(KeyRef::new(0x00, 0x00), true);
        assert!(matches!(result, Err(Error::InvalidKeyRef(..))));
    }
}
