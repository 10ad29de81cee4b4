//! SELECT command

use bytes::Bytes;
use sdtoken_apdu_core::{ApduCommand, ExpectedLength};

use crate::constants::{cla, ins, select_p1};

/// SELECT by DF name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectCommand {
    aid: Bytes,
}

impl SelectCommand {
    /// Select the application with the given AID
    pub fn by_aid(aid: impl Into<Bytes>) -> Self {
        Self { aid: aid.into() }
    }
}

impl ApduCommand for SelectCommand {
    fn class(&self) -> u8 {
        cla::ISO7816
    }

    fn instruction(&self) -> u8 {
        ins::SELECT
    }

    fn p1(&self) -> u8 {
        select_p1::BY_NAME
    }

    fn p2(&self) -> u8 {
        0x00
    }

    fn data(&self) -> Option<&[u8]> {
        Some(&self.aid[..])
    }

    fn expected_length(&self) -> Option<ExpectedLength> {
        Some(0)
    }
}
