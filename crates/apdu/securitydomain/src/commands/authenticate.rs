//! Deliberately failing authentication attempts used to block keys

use sdtoken_apdu_core::{ApduCommand, ExpectedLength};

use crate::constants::{INVALID_AUTH_PAYLOAD, cla};
use crate::keys::KeyRef;

/// Authentication command carrying an invalid payload
///
/// P1-P2 address the key under attack as `kvn, kid`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockingAttemptCommand {
    ins: u8,
    target: KeyRef,
}

impl BlockingAttemptCommand {
    /// Create an attempt with instruction `ins` against `target`
    pub const fn new(ins: u8, target: KeyRef) -> Self {
        Self { ins, target }
    }

    /// Key reference addressed by the attempt
    pub const fn target(&self) -> KeyRef {
        self.target
    }
}

impl ApduCommand for BlockingAttemptCommand {
    fn class(&self) -> u8 {
        cla::GP
    }

    fn instruction(&self) -> u8 {
        self.ins
    }

    fn p1(&self) -> u8 {
        self.target.kvn()
    }

    fn p2(&self) -> u8 {
        self.target.kid()
    }

    fn data(&self) -> Option<&[u8]> {
        Some(INVALID_AUTH_PAYLOAD.as_slice())
    }

    fn expected_length(&self) -> Option<ExpectedLength> {
        None
    }
}
