//! APDU command definitions and traits
//!
//! Commands follow the ISO/IEC 7816-4 layout `CLA INS P1 P2 [Lc Data] [Le]`.
//! Payloads longer than 255 bytes switch to the extended length encoding
//! (`00 Lc1 Lc2`, two byte Le).

use bytes::{BufMut, Bytes, BytesMut};
use thiserror::Error;

/// Expected length type for APDU commands, `0` requests the maximum
pub type ExpectedLength = u8;

/// Largest payload that fits a short Lc byte
pub const SHORT_MAX_DATA_LEN: usize = 0xFF;

/// Largest payload that fits an extended Lc field
pub const EXTENDED_MAX_DATA_LEN: usize = 0xFFFF;

/// Error for APDU command building
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    /// Data too long
    #[error("Data too long: {0} bytes (max {1})")]
    DataTooLong(usize, usize),
}

/// Core trait for APDU commands
pub trait ApduCommand {
    /// Command class (CLA)
    fn class(&self) -> u8;

    /// Instruction code (INS)
    fn instruction(&self) -> u8;

    /// First parameter (P1)
    fn p1(&self) -> u8;

    /// Second parameter (P2)
    fn p2(&self) -> u8;

    /// Command payload data (optional)
    fn data(&self) -> Option<&[u8]>;

    /// Expected response length (optional)
    fn expected_length(&self) -> Option<ExpectedLength>;

    /// Whether the extended length encoding is needed for this command
    fn is_extended(&self) -> bool {
        self.data().is_some_and(|data| data.len() > SHORT_MAX_DATA_LEN)
    }

    /// Convert to raw APDU bytes
    fn to_bytes(&self) -> Bytes {
        let mut buffer = BytesMut::with_capacity(self.command_length());
        let extended = self.is_extended();

        // Header: CLA, INS, P1, P2
        buffer.put_u8(self.class());
        buffer.put_u8(self.instruction());
        buffer.put_u8(self.p1());
        buffer.put_u8(self.p2());

        if let Some(data) = self.data() {
            if extended {
                buffer.put_u8(0x00);
                buffer.put_u16(data.len() as u16);
            } else {
                buffer.put_u8(data.len() as u8);
            }
            buffer.put_slice(data);
        }

        if let Some(le) = self.expected_length() {
            if extended {
                buffer.put_u16(u16::from(le));
            } else {
                buffer.put_u8(le);
            }
        }

        buffer.freeze()
    }

    /// Calculate length of serialized command
    fn command_length(&self) -> usize {
        let extended = self.is_extended();
        let mut length = 4;

        if let Some(data) = self.data() {
            length += if extended { 3 } else { 1 } + data.len();
        }

        if self.expected_length().is_some() {
            length += if extended { 2 } else { 1 };
        }

        length
    }

    /// Convert to a generic Command
    fn to_command(&self) -> Command {
        Command {
            cla: self.class(),
            ins: self.instruction(),
            p1: self.p1(),
            p2: self.p2(),
            data: self.data().map(Bytes::copy_from_slice),
            le: self.expected_length(),
        }
    }
}

/// Generic APDU command structure
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    /// Command class byte
    pub cla: u8,
    /// Instruction byte
    pub ins: u8,
    /// Parameter 1
    pub p1: u8,
    /// Parameter 2
    pub p2: u8,
    /// Command data (optional)
    pub data: Option<Bytes>,
    /// Expected length (optional)
    pub le: Option<ExpectedLength>,
}

impl Command {
    /// Create a new command with just the header bytes
    pub const fn new(cla: u8, ins: u8, p1: u8, p2: u8) -> Self {
        Self {
            cla,
            ins,
            p1,
            p2,
            data: None,
            le: None,
        }
    }

    /// Create a new command with expected response length (Le)
    pub const fn new_with_le(cla: u8, ins: u8, p1: u8, p2: u8, le: ExpectedLength) -> Self {
        Self {
            cla,
            ins,
            p1,
            p2,
            data: None,
            le: Some(le),
        }
    }

    /// Check that the payload fits the envelope
    pub fn validate(&self) -> Result<(), CommandError> {
        match self.data.as_ref().map(Bytes::len) {
            Some(len) if len > EXTENDED_MAX_DATA_LEN => {
                Err(CommandError::DataTooLong(len, EXTENDED_MAX_DATA_LEN))
            }
            _ => Ok(()),
        }
    }
}

impl ApduCommand for Command {
    fn class(&self) -> u8 {
        self.cla
    }

    fn instruction(&self) -> u8 {
        self.ins
    }

    fn p1(&self) -> u8 {
        self.p1
    }

    fn p2(&self) -> u8 {
        self.p2
    }

    fn data(&self) -> Option<&[u8]> {
        self.data.as_deref()
    }

    fn expected_length(&self) -> Option<ExpectedLength> {
        self.le
    }
}
