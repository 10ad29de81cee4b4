use sdtoken_apdu_core::{
    CommandError, ResponseError, SecureChannelError, StatusWord, TransportError,
};
use thiserror::Error;

use crate::keys::KeyRef;
use crate::reset::ResetReport;
use crate::tlv::TlvError;

/// Result type for Security Domain operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for Security Domain operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// Transport failure or cancellation
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The card answered with a non-success status word
    #[error("Card returned error status: {0} ({desc})", desc = .0.description())]
    Status(StatusWord),

    /// The response could not be interpreted
    #[error("Bad response: {0}")]
    BadResponse(&'static str),

    /// Malformed APDU response framing
    #[error(transparent)]
    Response(#[from] ResponseError),

    /// Malformed TLV structure in a response
    #[error("Bad response: {0}")]
    Tlv(#[from] TlvError),

    /// A key check value or version echo did not match
    #[error("Checksum mismatch: {0}")]
    ChecksumMismatch(&'static str),

    /// The key reference is not valid for the operation
    #[error("Invalid key reference {0}: {1}")]
    InvalidKeyRef(KeyRef, &'static str),

    /// An argument is not valid for the operation
    #[error("Invalid argument: {0}")]
    InvalidArgument(&'static str),

    /// The key uses a curve the Security Domain does not support
    #[error("Unsupported curve: {0}")]
    UnsupportedCurve(&'static str),

    /// The operation needs an established secure channel
    #[error("Secure channel not established")]
    NoSecureChannel,

    /// Command could not be framed
    #[error(transparent)]
    Command(#[from] CommandError),

    /// Secure channel failure
    #[error(transparent)]
    SecureChannel(SecureChannelError),

    /// Keys were processed but the Security Domain could not be selected again
    #[error("Reset ran but reinitialization failed: {source}")]
    ResetIncomplete {
        /// Per key outcomes of the blocking run
        report: ResetReport,
        /// Reinitialization failure
        source: Box<Error>,
    },

    /// Cryptographic operation failed
    #[error("Cryptographic error: {0}")]
    Crypto(&'static str),
}

impl Error {
    /// Whether this is a transport failure, including cancellation
    pub const fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }

    /// Whether the card answered with the given status word
    pub fn has_status(&self, status: StatusWord) -> bool {
        matches!(self, Self::Status(sw) if *sw == status)
    }

    /// Whether this error was raised before any transport activity
    pub const fn is_precondition(&self) -> bool {
        matches!(
            self,
            Self::InvalidKeyRef(..)
                | Self::InvalidArgument(_)
                | Self::UnsupportedCurve(_)
                | Self::NoSecureChannel
        )
    }
}

impl From<SecureChannelError> for Error {
    fn from(error: SecureChannelError) -> Self {
        match error {
            SecureChannelError::Transport(e) => Self::Transport(e),
            SecureChannelError::NotEstablished => Self::NoSecureChannel,
            SecureChannelError::Response(ResponseError::Status(e)) => Self::Status(e.status),
            other => Self::SecureChannel(other),
        }
    }
}

impl From<iso7816_tlv::TlvError> for Error {
    fn from(error: iso7816_tlv::TlvError) -> Self {
        Self::Tlv(error.into())
    }
}

impl From<sdtoken_apdu_core::Error> for Error {
    fn from(error: sdtoken_apdu_core::Error) -> Self {
        match error {
            sdtoken_apdu_core::Error::Transport(e) => Self::Transport(e),
            sdtoken_apdu_core::Error::Command(e) => Self::Command(e),
            sdtoken_apdu_core::Error::Response(ResponseError::Status(e)) => Self::Status(e.status),
            sdtoken_apdu_core::Error::Response(e) => Self::Response(e),
            sdtoken_apdu_core::Error::SecureChannel(e) => e.into(),
        }
    }
}
