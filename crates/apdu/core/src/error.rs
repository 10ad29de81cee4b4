//! Core error type for all APDU operations

use crate::command::CommandError;
use crate::response::error::{ResponseError, StatusError};
use crate::secure_channel::SecureChannelError;
use crate::transport::TransportError;

/// Core error type that encompasses all possible errors in the crate
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// Transport error
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Command error
    #[error(transparent)]
    Command(#[from] CommandError),

    /// Response error
    #[error(transparent)]
    Response(#[from] ResponseError),

    /// Secure channel error
    #[error(transparent)]
    SecureChannel(#[from] SecureChannelError),
}

impl From<StatusError> for Error {
    fn from(error: StatusError) -> Self {
        Self::Response(ResponseError::Status(error))
    }
}

/// Result type for APDU operations
pub type Result<T> = std::result::Result<T, Error>;
