//! Core traits and types for APDU (Application Protocol Data Unit) operations
//!
//! This crate provides the foundational types for talking to smart card
//! tokens according to ISO/IEC 7816-4:
//!
//! - Creating and parsing APDU commands and responses
//! - Communicating with cards through a pluggable transport
//! - Routing commands through an externally provided secure channel
//! - Error handling and status word interpretation
#![cfg_attr(not(test), warn(unused_crate_dependencies))]
#![forbid(unsafe_code)]
#![warn(missing_docs, rustdoc::missing_crate_level_docs)]

// Re-export bytes for convenience
pub use bytes::{Bytes, BytesMut};

pub mod command;
pub mod error;
pub mod executor;
pub mod response;
pub mod secure_channel;
pub mod transport;

pub use command::{ApduCommand, Command, CommandError, ExpectedLength};
pub use error::{Error, Result};
pub use executor::CardExecutor;
pub use response::Response;
pub use response::error::{ResponseError, StatusError};
pub use response::status::StatusWord;
pub use secure_channel::{SecureChannel, SecureChannelError, SecureChannelProvider, SecurityLevel};
pub use transport::{CardTransport, TransportError};

/// Prelude module containing commonly used traits and types
pub mod prelude {
    pub use crate::{Bytes, BytesMut, Error, Result};

    pub use crate::command::{ApduCommand, Command, ExpectedLength};
    pub use crate::executor::CardExecutor;
    pub use crate::response::Response;
    pub use crate::response::status::{StatusWord, common as status};
    pub use crate::secure_channel::{SecureChannel, SecureChannelProvider, SecurityLevel};
    pub use crate::transport::{CardTransport, TransportError};
}
