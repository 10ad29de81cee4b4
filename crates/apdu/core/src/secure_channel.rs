//! Secure channel abstractions
//!
//! The host side never implements a secure channel protocol itself. A
//! [`SecureChannelProvider`] is handed to the executor, which asks it for an
//! established [`SecureChannel`] and from then on routes every command
//! through it.

use std::fmt;

use bytes::Bytes;
use thiserror::Error;
use tracing::trace;

use crate::command::Command;
use crate::response::Response;
use crate::response::error::ResponseError;
use crate::transport::{CardTransport, TransportError};

/// Security level for a secure channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SecurityLevel {
    /// Whether encryption is enabled
    pub encryption: bool,
    /// Whether integrity (MAC) is enabled
    pub integrity: bool,
    /// Whether authentication is enabled
    pub authentication: bool,
}

impl SecurityLevel {
    /// Create a new security level
    pub const fn new(encryption: bool, integrity: bool, authentication: bool) -> Self {
        Self {
            encryption,
            integrity,
            authentication,
        }
    }

    /// Create a security level with no protection
    pub const fn none() -> Self {
        Self::new(false, false, false)
    }
}

/// Errors raised by secure channel implementations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SecureChannelError {
    /// Secure channel not established
    #[error("Secure channel not established")]
    NotEstablished,

    /// Authentication with the card failed
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(&'static str),

    /// Cryptographic failure inside the channel
    #[error("Cryptographic error: {0}")]
    Crypto(&'static str),

    /// Transport failure while exchanging protected commands
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Malformed protected response
    #[error(transparent)]
    Response(#[from] ResponseError),
}

/// An established secure channel session
///
/// Implementations wrap commands (MAC, encryption), unwrap responses, and
/// encrypt sensitive values under the session data encryption key.
pub trait SecureChannel: Send + Sync + fmt::Debug {
    /// Send a command through the channel
    fn process_command(
        &mut self,
        command: &Command,
        transport: &mut dyn CardTransport,
    ) -> Result<Response, SecureChannelError> {
        trace!(
            cla = format_args!("{:#04x}", command.cla),
            ins = format_args!("{:#04x}", command.ins),
            "Processing command through secure channel"
        );
        self.do_process_command(command, transport)
    }

    /// Internal implementation of process_command
    fn do_process_command(
        &mut self,
        command: &Command,
        transport: &mut dyn CardTransport,
    ) -> Result<Response, SecureChannelError>;

    /// Encrypt a sensitive value (key material) under the session data key
    ///
    /// The input length is always a multiple of the block size. The output
    /// has the same length as the input.
    fn encrypt_sensitive(&self, data: &[u8]) -> Result<Bytes, SecureChannelError>;

    /// Check if secure channel is established
    fn is_established(&self) -> bool;

    /// Get current security level
    fn security_level(&self) -> SecurityLevel;

    /// Close secure channel and forget session keys
    fn close(&mut self) -> Result<(), SecureChannelError>;
}

/// Factory for secure channel sessions
///
/// Runs the authentication handshake over the given transport.
pub trait SecureChannelProvider: Send + Sync + fmt::Debug {
    /// Authenticate and return an established channel
    fn create_secure_channel(
        &self,
        transport: &mut dyn CardTransport,
    ) -> Result<Box<dyn SecureChannel>, SecureChannelError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_security_level_default_is_none() {
        assert_eq!(SecurityLevel::default(), SecurityLevel::none());
        assert_ne!(SecurityLevel::new(true, true, false), SecurityLevel::none());
    }
}
