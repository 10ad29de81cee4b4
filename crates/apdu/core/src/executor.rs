//! Executor for APDU command execution
//!
//! The executor owns the transport and an optional secure channel. Commands
//! are routed through the channel when one is established, and sent in the
//! clear otherwise. GET RESPONSE chaining (`61xx`) is handled on the clear
//! path only; a secure channel is expected to deliver complete responses.

use bytes::{BufMut, Bytes, BytesMut};
use tracing::{debug, instrument, trace};

use crate::command::{ApduCommand, Command};
use crate::error::Result;
use crate::response::Response;
use crate::response::error::ResponseError;
use crate::secure_channel::{SecureChannel, SecureChannelError, SecureChannelProvider, SecurityLevel};
use crate::transport::CardTransport;

/// Default limit on GET RESPONSE round trips for one command
pub const DEFAULT_MAX_RESPONSE_CHAINS: usize = 10;

/// GET RESPONSE instruction
const INS_GET_RESPONSE: u8 = 0xC0;

/// Card executor combining a transport with an optional secure channel
#[derive(Debug)]
pub struct CardExecutor<T: CardTransport> {
    /// The transport used for communication
    transport: T,
    /// Established secure channel, if any
    secure_channel: Option<Box<dyn SecureChannel>>,
    /// Maximum number of chained GET RESPONSE commands
    max_response_chains: usize,
}

impl<T: CardTransport> CardExecutor<T> {
    /// Create a new card executor with the given transport
    pub const fn new(transport: T) -> Self {
        Self {
            transport,
            secure_channel: None,
            max_response_chains: DEFAULT_MAX_RESPONSE_CHAINS,
        }
    }

    /// Set the GET RESPONSE chain limit
    pub const fn with_max_response_chains(mut self, max_response_chains: usize) -> Self {
        self.max_response_chains = max_response_chains;
        self
    }

    /// Get a reference to the underlying transport
    pub const fn transport(&self) -> &T {
        &self.transport
    }

    /// Take ownership of the transport and return it
    pub fn into_transport(self) -> T {
        self.transport
    }

    /// Whether an established secure channel is attached
    pub fn has_secure_channel(&self) -> bool {
        self.secure_channel
            .as_ref()
            .is_some_and(|channel| channel.is_established())
    }

    /// Get current security level
    pub fn security_level(&self) -> SecurityLevel {
        self.secure_channel
            .as_ref()
            .filter(|channel| channel.is_established())
            .map_or_else(SecurityLevel::none, |channel| channel.security_level())
    }

    /// Open a secure channel using the provided secure channel provider
    ///
    /// Any previously attached channel is discarded first.
    pub fn open_secure_channel(&mut self, provider: &dyn SecureChannelProvider) -> Result<()> {
        debug!("Opening secure channel");
        self.discard_secure_channel();

        let channel = provider.create_secure_channel(&mut self.transport)?;
        if !channel.is_established() {
            return Err(SecureChannelError::NotEstablished.into());
        }

        debug!(level = ?channel.security_level(), "Secure channel established");
        self.secure_channel = Some(channel);
        Ok(())
    }

    /// Close the secure channel, if any
    pub fn close_secure_channel(&mut self) -> Result<()> {
        if let Some(mut channel) = self.secure_channel.take() {
            debug!("Closing secure channel");
            channel.close()?;
        }
        Ok(())
    }

    /// Drop the secure channel without talking to it
    pub fn discard_secure_channel(&mut self) {
        if self.secure_channel.take().is_some() {
            debug!("Discarded secure channel");
        }
    }

    /// Encrypt sensitive data under the secure channel's data key
    pub fn encrypt_sensitive(&self, data: &[u8]) -> Result<Bytes> {
        let channel = self
            .secure_channel
            .as_ref()
            .filter(|channel| channel.is_established())
            .ok_or(SecureChannelError::NotEstablished)?;
        Ok(channel.encrypt_sensitive(data)?)
    }

    /// Transmit a command and return the full response
    ///
    /// Non-success status words are returned as part of the response, not
    /// as errors.
    #[instrument(level = "trace", skip_all, fields(cla = command.cla, ins = command.ins))]
    pub fn transmit(&mut self, command: &Command) -> Result<Response> {
        command.validate()?;

        let response = match self
            .secure_channel
            .as_mut()
            .filter(|channel| channel.is_established())
        {
            Some(channel) => channel.process_command(command, &mut self.transport)?,
            None => {
                let raw = self.transport.transmit_raw(&command.to_bytes())?;
                let response = Response::from_bytes(&raw)?;
                self.follow_response_chain(response)?
            }
        };

        trace!(sw = %response.status(), len = response.data().len(), "Command complete");
        Ok(response)
    }

    fn follow_response_chain(&mut self, mut response: Response) -> Result<Response> {
        let mut buffer = BytesMut::new();
        let mut chains = 0;

        while let Some(remaining) = response.status().remaining_bytes() {
            if chains >= self.max_response_chains {
                return Err(ResponseError::ChainLimitExceeded(chains).into());
            }
            chains += 1;
            buffer.put_slice(response.data());

            let get_response = Command::new_with_le(0x00, INS_GET_RESPONSE, 0x00, 0x00, remaining);
            trace!(chains, remaining, "Sending GET RESPONSE");
            let raw = self.transport.transmit_raw(&get_response.to_bytes())?;
            response = Response::from_bytes(&raw)?;
        }

        if chains == 0 {
            return Ok(response);
        }

        buffer.put_slice(response.data());
        Ok(Response::new(Some(buffer.freeze()), response.status()))
    }
}
