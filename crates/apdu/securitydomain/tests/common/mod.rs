//! Scripted card and secure channel shared by the integration tests
#![allow(dead_code, unreachable_pub)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};

use aes::Aes128;
use cipher::{BlockEncryptMut, KeyIvInit, generic_array::GenericArray};
use sdtoken_apdu_core::{
    ApduCommand, Bytes, CardTransport, Command, Response, SecureChannel, SecureChannelError,
    SecureChannelProvider, SecurityLevel, TransportError,
};
use sdtoken_securitydomain::{SecurityDomainConfig, SecurityDomainSession};
use tracing_subscriber::EnvFilter;

/// Session DEK used by the mock secure channel
pub const MOCK_DEK: [u8; 16] = [
    0x40, 0x41, 0x42, 0x43, 0x44, 0x45, 0x46, 0x47, 0x48, 0x49, 0x4A, 0x4B, 0x4C, 0x4D, 0x4E, 0x4F,
];

/// Success status word
pub const SW_OK: [u8; 2] = [0x90, 0x00];

/// Install a fmt subscriber writing through the test harness
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Card that answers from a script and records what it was sent
#[derive(Debug, Default)]
pub struct MockCard {
    responses: VecDeque<Result<Bytes, TransportError>>,
    fallback: Option<Bytes>,
    sent: Vec<Bytes>,
}

impl MockCard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a raw response, payload followed by the status word
    pub fn respond(mut self, response: impl AsRef<[u8]>) -> Self {
        self.responses
            .push_back(Ok(Bytes::copy_from_slice(response.as_ref())));
        self
    }

    /// Queue a transport failure
    pub fn fail(mut self, error: TransportError) -> Self {
        self.responses.push_back(Err(error));
        self
    }

    /// Answer with `response` once the script is exhausted
    pub fn otherwise(mut self, response: impl AsRef<[u8]>) -> Self {
        self.fallback = Some(Bytes::copy_from_slice(response.as_ref()));
        self
    }

    /// Every command sent so far
    pub fn sent(&self) -> &[Bytes] {
        &self.sent
    }

    /// Commands sent with the given instruction byte
    pub fn sent_with_ins(&self, ins: u8) -> Vec<&Bytes> {
        self.sent.iter().filter(|apdu| apdu[1] == ins).collect()
    }
}

impl CardTransport for MockCard {
    fn do_transmit_raw(&mut self, command: &[u8]) -> Result<Bytes, TransportError> {
        self.sent.push(Bytes::copy_from_slice(command));
        match self.responses.pop_front() {
            Some(response) => response,
            None => self.fallback.clone().ok_or(TransportError::Transmission),
        }
    }
}

/// Pass-through channel whose data key wrapping is real AES-CBC under [`MOCK_DEK`]
#[derive(Debug)]
pub struct MockChannel {
    established: bool,
}

impl SecureChannel for MockChannel {
    fn do_process_command(
        &mut self,
        command: &Command,
        transport: &mut dyn CardTransport,
    ) -> Result<Response, SecureChannelError> {
        let raw = transport.transmit_raw(&command.to_bytes())?;
        Ok(Response::from_bytes(&raw)?)
    }

    fn encrypt_sensitive(&self, data: &[u8]) -> Result<Bytes, SecureChannelError> {
        if data.len() % 16 != 0 {
            return Err(SecureChannelError::Crypto("data is not block aligned"));
        }
        let mut encryptor = cbc::Encryptor::<Aes128>::new(
            GenericArray::from_slice(&MOCK_DEK),
            &GenericArray::default(),
        );
        let mut out = data.to_vec();
        for block in out.chunks_exact_mut(16) {
            encryptor.encrypt_block_mut(GenericArray::from_mut_slice(block));
        }
        Ok(Bytes::from(out))
    }

    fn is_established(&self) -> bool {
        self.established
    }

    fn security_level(&self) -> SecurityLevel {
        SecurityLevel::new(true, true, true)
    }

    fn close(&mut self) -> Result<(), SecureChannelError> {
        self.established = false;
        Ok(())
    }
}

/// Provider handing out [`MockChannel`]s, optionally failing after a number of handshakes
#[derive(Debug, Default)]
pub struct MockProvider {
    handshakes: AtomicUsize,
    succeed: Option<usize>,
}

impl MockProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Only the first `count` handshakes succeed
    pub fn succeeding(count: usize) -> Self {
        Self {
            handshakes: AtomicUsize::new(0),
            succeed: Some(count),
        }
    }
}

impl SecureChannelProvider for MockProvider {
    fn create_secure_channel(
        &self,
        _transport: &mut dyn CardTransport,
    ) -> Result<Box<dyn SecureChannel>, SecureChannelError> {
        let handshake = self.handshakes.fetch_add(1, Ordering::SeqCst);
        if self.succeed.is_some_and(|count| handshake >= count) {
            return Err(SecureChannelError::AuthenticationFailed("handshake refused"));
        }
        Ok(Box::new(MockChannel { established: true }))
    }
}

/// Session over `card` with the mock secure channel open
///
/// The script must start with the SELECT response.
pub fn secure_session(card: MockCard) -> SecurityDomainSession<MockCard> {
    init_tracing();
    SecurityDomainSession::new(
        card,
        SecurityDomainConfig::default(),
        Some(Box::new(MockProvider::new())),
    )
    .expect("session")
}

/// Session over `card` working in the clear
pub fn clear_session(card: MockCard) -> SecurityDomainSession<MockCard> {
    init_tracing();
    SecurityDomainSession::new(card, SecurityDomainConfig::default(), None).expect("session")
}
