//! Security Domain session
//!
//! A session owns the transport for one physical connection. It selects the
//! Security Domain, optionally opens a secure channel through an injected
//! provider, and exposes the key lifecycle operations on top of them.

use std::collections::BTreeMap;

use bytes::Bytes;
use derive_more::Display;
use sdtoken_apdu_core::{
    ApduCommand, CardExecutor, CardTransport, SecureChannelProvider, SecurityLevel,
};
use tracing::{debug, instrument, trace, warn};

use crate::{
    Error, Result,
    commands::{
        DeleteKeyCommand, GenerateKeyCommand, GetDataCommand, KeyInformation, PutKeyCommand,
        SelectCommand, StoreDataCommand,
        get_data::{parse_ca_identifiers, parse_card_recognition_data, parse_key_information},
        put_key::{verify_static_keys_response, verify_version_echo},
    },
    config::SecurityDomainConfig,
    constants::{kid, tags},
    keys::{Curve, EcPrivateKey, EcPublicKey, KeyRef, StaticKeys, ZeroizeGuard},
    reset::{ResetReport, block_key},
    tlv::Tlv,
};

/// Lifecycle state of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum SessionState {
    /// The Security Domain is not selected, or its security context was invalidated
    Uninitialized,
    /// The Security Domain is selected and the secure channel, if any, is open
    Initialized,
}

/// Session with the Security Domain of a token
#[derive(Debug)]
pub struct SecurityDomainSession<T: CardTransport> {
    /// Card executor owning the transport and secure channel
    executor: CardExecutor<T>,
    /// Session configuration
    config: SecurityDomainConfig,
    /// Secure channel provider used on (re)initialization
    provider: Option<Box<dyn SecureChannelProvider>>,
    /// Current state
    state: SessionState,
}

impl<T: CardTransport> SecurityDomainSession<T> {
    /// Create a session, selecting the Security Domain
    ///
    /// When a provider is given the secure channel is opened as part of
    /// initialization. Without one the session works in the clear, which is
    /// enough for reading data objects and for reset.
    pub fn new(
        transport: T,
        config: SecurityDomainConfig,
        provider: Option<Box<dyn SecureChannelProvider>>,
    ) -> Result<Self> {
        let executor =
            CardExecutor::new(transport).with_max_response_chains(config.max_response_chains);
        let mut session = Self {
            executor,
            config,
            provider,
            state: SessionState::Uninitialized,
        };
        session.initialize()?;
        Ok(session)
    }

    /// Get a reference to the underlying transport
    pub const fn transport(&self) -> &T {
        self.executor.transport()
    }

    /// Session configuration
    pub const fn config(&self) -> &SecurityDomainConfig {
        &self.config
    }

    /// Current lifecycle state
    pub const fn state(&self) -> SessionState {
        self.state
    }

    /// Whether an established secure channel protects the session
    pub fn has_secure_channel(&self) -> bool {
        self.executor.has_secure_channel()
    }

    /// Security level of the current channel
    pub fn security_level(&self) -> SecurityLevel {
        self.executor.security_level()
    }

    /// Authenticate with a new provider, replacing the current channel
    ///
    /// The provider is kept and used again when the session reinitializes.
    pub fn open_secure_channel(&mut self, provider: Box<dyn SecureChannelProvider>) -> Result<()> {
        self.ensure_initialized()?;
        self.executor.open_secure_channel(provider.as_ref())?;
        self.provider = Some(provider);
        Ok(())
    }

    /// Read a data object
    #[instrument(level = "debug", skip(self, data))]
    pub fn get_data(&mut self, tag: u16, data: Option<&[u8]>) -> Result<Bytes> {
        self.ensure_initialized()?;
        let command = match data {
            Some(data) => GetDataCommand::with_data(tag, Bytes::copy_from_slice(data)),
            None => GetDataCommand::new(tag),
        };
        let response = self.send(&command)?;
        trace!(len = response.len(), "Data object read");
        Ok(response)
    }

    /// Enumerate every key provisioned on the card
    pub fn get_key_information(&mut self) -> Result<KeyInformation> {
        match not_found_as_none(self.get_data(tags::KEY_INFORMATION, None))? {
            Some(data) => parse_key_information(&data),
            None => Ok(KeyInformation::new()),
        }
    }

    /// Read the card recognition data
    pub fn get_card_recognition_data(&mut self) -> Result<Bytes> {
        let data = self.get_data(tags::CARD_RECOGNITION_DATA, None)?;
        parse_card_recognition_data(&data)
    }

    /// Read the CA subject key identifiers known to the card
    ///
    /// `kloc` selects identifiers for key loading OCE certificates and `klcc`
    /// those for key loading card certificates.
    pub fn get_supported_ca_identifiers(
        &mut self,
        kloc: bool,
        klcc: bool,
    ) -> Result<BTreeMap<KeyRef, Bytes>> {
        if !kloc && !klcc {
            return Err(Error::InvalidArgument("at least one of kloc and klcc must be set"));
        }

        let selected = [(kloc, tags::CA_KLOC_IDENTIFIERS), (klcc, tags::CA_KLCC_IDENTIFIERS)];
        let mut identifiers = BTreeMap::new();
        for (_, tag) in selected.into_iter().filter(|(wanted, _)| *wanted) {
            if let Some(data) = not_found_as_none(self.get_data(tag, None))? {
                identifiers.extend(parse_ca_identifiers(&data)?);
            }
        }
        Ok(identifiers)
    }

    /// Read the certificate chain stored for `key_ref`, as raw DER objects in stored order
    pub fn get_certificate_bundle(&mut self, key_ref: KeyRef) -> Result<Vec<Bytes>> {
        let selector = key_ref.control_reference()?;
        match not_found_as_none(self.get_data(tags::CERTIFICATE_STORE, Some(&selector[..])))? {
            Some(data) => Ok(Tlv::split_raw(&data)?),
            None => Ok(Vec::new()),
        }
    }

    /// Import an SCP03 static key set
    ///
    /// The keys are wrapped under the session DEK and verified against the
    /// KCVs the card returns. `keys` is zeroed before this returns, whatever
    /// the outcome.
    #[instrument(level = "debug", skip_all, fields(key_ref = %key_ref))]
    pub fn put_static_keys(
        &mut self,
        key_ref: KeyRef,
        keys: &mut StaticKeys,
        replace_kvn: u8,
    ) -> Result<()> {
        let keys = ZeroizeGuard::new(keys);
        if key_ref.kid() != kid::SCP03 {
            return Err(Error::InvalidKeyRef(key_ref, "static keys use the SCP03 key identifier"));
        }
        self.ensure_initialized()?;
        self.require_secure_channel()?;

        let executor = &self.executor;
        let command = PutKeyCommand::static_keys(key_ref, replace_kvn, &keys, |key| {
            Ok(executor.encrypt_sensitive(key)?)
        })?;
        let response = self.send(&command)?;
        verify_static_keys_response(&response, key_ref.kvn(), &keys)?;

        debug!("Static keys imported");
        Ok(())
    }

    /// Import an EC public key, such as an OCE CA key
    #[instrument(level = "debug", skip_all, fields(key_ref = %key_ref))]
    pub fn put_ec_public_key(
        &mut self,
        key_ref: KeyRef,
        key: &EcPublicKey,
        replace_kvn: u8,
    ) -> Result<()> {
        require_ec_key_ref(key_ref)?;
        let command = PutKeyCommand::ec_public_key(key_ref, replace_kvn, key)?;
        self.ensure_initialized()?;

        let response = self.send(&command)?;
        verify_version_echo(&response, key_ref.kvn())?;

        debug!("EC public key imported");
        Ok(())
    }

    /// Import an EC private key
    ///
    /// The scalar is wrapped under the session DEK. `key` is zeroed before
    /// this returns, whatever the outcome.
    #[instrument(level = "debug", skip_all, fields(key_ref = %key_ref))]
    pub fn put_ec_private_key(
        &mut self,
        key_ref: KeyRef,
        key: &mut EcPrivateKey,
        replace_kvn: u8,
    ) -> Result<()> {
        let key = ZeroizeGuard::new(key);
        require_ec_key_ref(key_ref)?;
        key.curve().require_supported()?;
        self.ensure_initialized()?;
        self.require_secure_channel()?;

        let executor = &self.executor;
        let command = PutKeyCommand::ec_private_key(key_ref, replace_kvn, &key, |scalar| {
            Ok(executor.encrypt_sensitive(scalar)?)
        })?;
        let response = self.send(&command)?;
        verify_version_echo(&response, key_ref.kvn())?;

        debug!("EC private key imported");
        Ok(())
    }

    /// Generate a P-256 key pair on the card and return its public key
    #[instrument(level = "debug", skip_all, fields(key_ref = %key_ref, replace_kvn))]
    pub fn generate_ec_key(&mut self, key_ref: KeyRef, replace_kvn: u8) -> Result<EcPublicKey> {
        require_ec_key_ref(key_ref)?;
        let command = GenerateKeyCommand::ec(key_ref, replace_kvn, Curve::P256)?;
        self.ensure_initialized()?;

        let response = self.send(&command)?;
        let key = GenerateKeyCommand::parse_response(Curve::P256, &response)?;
        debug!("EC key pair generated");
        Ok(key)
    }

    /// Delete the keys matching `key_ref`, where a zero KID or KVN matches any
    #[instrument(level = "debug", skip_all, fields(key_ref = %key_ref, delete_last))]
    pub fn delete_key(&mut self, key_ref: KeyRef, delete_last: bool) -> Result<()> {
        let command = DeleteKeyCommand::new(key_ref, delete_last)?;
        self.ensure_initialized()?;
        self.send(&command)?;
        debug!("Keys deleted");
        Ok(())
    }

    /// Store a pre-encoded BER-TLV payload
    pub fn store_data(&mut self, data: impl Into<Bytes>) -> Result<()> {
        self.ensure_initialized()?;
        self.send(&StoreDataCommand::new(data))?;
        Ok(())
    }

    /// Restrict the OCE certificates accepted for `key_ref` to the given serial numbers
    ///
    /// An empty list clears the allow list.
    #[instrument(level = "debug", skip_all, fields(key_ref = %key_ref, count = serials.len()))]
    pub fn store_allowlist<S: AsRef<[u8]>>(&mut self, key_ref: KeyRef, serials: &[S]) -> Result<()> {
        self.ensure_initialized()?;
        self.send(&StoreDataCommand::allowlist(key_ref, serials)?)?;
        Ok(())
    }

    /// Record the subject key identifier of the CA that issued `key_ref`'s certificate
    #[instrument(level = "debug", skip_all, fields(key_ref = %key_ref))]
    pub fn store_ca_issuer(&mut self, key_ref: KeyRef, ski: &[u8]) -> Result<()> {
        self.ensure_initialized()?;
        debug!(ski = %hex::encode(ski), "Storing CA issuer");
        self.send(&StoreDataCommand::ca_issuer(key_ref, ski)?)?;
        Ok(())
    }

    /// Store the certificate chain for `key_ref`, leaf certificate last
    #[instrument(level = "debug", skip_all, fields(key_ref = %key_ref))]
    pub fn store_certificate_bundle<C: AsRef<[u8]>>(
        &mut self,
        key_ref: KeyRef,
        certificates: &[C],
    ) -> Result<()> {
        self.ensure_initialized()?;
        self.send(&StoreDataCommand::certificate_bundle(key_ref, certificates)?)?;
        Ok(())
    }

    /// Block every provisioned key, then reinitialize the session
    ///
    /// Each key receives failing authentication attempts until the card
    /// reports it blocked or the configured ceiling is reached. Individual
    /// attempt failures never abort the run. If the Security Domain cannot be
    /// selected afterwards, the report travels in [`Error::ResetIncomplete`].
    #[instrument(level = "debug", skip(self))]
    pub fn reset(&mut self) -> Result<ResetReport> {
        self.ensure_initialized()?;

        let keys = self.get_key_information()?;
        let mut report = ResetReport::default();
        if keys.is_empty() {
            debug!("No keys provisioned, nothing to reset");
            return Ok(report);
        }

        for key_ref in keys.into_keys() {
            let outcome = block_key(&mut self.executor, key_ref, self.config.block_attempts);
            debug!(%key_ref, %outcome, "Key processed");
            report.push(key_ref, outcome);
        }

        if let Err(e) = self.reinitialize() {
            warn!(error = %e, keys = report.entries().len(), "Reinitialization after reset failed");
            return Err(Error::ResetIncomplete {
                report,
                source: Box::new(e),
            });
        }
        Ok(report)
    }

    /// Close the secure channel and hand the transport back
    pub fn close(mut self) -> T {
        if let Err(e) = self.executor.close_secure_channel() {
            warn!(error = %e, "Failed to close secure channel");
        }
        self.executor.into_transport()
    }

    fn initialize(&mut self) -> Result<()> {
        debug!(aid = %hex::encode(&self.config.aid), "Selecting Security Domain");
        let select = SelectCommand::by_aid(self.config.aid.clone());
        self.send(&select)?;

        if let Some(provider) = self.provider.as_deref() {
            self.executor.open_secure_channel(provider)?;
        }

        self.state = SessionState::Initialized;
        Ok(())
    }

    /// Start over after the card's security context was invalidated
    ///
    /// The provider's keys were just blocked, so failing to authenticate
    /// again leaves the session initialized in the clear.
    fn reinitialize(&mut self) -> Result<()> {
        self.executor.discard_secure_channel();
        self.state = SessionState::Uninitialized;

        let select = SelectCommand::by_aid(self.config.aid.clone());
        self.send(&select)?;

        if let Some(provider) = self.provider.as_deref() {
            if let Err(e) = self.executor.open_secure_channel(provider) {
                warn!(error = %e, "Could not reopen secure channel after reset");
            }
        }

        self.state = SessionState::Initialized;
        Ok(())
    }

    fn ensure_initialized(&mut self) -> Result<()> {
        match self.state {
            SessionState::Initialized => Ok(()),
            SessionState::Uninitialized => self.initialize(),
        }
    }

    fn require_secure_channel(&self) -> Result<()> {
        if self.executor.has_secure_channel() {
            Ok(())
        } else {
            Err(Error::NoSecureChannel)
        }
    }

    /// Send a command and return its payload, mapping error statuses to [`Error::Status`]
    fn send(&mut self, command: &impl ApduCommand) -> Result<Bytes> {
        let response = self.executor.transmit(&command.to_command())?;
        response
            .into_bytes_result()
            .map_err(|e| Error::Status(e.status))
    }
}

/// EC keys cannot live in the SCP03 slots
fn require_ec_key_ref(key_ref: KeyRef) -> Result<()> {
    if key_ref.kid() == 0 || key_ref.is_scp03() {
        return Err(Error::InvalidKeyRef(key_ref, "not an EC key identifier"));
    }
    Ok(())
}

/// Treat a missing data object as absent rather than as an error
fn not_found_as_none<V>(result: Result<V>) -> Result<Option<V>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(Error::Status(sw)) if sw.is_referenced_data_not_found() => Ok(None),
        Err(e) => Err(e),
    }
}
