//! Configuration options for a Security Domain session

use bytes::Bytes;
use sdtoken_apdu_core::executor::DEFAULT_MAX_RESPONSE_CHAINS;

use crate::constants::{DEFAULT_BLOCK_ATTEMPTS, SECURITY_DOMAIN_AID};

/// Configuration options for a Security Domain session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecurityDomainConfig {
    /// Application identifier selected on initialization
    pub aid: Bytes,

    /// Failed authentication attempts sent per key during reset
    pub block_attempts: usize,

    /// Maximum GET RESPONSE round trips for one command
    pub max_response_chains: usize,
}

impl Default for SecurityDomainConfig {
    fn default() -> Self {
        Self {
            aid: Bytes::from_static(&SECURITY_DOMAIN_AID),
            block_attempts: DEFAULT_BLOCK_ATTEMPTS,
            max_response_chains: DEFAULT_MAX_RESPONSE_CHAINS,
        }
    }
}

impl SecurityDomainConfig {
    /// Create a new default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the application identifier
    pub fn with_aid(mut self, aid: impl Into<Bytes>) -> Self {
        self.aid = aid.into();
        self
    }

    /// Set the reset attempt ceiling
    pub const fn with_block_attempts(mut self, block_attempts: usize) -> Self {
        self.block_attempts = block_attempts;
        self
    }

    /// Set the GET RESPONSE chain limit
    pub const fn with_max_response_chains(mut self, max_response_chains: usize) -> Self {
        self.max_response_chains = max_response_chains;
        self
    }
}
