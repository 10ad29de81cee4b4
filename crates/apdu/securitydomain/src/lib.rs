//! Security Domain key lifecycle for smart card tokens
//!
//! This crate drives the GlobalPlatform Security Domain of a token:
//!
//! - Enumerating keys and reading data objects
//! - Importing SCP03 static keys and EC keys, verified by KCV or version echo
//! - Generating EC key pairs on the card
//! - Deleting keys with wildcard filters
//! - Storing allow lists, CA issuers and certificate bundles
//! - Resetting the Security Domain by blocking every key
//!
//! The secure channel handshake is not part of this crate. A
//! [`SecureChannelProvider`](sdtoken_apdu_core::SecureChannelProvider) is
//! injected into the [`SecurityDomainSession`] instead.
#![cfg_attr(not(test), warn(unused_crate_dependencies))]
#![forbid(unsafe_code)]
#![warn(missing_docs, rustdoc::missing_crate_level_docs)]

pub mod commands;
pub mod config;
pub mod constants;
pub mod crypto;
pub mod error;
pub mod keys;
pub mod reset;
pub mod session;
pub mod tlv;

pub use commands::KeyInformation;
pub use config::SecurityDomainConfig;
pub use crypto::{Kcv, kcv, validate_kcv};
pub use error::{Error, Result};
pub use keys::{Curve, EcPrivateKey, EcPublicKey, KeyRef, StaticKeys};
pub use reset::{BlockingStrategy, ResetOutcome, ResetReport};
pub use session::{SecurityDomainSession, SessionState};
pub use tlv::{Tlv, TlvError};

/// Prelude module containing commonly used types
pub mod prelude {
    pub use crate::{
        Curve, EcPrivateKey, EcPublicKey, Error, KeyInformation, KeyRef, ResetOutcome,
        ResetReport, Result, SecurityDomainConfig, SecurityDomainSession, StaticKeys,
    };
}
