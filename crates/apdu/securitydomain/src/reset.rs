//! Reset by blocking
//!
//! Without knowing any authentication secrets, every provisioned key is driven
//! into the blocked state by sending authentication attempts that are
//! guaranteed to fail. The card treats a blocked key set as absent, so the
//! Security Domain can be provisioned again from scratch.

use derive_more::Display;
use sdtoken_apdu_core::{ApduCommand, CardExecutor, CardTransport};
use tracing::{debug, trace, warn};

use crate::Error;
use crate::commands::BlockingAttemptCommand;
use crate::constants::{ins, kid};
use crate::keys::KeyRef;

/// How authentication attempts are simulated for a kind of key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum BlockingStrategy {
    /// SCP03 key set, attacked with INITIALIZE UPDATE on the wildcard reference
    Symmetric,
    /// SCP11a and SCP11c key pairs, attacked with EXTERNAL AUTHENTICATE
    EcAuthExternal,
    /// SCP11b key pair, attacked with INTERNAL AUTHENTICATE
    EcAuthInternal,
    /// OCE and CA public keys, attacked with PERFORM SECURITY OPERATION
    CertificateAuthority,
    /// Keys that cannot be blocked this way and are left alone
    Unsupported,
}

impl BlockingStrategy {
    /// Classify a key reference by its identifier
    pub const fn for_key(key_ref: KeyRef) -> Self {
        match key_ref.kid() {
            kid::SCP03 => Self::Symmetric,
            kid::SCP11A | kid::SCP11C => Self::EcAuthExternal,
            kid::SCP11B => Self::EcAuthInternal,
            kid::OCE | kid::OCE_CA_FIRST..=kid::OCE_CA_LAST => Self::CertificateAuthority,
            _ => Self::Unsupported,
        }
    }

    /// Instruction and target reference for one attempt, `None` when the key is skipped
    pub const fn attempt(&self, key_ref: KeyRef) -> Option<(u8, KeyRef)> {
        match self {
            Self::Symmetric => Some((ins::INITIALIZE_UPDATE, KeyRef::new(0, 0))),
            Self::EcAuthExternal => Some((ins::EXTERNAL_AUTHENTICATE, key_ref)),
            Self::EcAuthInternal => Some((ins::INTERNAL_AUTHENTICATE, key_ref)),
            Self::CertificateAuthority => Some((ins::PERFORM_SECURITY_OPERATION, key_ref)),
            Self::Unsupported => None,
        }
    }
}

/// What happened to a single key during reset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum ResetOutcome {
    /// The card reported the key blocked after this many attempts
    #[display("blocked after {attempts} attempts")]
    Blocked {
        /// Attempts sent, including the one that reported the block
        attempts: usize,
    },
    /// The attempt ceiling was reached without a block being reported
    #[display("gave up after {attempts} attempts")]
    GaveUp {
        /// Attempts sent
        attempts: usize,
    },
    /// The key kind cannot be blocked with failed authentications
    #[display("skipped")]
    Skipped,
    /// The key could not be attacked at all
    #[display("rejected")]
    Rejected,
}

impl ResetOutcome {
    /// Number of attempts sent for the key
    pub const fn attempts(&self) -> usize {
        match self {
            Self::Blocked { attempts } | Self::GaveUp { attempts } => *attempts,
            Self::Skipped | Self::Rejected => 0,
        }
    }
}

/// Per key outcomes of a reset, in enumeration order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResetReport {
    entries: Vec<(KeyRef, ResetOutcome)>,
}

impl ResetReport {
    /// All `(key, outcome)` entries
    pub fn entries(&self) -> &[(KeyRef, ResetOutcome)] {
        &self.entries
    }

    /// Outcome for one key
    pub fn outcome(&self, key_ref: KeyRef) -> Option<ResetOutcome> {
        self.entries
            .iter()
            .find(|(key, _)| *key == key_ref)
            .map(|(_, outcome)| *outcome)
    }

    /// Attempts sent across all keys
    pub fn total_attempts(&self) -> usize {
        self.entries.iter().map(|(_, outcome)| outcome.attempts()).sum()
    }

    /// No key was enumerated
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn push(&mut self, key_ref: KeyRef, outcome: ResetOutcome) {
        self.entries.push((key_ref, outcome));
    }
}

/// Send failing authentications for `key_ref` until the card blocks it or `ceiling` is hit
///
/// Transport errors count against the ceiling and never abort the loop.
pub(crate) fn block_key<T: CardTransport>(
    executor: &mut CardExecutor<T>,
    key_ref: KeyRef,
    ceiling: usize,
) -> ResetOutcome {
    if key_ref.is_wildcard() {
        warn!(%key_ref, "Card reported a wildcard key reference, not attacking it");
        return ResetOutcome::Rejected;
    }

    let strategy = BlockingStrategy::for_key(key_ref);
    let Some((ins, target)) = strategy.attempt(key_ref) else {
        debug!(%key_ref, %strategy, "Key cannot be blocked, skipping");
        return ResetOutcome::Skipped;
    };

    let command = BlockingAttemptCommand::new(ins, target).to_command();
    for attempt in 1..=ceiling {
        match executor.transmit(&command) {
            Ok(response) => {
                let sw = response.status();
                if sw.is_authentication_method_blocked() || sw.is_security_condition_not_satisfied() {
                    return ResetOutcome::Blocked { attempts: attempt };
                }
                if sw.is_incorrect_data() || sw.is_success() {
                    trace!(%key_ref, attempt, %sw, "Inconclusive attempt");
                } else {
                    debug!(%key_ref, attempt, %sw, "Unexpected status during blocking");
                }
            }
            Err(e) => {
                let error = Error::from(e);
                if error.is_precondition() {
                    warn!(%key_ref, %error, "Blocking attempt rejected before transmission");
                    return ResetOutcome::Rejected;
                }
                warn!(%key_ref, attempt, %error, "Blocking attempt failed, continuing");
            }
        }
    }

    ResetOutcome::GaveUp { attempts: ceiling }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strategy_classification() {
        let cases = [
            (0x01, BlockingStrategy::Symmetric),
            (0x02, BlockingStrategy::Unsupported),
            (0x03, BlockingStrategy::Unsupported),
            (0x10, BlockingStrategy::CertificateAuthority),
            (0x11, BlockingStrategy::EcAuthExternal),
            (0x13, BlockingStrategy::EcAuthInternal),
            (0x15, BlockingStrategy::EcAuthExternal),
            (0x20, BlockingStrategy::CertificateAuthority),
            (0x2F, BlockingStrategy::CertificateAuthority),
            (0x30, BlockingStrategy::Unsupported),
        ];
        for (kid, expected) in cases {
            assert_eq!(BlockingStrategy::for_key(KeyRef::new(kid, 0x01)), expected, "kid {kid:#04x}");
        }
    }

    #[test]
    fn test_strategy_attempts() {
        let scp03 = KeyRef::new(0x01, 0xFF);
        assert_eq!(
            BlockingStrategy::Symmetric.attempt(scp03),
            Some((ins::INITIALIZE_UPDATE, KeyRef::new(0, 0)))
        );

        let scp11b = KeyRef::new(0x13, 0x01);
        assert_eq!(
            BlockingStrategy::EcAuthInternal.attempt(scp11b),
            Some((ins::INTERNAL_AUTHENTICATE, scp11b))
        );
        assert_eq!(BlockingStrategy::Unsupported.attempt(scp11b), None);
    }

    #[test]
    fn test_report() {
        let mut report = ResetReport::default();
        assert!(report.is_empty());

        report.push(KeyRef::new(0x01, 0xFF), ResetOutcome::Blocked { attempts: 3 });
        report.push(KeyRef::new(0x02, 0xFF), ResetOutcome::Skipped);
        report.push(KeyRef::new(0x13, 0x01), ResetOutcome::GaveUp { attempts: 65 });

        assert_eq!(report.total_attempts(), 68);
        assert_eq!(report.outcome(KeyRef::new(0x02, 0xFF)), Some(ResetOutcome::Skipped));
        assert_eq!(report.outcome(KeyRef::new(0x10, 0x01)), None);
        assert_eq!(ResetOutcome::GaveUp { attempts: 65 }.to_string(), "gave up after 65 attempts");
    }
}
