//! Crate-level error
//!
//! Every failure answers one question for the user: did anything reach the
//! ledger? Only failures after a submission was attempted can have landed.

use crate::core::{BuildError, LifecycleError};
use crate::crypto::KeyError;
use crate::keystore::KeyStoreError;
use crate::ledger::{BroadcastError, LedgerError};
use crate::multisig::MultisigError;
use crate::relay::{HandoffError, RelayError};
use crate::signing::SigningError;
use thiserror::Error;

/// Failure class, in the order a transaction meets them
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Local programming error; never retried
    Construction,
    /// Wrong key offered; skip it
    Signing,
    /// Handoff must be aborted
    Relay,
    /// More signatures needed before broadcast
    Completeness,
    /// The ledger answered or could not be reached
    Ledger,
    /// Keys, files, configuration
    Environment,
}

#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("Build error: {0}")]
    BuildError(#[from] BuildError),
    #[error("Signing error: {0}")]
    SigningError(#[from] SigningError),
    #[error("Relay error: {0}")]
    RelayError(#[from] RelayError),
    #[error("Handoff error: {0}")]
    HandoffError(#[from] HandoffError),
    #[error("Broadcast error: {0}")]
    BroadcastError(#[from] BroadcastError),
    #[error("Ledger error: {0}")]
    LedgerError(#[from] LedgerError),
    #[error("Multisig error: {0}")]
    MultisigError(#[from] MultisigError),
    #[error("Key store error: {0}")]
    KeyStoreError(#[from] KeyStoreError),
    #[error("Lifecycle error: {0}")]
    LifecycleError(#[from] LifecycleError),
    #[error("Crypto error: {0}")]
    CryptoError(#[from] KeyError),
}

impl ProtocolError {
    pub fn class(&self) -> ErrorClass {
        match self {
            ProtocolError::BuildError(_) | ProtocolError::LifecycleError(_) => {
                ErrorClass::Construction
            }
            ProtocolError::SigningError(SigningError::UnexpectedSigner(_)) => ErrorClass::Signing,
            ProtocolError::SigningError(_)
            | ProtocolError::RelayError(_)
            | ProtocolError::HandoffError(_) => ErrorClass::Relay,
            ProtocolError::BroadcastError(BroadcastError::IncompleteSignatures { .. }) => {
                ErrorClass::Completeness
            }
            ProtocolError::BroadcastError(BroadcastError::LifecycleError(_)) => {
                ErrorClass::Construction
            }
            ProtocolError::BroadcastError(BroadcastError::LedgerError(_))
            | ProtocolError::LedgerError(_) => ErrorClass::Ledger,
            ProtocolError::MultisigError(_)
            | ProtocolError::KeyStoreError(_)
            | ProtocolError::CryptoError(_) => ErrorClass::Environment,
        }
    }

    /// A submission may have reached the ledger; check before retrying
    pub fn may_have_landed(&self) -> bool {
        let ledger = match self {
            ProtocolError::LedgerError(e) => e,
            ProtocolError::BroadcastError(BroadcastError::LedgerError(e)) => e,
            _ => return false,
        };
        matches!(
            ledger,
            LedgerError::ConfirmTimeout { .. } | LedgerError::Unavailable(_)
        )
    }

    /// Nothing reached the ledger; retrying cannot double-apply
    pub fn is_safe_to_retry(&self) -> bool {
        !self.may_have_landed()
    }
}
