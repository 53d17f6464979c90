//! Transaction lifecycle tracking
//!
//! `Built → PartiallySigned → Complete → Broadcast → Confirmed | Expired | Rejected`
//!
//! No transition re-enters `Built`; a structural change means building a
//! new transaction.

use crate::core::transaction::Transaction;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Status of a transaction instance
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum TxStatus {
    /// Built, no signatures yet
    Built,
    /// At least one signature, not yet complete
    PartiallySigned,
    /// Every required signature (or multisig threshold) present
    Complete,
    /// Submitted to the ledger; can no longer be cancelled
    Broadcast,
    /// Accepted by the ledger
    Confirmed,
    /// Anchor window elapsed or durable value consumed elsewhere
    Expired,
    /// Ledger-level validation failure
    Rejected,
}

impl TxStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TxStatus::Confirmed | TxStatus::Expired | TxStatus::Rejected
        )
    }

    /// Whether the ledger may have seen this transaction
    pub fn may_have_landed(&self) -> bool {
        matches!(
            self,
            TxStatus::Broadcast | TxStatus::Confirmed | TxStatus::Rejected
        )
    }

    /// Whether moving to `next` is a legal step
    pub fn can_transition_to(&self, next: TxStatus) -> bool {
        use TxStatus::*;
        matches!(
            (self, next),
            (Built, PartiallySigned)
                | (Built, Complete)
                | (PartiallySigned, PartiallySigned)
                | (PartiallySigned, Complete)
                | (Complete, Complete)
                | (Complete, Broadcast)
                | (Broadcast, Confirmed)
                | (Broadcast, Expired)
                | (Broadcast, Rejected)
        )
    }
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum LifecycleError {
    #[error("Invalid transition from {from:?} to {to:?}")]
    InvalidTransition { from: TxStatus, to: TxStatus },
    #[error("Transaction is structurally different from the tracked one")]
    StructureChanged,
}

/// A transaction instance together with where it is in its lifecycle
#[derive(Clone, Debug)]
pub struct TrackedTransaction {
    tx: Transaction,
    status: TxStatus,
    submission_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TrackedTransaction {
    /// Start tracking a freshly built (or received) transaction
    pub fn new(tx: Transaction, status: TxStatus) -> Self {
        let now = Utc::now();
        Self {
            tx,
            status,
            submission_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn transaction(&self) -> &Transaction {
        &self.tx
    }

    pub fn status(&self) -> TxStatus {
        self.status
    }

    pub fn submission_id(&self) -> Option<&str> {
        self.submission_id.as_deref()
    }

    fn transition(&mut self, next: TxStatus) -> Result<(), LifecycleError> {
        if !self.status.can_transition_to(next) {
            return Err(LifecycleError::InvalidTransition {
                from: self.status,
                to: next,
            });
        }
        if self.status != next {
            log::info!(
                "Transaction {} {:?} -> {:?}",
                self.tx.message().digest(),
                self.status,
                next
            );
        }
        self.status = next;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Replace the transaction with a more-signed copy of the same message
    ///
    /// `complete` is the caller's completeness verdict for `signed`.
    pub fn record_signatures(
        &mut self,
        signed: Transaction,
        complete: bool,
    ) -> Result<(), LifecycleError> {
        if !self.tx.is_structurally_identical(&signed) {
            return Err(LifecycleError::StructureChanged);
        }
        let next = if complete {
            TxStatus::Complete
        } else if signed.signature_count() > 0 {
            TxStatus::PartiallySigned
        } else {
            self.status
        };
        if next != self.status {
            self.transition(next)?;
        }
        self.tx = signed;
        Ok(())
    }

    pub fn mark_broadcast(&mut self, submission_id: String) -> Result<(), LifecycleError> {
        self.transition(TxStatus::Broadcast)?;
        self.submission_id = Some(submission_id);
        Ok(())
    }

    pub fn mark_confirmed(&mut self) -> Result<(), LifecycleError> {
        self.transition(TxStatus::Confirmed)
    }

    pub fn mark_expired(&mut self) -> Result<(), LifecycleError> {
        self.transition(TxStatus::Expired)
    }

    pub fn mark_rejected(&mut self) -> Result<(), LifecycleError> {
        self.transition(TxStatus::Rejected)
    }
}
