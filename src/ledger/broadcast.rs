//! Broadcast, confirmation and recovery
//!
//! Broadcast refuses incomplete transactions before any ledger call. Once
//! broadcast, a transaction cannot be recalled; only its outcome can be
//! awaited, and that wait is always bounded. When it runs out the anchor
//! decides what to do next.

use crate::core::{
    codec, LifecycleError, RecencyAnchor, TrackedTransaction, Transaction, TxStatus,
};
use crate::crypto::Address;
use crate::ledger::rpc::{LedgerError, LedgerRpc, Outcome};
use crate::multisig::MultisigResolver;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BroadcastError {
    #[error("Incomplete signatures: waiting on {}", format_outstanding(.outstanding))]
    IncompleteSignatures { outstanding: Vec<Address> },
    #[error("Ledger error: {0}")]
    LedgerError(#[from] LedgerError),
    #[error("Lifecycle error: {0}")]
    LifecycleError(#[from] LifecycleError),
}

fn format_outstanding(outstanding: &[Address]) -> String {
    outstanding
        .iter()
        .map(|a| a.short())
        .collect::<Vec<_>>()
        .join(", ")
}

/// What to do after a confirmation wait ran out
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryAction {
    /// The anchor is still live; resubmitting the same bytes is safe
    Resubmit,
    /// The anchor is dead; fetch a fresh one, rebuild and re-sign
    Rebuild,
}

/// Submit a complete transaction, returning the submission id
pub async fn broadcast<L: LedgerRpc>(
    ledger: &L,
    resolver: &MultisigResolver<'_>,
    tx: &Transaction,
) -> Result<String, BroadcastError> {
    let outstanding = resolver.outstanding(tx);
    if !outstanding.is_empty() {
        return Err(BroadcastError::IncompleteSignatures {
            outstanding: outstanding.iter().map(|r| *r.address()).collect(),
        });
    }

    let id = ledger.submit(&codec::encode_transaction(tx)).await?;
    log::info!(
        "Broadcast {} ({} anchor) as {}",
        tx.message().digest(),
        tx.message().anchor().kind(),
        id
    );
    Ok(id)
}

/// Broadcast a tracked transaction and record the submission
pub async fn broadcast_tracked<L: LedgerRpc>(
    ledger: &L,
    resolver: &MultisigResolver<'_>,
    tracked: &mut TrackedTransaction,
) -> Result<String, BroadcastError> {
    if tracked.status() != TxStatus::Complete {
        let tx = tracked.transaction().clone();
        let complete = resolver.is_complete(&tx);
        tracked.record_signatures(tx, complete)?;
    }
    let id = broadcast(ledger, resolver, tracked.transaction()).await?;
    tracked.mark_broadcast(id.clone())?;
    Ok(id)
}

/// Wait (bounded) for the outcome and move the tracked transaction to it
///
/// A timeout leaves the status at `Broadcast`: the transaction may yet land.
pub async fn await_outcome<L: LedgerRpc>(
    ledger: &L,
    tracked: &mut TrackedTransaction,
    timeout: Duration,
) -> Result<Outcome, BroadcastError> {
    let id = match tracked.submission_id() {
        Some(id) => id.to_string(),
        None => {
            return Err(LifecycleError::InvalidTransition {
                from: tracked.status(),
                to: TxStatus::Confirmed,
            }
            .into())
        }
    };

    let outcome = ledger.confirm(&id, timeout).await?;
    match &outcome {
        Outcome::Confirmed => tracked.mark_confirmed()?,
        Outcome::Expired => tracked.mark_expired()?,
        Outcome::Rejected(_) => tracked.mark_rejected()?,
    }
    Ok(outcome)
}

/// Decide between resubmitting and rebuilding
///
/// Ephemeral anchors are judged by the clock; durable anchors by re-reading
/// the nonce account, since only the ledger knows whether the value lives.
pub async fn recovery_action<L: LedgerRpc>(
    ledger: &L,
    anchor: &RecencyAnchor,
    now: DateTime<Utc>,
    window: ChronoDuration,
) -> Result<RecoveryAction, LedgerError> {
    let live = match anchor {
        RecencyAnchor::Ephemeral { .. } => anchor.is_valid_within(now, window),
        RecencyAnchor::Durable { nonce_account, .. } => {
            let current = ledger.get_nonce(nonce_account).await?;
            anchor.matches_live_value(&current)
        }
    };

    let action = if live {
        RecoveryAction::Resubmit
    } else {
        RecoveryAction::Rebuild
    };
    log::info!("Recovery for {} anchor: {:?}", anchor.kind(), action);
    Ok(action)
}
