//! Ledger RPC contract
//!
//! The ledger is an external collaborator. It mints ephemeral anchors,
//! holds durable nonce values and decides the fate of every submission.

use crate::core::{CodecError, RecencyAnchor};
use crate::crypto::{Address, Hash};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Default interval between status polls while confirming
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Final fate of a submission
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    Confirmed,
    /// Anchor window elapsed, or the durable value was consumed elsewhere
    Expired,
    Rejected(String),
}

impl Outcome {
    pub fn is_confirmed(&self) -> bool {
        matches!(self, Outcome::Confirmed)
    }
}

/// Errors talking to the ledger
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("Unknown nonce account {0}")]
    UnknownNonceAccount(Address),
    #[error("Unknown submission {0}")]
    UnknownSubmission(String),
    #[error("Submitted bytes are not a transaction: {0}")]
    UndecodableSubmission(CodecError),
    #[error("Unsigned transaction submitted")]
    Unsigned,
    #[error("No outcome for {id} within {timeout:?}")]
    ConfirmTimeout { id: String, timeout: Duration },
    #[error("Ledger unavailable: {0}")]
    Unavailable(String),
}

/// What this crate needs from a ledger node
#[allow(async_fn_in_trait)]
pub trait LedgerRpc {
    /// Submit canonical transaction bytes, returning the submission id
    async fn submit(&self, signed: &[u8]) -> Result<String, LedgerError>;

    /// Current value of a durable nonce account
    async fn get_nonce(&self, account: &Address) -> Result<Hash, LedgerError>;

    /// A fresh ephemeral anchor
    async fn get_recent_anchor(&self) -> Result<RecencyAnchor, LedgerError>;

    /// Outcome of a submission, `None` while still pending
    async fn status(&self, submission_id: &str) -> Result<Option<Outcome>, LedgerError>;

    fn poll_interval(&self) -> Duration {
        DEFAULT_POLL_INTERVAL
    }

    /// Wait for a submission's outcome, bounded by `timeout`
    async fn confirm(
        &self,
        submission_id: &str,
        timeout: Duration,
    ) -> Result<Outcome, LedgerError> {
        let wait = async {
            loop {
                match self.status(submission_id).await {
                    Ok(Some(outcome)) => return Ok(outcome),
                    Ok(None) => tokio::time::sleep(self.poll_interval()).await,
                    Err(e) => return Err(e),
                }
            }
        };

        match tokio::time::timeout(timeout, wait).await {
            Ok(result) => result,
            Err(_) => {
                log::warn!("No outcome for {} within {:?}", submission_id, timeout);
                Err(LedgerError::ConfirmTimeout {
                    id: submission_id.to_string(),
                    timeout,
                })
            }
        }
    }
}
