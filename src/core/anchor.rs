//! Recency anchors
//!
//! Every transaction commits to a recent value the ledger can check:
//! - `Ephemeral`: a recent blockhash, accepted only for a short window.
//! - `Durable`: the current value stored in a nonce account. It never
//!   expires on a timer but is consumed, exactly once, by the first
//!   transaction that lands against it.
//!
//! A durable anchor cannot be validated locally. Only re-reading the nonce
//! account (or submitting) reveals whether the value is still live.

use crate::core::instruction::Instruction;
use crate::core::programs;
use crate::crypto::{Address, Hash};
use chrono::{DateTime, Duration, Utc};

/// How long an ephemeral anchor stays acceptable to the ledger
pub const EPHEMERAL_VALIDITY_SECS: i64 = 90;

/// Proof that a transaction was built recently enough to be accepted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecencyAnchor {
    /// A recent blockhash and when the ledger issued it (unix millis)
    Ephemeral { blockhash: Hash, issued_at_ms: i64 },
    /// A nonce account's current value and the key allowed to advance it
    Durable {
        nonce_account: Address,
        value: Hash,
        authority: Address,
    },
}

impl RecencyAnchor {
    pub fn ephemeral(blockhash: Hash, issued_at: DateTime<Utc>) -> Self {
        RecencyAnchor::Ephemeral {
            blockhash,
            issued_at_ms: issued_at.timestamp_millis(),
        }
    }

    /// `value` must be fetched immediately before building
    pub fn durable(nonce_account: Address, value: Hash, authority: Address) -> Self {
        RecencyAnchor::Durable {
            nonce_account,
            value,
            authority,
        }
    }

    pub fn is_durable(&self) -> bool {
        matches!(self, RecencyAnchor::Durable { .. })
    }

    /// The hash the message commits to
    pub fn recent_hash(&self) -> &Hash {
        match self {
            RecencyAnchor::Ephemeral { blockhash, .. } => blockhash,
            RecencyAnchor::Durable { value, .. } => value,
        }
    }

    pub fn nonce_account(&self) -> Option<&Address> {
        match self {
            RecencyAnchor::Durable { nonce_account, .. } => Some(nonce_account),
            RecencyAnchor::Ephemeral { .. } => None,
        }
    }

    pub fn issued_at(&self) -> Option<DateTime<Utc>> {
        match self {
            RecencyAnchor::Ephemeral { issued_at_ms, .. } => {
                DateTime::from_timestamp_millis(*issued_at_ms)
            }
            RecencyAnchor::Durable { .. } => None,
        }
    }

    /// Ephemeral anchors: true until the default window has elapsed.
    /// Durable anchors: always true locally; the ledger decides.
    pub fn is_valid_at(&self, time: DateTime<Utc>) -> bool {
        self.is_valid_within(time, Duration::seconds(EPHEMERAL_VALIDITY_SECS))
    }

    pub fn is_valid_within(&self, time: DateTime<Utc>, window: Duration) -> bool {
        match self {
            RecencyAnchor::Ephemeral { .. } => match self.issued_at() {
                Some(issued) => issued
                    .checked_add_signed(window)
                    .map_or(false, |end| time < end),
                None => false,
            },
            RecencyAnchor::Durable { .. } => true,
        }
    }

    /// The instruction that must open any transaction using this anchor
    ///
    /// `None` for ephemeral anchors.
    pub fn advance_instruction(&self) -> Option<Instruction> {
        match self {
            RecencyAnchor::Durable {
                nonce_account,
                authority,
                ..
            } => Some(programs::advance_nonce(nonce_account, authority)),
            RecencyAnchor::Ephemeral { .. } => None,
        }
    }

    /// Whether this durable anchor still matches a freshly read nonce value
    pub fn matches_live_value(&self, live: &Hash) -> bool {
        match self {
            RecencyAnchor::Durable { value, .. } => value == live,
            RecencyAnchor::Ephemeral { .. } => false,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            RecencyAnchor::Ephemeral { .. } => "ephemeral",
            RecencyAnchor::Durable { .. } => "durable",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::KeyPair;

    #[test]
    fn test_ephemeral_window() {
        let issued = Utc::now();
        let anchor = RecencyAnchor::ephemeral(Hash::new_unique(), issued);

        assert!(anchor.is_valid_at(issued));
        assert!(anchor.is_valid_at(issued + Duration::seconds(EPHEMERAL_VALIDITY_SECS - 1)));
        assert!(!anchor.is_valid_at(issued + Duration::seconds(EPHEMERAL_VALIDITY_SECS)));
        assert!(!anchor.is_valid_within(issued + Duration::seconds(10), Duration::seconds(5)));
    }

    #[test]
    fn test_window_end_past_time_range_is_invalid() {
        let last = DateTime::<Utc>::MAX_UTC;
        let anchor = RecencyAnchor::ephemeral(Hash::new_unique(), last);

        assert!(!anchor.is_valid_at(Utc::now()));
        assert!(!anchor.is_valid_within(last, Duration::seconds(1)));
    }

    #[test]
    fn test_durable_has_no_implicit_expiry() {
        let anchor = RecencyAnchor::durable(
            KeyPair::generate().address(),
            Hash::new_unique(),
            KeyPair::generate().address(),
        );
        assert!(anchor.is_valid_at(Utc::now() + Duration::days(365)));
        assert!(anchor.issued_at().is_none());
    }

    #[test]
    fn test_advance_instruction_names_nonce_account() {
        let nonce = KeyPair::generate().address();
        let authority = KeyPair::generate().address();
        let anchor = RecencyAnchor::durable(nonce, Hash::new_unique(), authority);

        let ix = anchor.advance_instruction().unwrap();
        assert_eq!(programs::as_nonce_advance(&ix), Some((nonce, authority)));

        let ephemeral = RecencyAnchor::ephemeral(Hash::new_unique(), Utc::now());
        assert!(ephemeral.advance_instruction().is_none());
    }

    #[test]
    fn test_matches_live_value() {
        let value = Hash::new_unique();
        let anchor = RecencyAnchor::durable(
            KeyPair::generate().address(),
            value,
            KeyPair::generate().address(),
        );
        assert!(anchor.matches_live_value(&value));
        assert!(!anchor.matches_live_value(&Hash::new_unique()));
    }
}
