//! M-of-N multisig authorities
//!
//! An authority is an account controlled collectively by N member keys,
//! any M of which may authorise on its behalf. Authorities are immutable:
//! changing membership or threshold means creating a new authority (with
//! a new address).

use crate::crypto::{Address, MULTISIG_PREFIX};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

/// Largest member count the ledger accepts for one authority
pub const MAX_MEMBERS: usize = 11;

/// Smallest member count for an authority
pub const MIN_MEMBERS: usize = 2;

/// Errors related to multisig operations
#[derive(Error, Debug)]
pub enum MultisigError {
    #[error("Invalid threshold: {0}")]
    InvalidThreshold(String),
    #[error("Invalid member count: need at least {MIN_MEMBERS} members")]
    InsufficientMembers,
    #[error("Invalid member count: at most {MAX_MEMBERS} members allowed, got {0}")]
    TooManyMembers(usize),
    #[error("Duplicate member {0}")]
    DuplicateMember(Address),
    #[error("Member {0} is not a signing key")]
    MemberNotKey(Address),
    #[error("Unknown multisig authority: {0}")]
    UnknownAuthority(Address),
    #[error("Stored authority {0} does not match its definition")]
    AddressMismatch(Address),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

/// An immutable M-of-N signing authority
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct MultisigAuthority {
    /// Derived address the ledger knows this authority by
    address: Address,
    /// Minimum member signatures required (M in M-of-N)
    threshold: u8,
    /// Member keys, in declaration order (N)
    members: Vec<Address>,
    /// Optional human-readable label
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl MultisigAuthority {
    /// Create a new authority
    ///
    /// # Errors
    /// Returns error if the threshold is outside 1..=N, the member count is
    /// outside the ledger's limits, a member repeats, or a member is not a
    /// key that can sign.
    pub fn new(
        threshold: u8,
        members: Vec<Address>,
        label: Option<String>,
    ) -> Result<Self, MultisigError> {
        if threshold == 0 {
            return Err(MultisigError::InvalidThreshold(
                "threshold must be at least 1".to_string(),
            ));
        }

        if members.len() < MIN_MEMBERS {
            return Err(MultisigError::InsufficientMembers);
        }
        if members.len() > MAX_MEMBERS {
            return Err(MultisigError::TooManyMembers(members.len()));
        }

        if threshold as usize > members.len() {
            return Err(MultisigError::InvalidThreshold(format!(
                "threshold {} exceeds member count {}",
                threshold,
                members.len()
            )));
        }

        let mut seen = HashSet::with_capacity(members.len());
        for member in &members {
            if !member.is_on_curve() {
                return Err(MultisigError::MemberNotKey(*member));
            }
            if !seen.insert(*member) {
                return Err(MultisigError::DuplicateMember(*member));
            }
        }

        let address = Self::derive_address(threshold, &members);
        Ok(Self {
            address,
            threshold,
            members,
            label,
        })
    }

    /// Address = MULTISIG_PREFIX || SHA256(threshold || sorted members)
    ///
    /// Members are sorted so declaration order does not change the address.
    fn derive_address(threshold: u8, members: &[Address]) -> Address {
        let mut sorted: Vec<&Address> = members.iter().collect();
        sorted.sort();

        let threshold = [threshold];
        let mut parts: Vec<&[u8]> = Vec::with_capacity(sorted.len() + 1);
        parts.push(&threshold);
        for member in &sorted {
            parts.push(member.as_bytes());
        }
        Address::derive(MULTISIG_PREFIX, &parts)
    }

    pub fn address(&self) -> &Address {
        &self.address
    }

    /// The threshold (M)
    pub fn threshold(&self) -> u8 {
        self.threshold
    }

    pub fn members(&self) -> &[Address] {
        &self.members
    }

    /// The member count (N)
    pub fn member_count(&self) -> usize {
        self.members.len()
    }

    pub fn is_member(&self, address: &Address) -> bool {
        self.members.contains(address)
    }

    /// Description like "2-of-3"
    pub fn description(&self) -> String {
        format!("{}-of-{}", self.threshold, self.members.len())
    }
}
