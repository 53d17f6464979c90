//! Cosign Relay: multi-party transaction assembly and relay
//!
//! This crate builds transactions that need more than one signature and
//! carries them between parties until they are ready to broadcast:
//! - Delegated fees, where a sponsor pays for someone else's transaction
//! - Durable nonce anchors that do not expire while signers are offline
//! - M-of-N multisig authorities as fee payers or instruction signers
//! - Partial signing in any order, with a canonical relay encoding
//! - Structural checks before countersigning a received payload
//! - Broadcast with completeness checks and bounded confirmation
//!
//! # Example
//!
//! ```rust
//! use cosign_relay::core::{programs, InstructionSet, RecencyAnchor};
//! use cosign_relay::crypto::{Hash, KeyPair};
//! use cosign_relay::multisig::AuthorityRegistry;
//! use cosign_relay::relay::Expectation;
//! use cosign_relay::Cosigner;
//!
//! let registry = AuthorityRegistry::new();
//! let cosigner = Cosigner::new(&registry);
//!
//! let user = KeyPair::generate();
//! let sponsor = KeyPair::generate();
//! let recipient = KeyPair::generate().address();
//!
//! // The user builds a transfer that the sponsor pays for
//! let instructions = InstructionSet::new(vec![programs::transfer(
//!     &user.address(),
//!     &recipient,
//!     1_000,
//! )]);
//! let anchor = RecencyAnchor::ephemeral(Hash::new_unique(), chrono::Utc::now());
//! let tx = cosigner.build(instructions, sponsor.address(), anchor).unwrap();
//!
//! // Sign and hand off
//! let signed = cosigner.sign(&tx, &user).unwrap();
//! let payload = cosigner.to_relay_payload(&signed);
//!
//! // The sponsor only countersigns if it is the fee payer it agreed to be
//! let expected = Expectation::new().fee_payer(sponsor.address());
//! let complete = cosigner.countersign(&payload, &expected, &sponsor).unwrap();
//! assert!(cosigner.is_ready(&complete));
//! ```

pub mod cli;
pub mod config;
pub mod core;
pub mod crypto;
pub mod error;
pub mod keystore;
pub mod ledger;
pub mod multisig;
pub mod protocol;
pub mod relay;
pub mod signing;

// Re-export commonly used types
pub use config::RelayConfig;
pub use crate::core::{
    build, InstructionSet, Message, RecencyAnchor, TrackedTransaction, Transaction,
    TransactionBuilder, TxStatus,
};
pub use crypto::{Address, Hash, KeyPair};
pub use error::{ErrorClass, ProtocolError};
pub use keystore::{FileKeyStore, KeyStore, MemoryKeyStore};
pub use ledger::{LedgerRpc, Outcome, SimulatedLedger};
pub use multisig::{AuthorityRegistry, MultisigAuthority, MultisigResolver};
pub use protocol::{durable_anchor, Cosigner};
pub use relay::{from_relay_payload, to_relay_payload, Expectation};
pub use signing::PartialSignatureCollector;
