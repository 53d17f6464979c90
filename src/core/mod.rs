//! Core transaction model
//!
//! This module contains the fundamental building blocks:
//! - Instructions and instruction sets (opaque ledger operations)
//! - Well-known program constructors (system, token, memo)
//! - Recency anchors (ephemeral blockhash, durable nonce)
//! - Messages, transactions and their canonical encoding
//! - Transaction construction and lifecycle tracking

pub mod anchor;
pub mod builder;
pub mod codec;
pub mod instruction;
pub mod lifecycle;
pub mod programs;
pub mod transaction;

pub use anchor::{RecencyAnchor, EPHEMERAL_VALIDITY_SECS};
pub use builder::{build, validate, BuildError, Malformation, TransactionBuilder};
pub use codec::{CodecError, CODEC_VERSION, MAGIC};
pub use instruction::{AccountFlags, AccountMeta, Instruction, InstructionSet};
pub use lifecycle::{LifecycleError, TrackedTransaction, TxStatus};
pub use programs::{
    InstructionError, SystemInstruction, MEMO_PROGRAM_ID, NONCE_ACCOUNT_LENGTH, SYSTEM_PROGRAM_ID,
    TOKEN_PROGRAM_ID,
};
pub use transaction::{Message, Transaction};
