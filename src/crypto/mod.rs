//! Cryptographic primitives
//!
//! This module provides:
//! - SHA-256 hashing and the `Hash` value
//! - Account references (`Address`)
//! - ECDSA key management and signatures (secp256k1)

pub mod address;
pub mod hash;
pub mod keys;

pub use address::{Address, ADDRESS_BYTES, MULTISIG_PREFIX, PROGRAM_PREFIX};
pub use hash::{hashv, sha256, sha256_hex, Hash, HASH_BYTES};
pub use keys::{sign_message, verify_signature, KeyError, KeyPair, Signature, SIGNATURE_BYTES};
