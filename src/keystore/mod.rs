//! Key storage
//!
//! The signing parties' credentials. Lookups by name fail with
//! `MissingCredential` rather than inventing keys.

pub mod store;

pub use store::{FileKeyStore, KeyInfo, KeyStore, KeyStoreError, MemoryKeyStore};
