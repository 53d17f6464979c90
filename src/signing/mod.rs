//! Signature collection across parties

pub mod collector;

pub use collector::{PartialSignatureCollector, SigningError};
