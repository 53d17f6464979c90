//! Two-phase delegation handoff
//!
//! Phase 1 turns a partially signed transaction into opaque bytes. Phase 2
//! parses those bytes, checks the structure against what the receiving
//! party expects to sign and verifies every carried signature. Nothing in
//! here touches a transport; how the bytes travel is the caller's business.

use crate::core::{
    builder, codec, CodecError, InstructionSet, Malformation, Message, RecencyAnchor, Transaction,
};
use crate::crypto::Address;
use std::fmt;
use thiserror::Error;

/// Structural field that differed from the expectation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StructuralField {
    Instructions,
    FeePayer,
    Anchor,
}

impl fmt::Display for StructuralField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StructuralField::Instructions => "instructions",
            StructuralField::FeePayer => "fee payer",
            StructuralField::Anchor => "recency anchor",
        };
        write!(f, "{}", name)
    }
}

/// Relay errors. All of them abort the handoff.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum RelayError {
    #[error("Corrupt relay payload: {0}")]
    CorruptRelayPayload(#[from] CodecError),
    #[error("Corrupt relay payload: {0}")]
    MalformedPayload(#[from] Malformation),
    #[error("Structural mismatch in {0}")]
    StructuralMismatch(StructuralField),
    #[error("Invalid signature from {0}")]
    InvalidSignature(Address),
}

/// Phase 1: the opaque byte sequence handed to the counterparty
pub fn to_relay_payload(tx: &Transaction) -> Vec<u8> {
    let payload = codec::encode_transaction(tx);
    log::debug!(
        "Encoded relay payload for {} ({} bytes, {} signatures)",
        tx.message().digest(),
        payload.len(),
        tx.signature_count()
    );
    payload
}

/// Parse a payload into a transaction `build` would have produced
fn decode(bytes: &[u8]) -> Result<Transaction, RelayError> {
    let tx = codec::decode_transaction(bytes).map_err(|e| {
        log::warn!("Rejecting relay payload: {}", e);
        RelayError::CorruptRelayPayload(e)
    })?;
    builder::validate(tx.message()).map_err(|e| {
        log::warn!("Rejecting malformed relay payload: {}", e);
        RelayError::MalformedPayload(e)
    })?;
    Ok(tx)
}

/// Phase 2: parse a payload and verify the signatures it carries
pub fn from_relay_payload(bytes: &[u8]) -> Result<Transaction, RelayError> {
    let tx = decode(bytes)?;
    verify_signatures(&tx)?;
    Ok(tx)
}

/// Phase 2 with a structural check ahead of signature verification
pub fn receive(bytes: &[u8], expected: &Expectation) -> Result<Transaction, RelayError> {
    let tx = decode(bytes)?;
    verify_structure(expected, &tx)?;
    verify_signatures(&tx)?;
    Ok(tx)
}

/// Every carried signature must verify against the carried message
pub fn verify_signatures(tx: &Transaction) -> Result<(), RelayError> {
    match tx.invalid_signers().first() {
        Some(address) => {
            log::warn!("Relay payload carries an invalid signature from {}", address);
            Err(RelayError::InvalidSignature(*address))
        }
        None => Ok(()),
    }
}

pub fn verify_structure(expected: &Expectation, received: &Transaction) -> Result<(), RelayError> {
    expected.check(received.message()).map_err(|field| {
        log::warn!(
            "Relay payload {} differs from expectation in {}",
            received.message().digest(),
            field
        );
        RelayError::StructuralMismatch(field)
    })
}

/// What the receiving party is prepared to countersign
///
/// Unset fields are not checked. `Expectation::exact` pins all three.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Expectation {
    instructions: Option<InstructionSet>,
    fee_payer: Option<Address>,
    anchor: Option<RecencyAnchor>,
}

impl Expectation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Expect exactly this message
    pub fn exact(message: &Message) -> Self {
        Self {
            instructions: Some(message.instructions().clone()),
            fee_payer: Some(*message.fee_payer()),
            anchor: Some(*message.anchor()),
        }
    }

    pub fn instructions(mut self, instructions: InstructionSet) -> Self {
        self.instructions = Some(instructions);
        self
    }

    pub fn fee_payer(mut self, fee_payer: Address) -> Self {
        self.fee_payer = Some(fee_payer);
        self
    }

    pub fn anchor(mut self, anchor: RecencyAnchor) -> Self {
        self.anchor = Some(anchor);
        self
    }

    /// True when nothing would be checked
    pub fn is_empty(&self) -> bool {
        self.instructions.is_none() && self.fee_payer.is_none() && self.anchor.is_none()
    }

    /// First field that differs, if any
    pub fn check(&self, message: &Message) -> Result<(), StructuralField> {
        if let Some(instructions) = &self.instructions {
            if instructions != message.instructions() {
                return Err(StructuralField::Instructions);
            }
        }
        if let Some(fee_payer) = &self.fee_payer {
            if fee_payer != message.fee_payer() {
                return Err(StructuralField::FeePayer);
            }
        }
        if let Some(anchor) = &self.anchor {
            if anchor != message.anchor() {
                return Err(StructuralField::Anchor);
            }
        }
        Ok(())
    }
}
