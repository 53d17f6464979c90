//! Messages and transactions
//!
//! A `Message` is the structural part of a transaction: instructions, fee
//! payer and recency anchor. It is what every party signs. A `Transaction`
//! pairs a message with the signatures collected so far. Signing only ever
//! adds to the signature map; the message is never touched after build.

use crate::core::anchor::RecencyAnchor;
use crate::core::codec;
use crate::core::instruction::InstructionSet;
use crate::crypto::{verify_signature, Address, Hash, Signature};
use std::collections::BTreeMap;

/// The structural fields of a transaction
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Message {
    instructions: InstructionSet,
    fee_payer: Address,
    anchor: RecencyAnchor,
}

impl Message {
    /// Assemble without validation. Use `TransactionBuilder` for new messages.
    pub(crate) fn new_unchecked(
        instructions: InstructionSet,
        fee_payer: Address,
        anchor: RecencyAnchor,
    ) -> Self {
        Self {
            instructions,
            fee_payer,
            anchor,
        }
    }

    pub fn instructions(&self) -> &InstructionSet {
        &self.instructions
    }

    pub fn fee_payer(&self) -> &Address {
        &self.fee_payer
    }

    pub fn anchor(&self) -> &RecencyAnchor {
        &self.anchor
    }

    /// Signers named by the message, fee payer first
    ///
    /// Multisig authorities appear here as a single logical signer; see
    /// `multisig::AuthorityRegistry::expand` for member expansion.
    pub fn declared_signers(&self) -> Vec<Address> {
        let mut signers = vec![self.fee_payer];
        for signer in self.instructions.signers() {
            if !signers.contains(&signer) {
                signers.push(signer);
            }
        }
        signers
    }

    /// Canonical bytes every signer signs
    pub fn serialize(&self) -> Vec<u8> {
        codec::encode_message(self)
    }

    /// SHA-256 of the canonical bytes
    pub fn digest(&self) -> Hash {
        Hash::of(&self.serialize())
    }
}

/// A message plus the signatures collected for it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    message: Message,
    signatures: BTreeMap<Address, Signature>,
}

impl Transaction {
    /// An unsigned transaction
    pub(crate) fn unsigned(message: Message) -> Self {
        Self {
            message,
            signatures: BTreeMap::new(),
        }
    }

    pub(crate) fn from_parts(message: Message, signatures: BTreeMap<Address, Signature>) -> Self {
        Self {
            message,
            signatures,
        }
    }

    pub fn message(&self) -> &Message {
        &self.message
    }

    pub fn signatures(&self) -> &BTreeMap<Address, Signature> {
        &self.signatures
    }

    pub fn signature_for(&self, address: &Address) -> Option<&Signature> {
        self.signatures.get(address)
    }

    pub fn is_signed_by(&self, address: &Address) -> bool {
        self.signatures.contains_key(address)
    }

    pub fn signature_count(&self) -> usize {
        self.signatures.len()
    }

    pub(crate) fn insert_signature(&mut self, address: Address, signature: Signature) {
        self.signatures.insert(address, signature);
    }

    /// Same instructions, fee payer and anchor; signatures may differ
    pub fn is_structurally_identical(&self, other: &Transaction) -> bool {
        self.message == other.message
    }

    /// Signers whose signature does not verify against the message
    pub fn invalid_signers(&self) -> Vec<Address> {
        let bytes = self.message.serialize();
        self.signatures
            .iter()
            .filter(|(address, signature)| {
                !matches!(verify_signature(address, &bytes, signature), Ok(true))
            })
            .map(|(address, _)| *address)
            .collect()
    }

    /// Identifier the ledger uses: the fee payer's signature when present,
    /// otherwise the lowest-ordered signature (multisig fee payers).
    pub fn id(&self) -> Option<Signature> {
        self.signatures
            .get(&self.message.fee_payer)
            .or_else(|| self.signatures.values().next())
            .copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::programs;
    use crate::crypto::KeyPair;
    use chrono::Utc;

    fn sample_message(from: &KeyPair, payer: &KeyPair) -> Message {
        let to = KeyPair::generate().address();
        Message::new_unchecked(
            InstructionSet::new(vec![programs::transfer(&from.address(), &to, 100)]),
            payer.address(),
            RecencyAnchor::ephemeral(Hash::new_unique(), Utc::now()),
        )
    }

    #[test]
    fn test_declared_signers_fee_payer_first() {
        let from = KeyPair::generate();
        let payer = KeyPair::generate();
        let message = sample_message(&from, &payer);

        assert_eq!(
            message.declared_signers(),
            vec![payer.address(), from.address()]
        );
    }

    #[test]
    fn test_fee_payer_not_duplicated() {
        let from = KeyPair::generate();
        let message = sample_message(&from, &from);
        assert_eq!(message.declared_signers(), vec![from.address()]);
    }

    #[test]
    fn test_structural_identity_ignores_signatures() {
        let from = KeyPair::generate();
        let payer = KeyPair::generate();
        let message = sample_message(&from, &payer);

        let unsigned = Transaction::unsigned(message.clone());
        let mut signed = Transaction::unsigned(message);
        let signature = from.sign(&signed.message().serialize()).unwrap();
        signed.insert_signature(from.address(), signature);

        assert!(unsigned.is_structurally_identical(&signed));
        assert_ne!(unsigned, signed);
    }

    #[test]
    fn test_invalid_signers_detected() {
        let from = KeyPair::generate();
        let payer = KeyPair::generate();
        let mut tx = Transaction::unsigned(sample_message(&from, &payer));

        let good = from.sign(&tx.message().serialize()).unwrap();
        let bad = payer.sign(b"some other message").unwrap();
        tx.insert_signature(from.address(), good);
        tx.insert_signature(payer.address(), bad);

        assert_eq!(tx.invalid_signers(), vec![payer.address()]);
    }

    #[test]
    fn test_id_prefers_fee_payer_signature() {
        let from = KeyPair::generate();
        let payer = KeyPair::generate();
        let mut tx = Transaction::unsigned(sample_message(&from, &payer));
        assert!(tx.id().is_none());

        let bytes = tx.message().serialize();
        let from_sig = from.sign(&bytes).unwrap();
        tx.insert_signature(from.address(), from_sig);
        assert_eq!(tx.id(), Some(from_sig));

        let payer_sig = payer.sign(&bytes).unwrap();
        tx.insert_signature(payer.address(), payer_sig);
        assert_eq!(tx.id(), Some(payer_sig));
    }
}
