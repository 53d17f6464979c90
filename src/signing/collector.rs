//! Partial signature collection
//!
//! Signatures accumulate in an address-keyed map. Signing is idempotent
//! (deterministic signatures overwrite themselves) and commutative (the
//! final map does not depend on the order signers arrive in). Merging two
//! copies of the same message is a plain union, so member signatures
//! gathered through independent relay hops combine without coordination.

use crate::core::{Transaction, TxStatus};
use crate::crypto::{verify_signature, Address, KeyError, KeyPair};
use crate::multisig::{AuthorityRegistry, MultisigResolver, RequiredSigner};
use thiserror::Error;

/// Signing errors
#[derive(Error, Debug)]
pub enum SigningError {
    #[error("Unexpected signer {0}: not in the required-signer set")]
    UnexpectedSigner(Address),
    #[error("Signatures belong to different messages")]
    StructuralMismatch,
    #[error("Invalid signature from {0}")]
    InvalidSignature(Address),
    #[error("Crypto error: {0}")]
    CryptoError(#[from] KeyError),
}

/// Adds signatures to transactions and tracks completeness
#[derive(Debug, Clone, Copy)]
pub struct PartialSignatureCollector<'a> {
    resolver: MultisigResolver<'a>,
}

impl<'a> PartialSignatureCollector<'a> {
    pub fn new(registry: &'a AuthorityRegistry) -> Self {
        Self {
            resolver: MultisigResolver::new(registry),
        }
    }

    pub fn resolver(&self) -> &MultisigResolver<'a> {
        &self.resolver
    }

    /// Add `key`'s signature, returning the updated transaction
    ///
    /// A key outside the required-signer set yields `UnexpectedSigner`;
    /// the input transaction is left as it was.
    pub fn sign(&self, tx: &Transaction, key: &KeyPair) -> Result<Transaction, SigningError> {
        let mut signed = tx.clone();
        self.sign_in_place(&mut signed, key)?;
        Ok(signed)
    }

    pub fn sign_in_place(&self, tx: &mut Transaction, key: &KeyPair) -> Result<(), SigningError> {
        let signer = key.address();
        if !self.resolver.accepts_signer(tx.message(), &signer) {
            return Err(SigningError::UnexpectedSigner(signer));
        }

        let signature = key.sign(&tx.message().serialize())?;
        tx.insert_signature(signer, signature);
        log::debug!(
            "Signed {} as {} ({} signatures)",
            tx.message().digest(),
            signer.short(),
            tx.signature_count()
        );
        Ok(())
    }

    /// Sign with every key, skipping (and logging) unexpected ones
    ///
    /// Returns the addresses that were skipped.
    pub fn sign_all(
        &self,
        tx: &mut Transaction,
        keys: &[&KeyPair],
    ) -> Result<Vec<Address>, SigningError> {
        let mut skipped = Vec::new();
        for key in keys {
            match self.sign_in_place(tx, key) {
                Ok(()) => {}
                Err(SigningError::UnexpectedSigner(address)) => {
                    log::warn!("Skipping unexpected signer {}", address);
                    skipped.push(address);
                }
                Err(e) => return Err(e),
            }
        }
        Ok(skipped)
    }

    /// Union of two partially signed copies of the same message
    ///
    /// Every signature taken from `other` is verified first.
    pub fn merge(
        &self,
        base: &Transaction,
        other: &Transaction,
    ) -> Result<Transaction, SigningError> {
        if !base.is_structurally_identical(other) {
            return Err(SigningError::StructuralMismatch);
        }

        let bytes = base.message().serialize();
        let mut merged = base.clone();
        for (address, signature) in other.signatures() {
            if merged.is_signed_by(address) {
                continue;
            }
            if !matches!(verify_signature(address, &bytes, signature), Ok(true)) {
                return Err(SigningError::InvalidSignature(*address));
            }
            merged.insert_signature(*address, *signature);
        }
        Ok(merged)
    }

    /// True iff the signature keys cover the required-signer set,
    /// with multisig authorities expanded to their thresholds
    pub fn is_complete(&self, tx: &Transaction) -> bool {
        self.resolver.is_complete(tx)
    }

    /// Required entries still unsatisfied
    pub fn outstanding(&self, tx: &Transaction) -> Vec<RequiredSigner> {
        self.resolver.outstanding(tx)
    }

    /// Where a not-yet-broadcast transaction stands
    pub fn status(&self, tx: &Transaction) -> TxStatus {
        if self.is_complete(tx) {
            TxStatus::Complete
        } else if tx.signature_count() > 0 {
            TxStatus::PartiallySigned
        } else {
            TxStatus::Built
        }
    }
}
