//! Required-signer expansion and threshold checks
//!
//! A multisig authority named as a signer is one logical signer that is
//! satisfied by any M distinct members. Which members sign, and in what
//! order, does not matter. The signature map is keyed by address, so one
//! member can never be counted twice.

use crate::core::{Message, Transaction};
use crate::crypto::{Address, Signature, MULTISIG_PREFIX};
use crate::multisig::authority::MultisigAuthority;
use crate::multisig::registry::AuthorityRegistry;
use std::collections::BTreeMap;

/// One entry of a message's required-signer set
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequiredSigner {
    /// A single key must sign
    Key(Address),
    /// Any `threshold` members of the authority must sign
    Threshold(MultisigAuthority),
}

impl RequiredSigner {
    /// The address the message names
    pub fn address(&self) -> &Address {
        match self {
            RequiredSigner::Key(address) => address,
            RequiredSigner::Threshold(authority) => authority.address(),
        }
    }

    pub fn is_satisfied(&self, signatures: &BTreeMap<Address, Signature>) -> bool {
        match self {
            RequiredSigner::Key(address) => signatures.contains_key(address),
            RequiredSigner::Threshold(authority) => threshold_met(signatures, authority),
        }
    }

    /// Whether a signature from `signer` contributes to this entry
    pub fn accepts(&self, signer: &Address) -> bool {
        match self {
            RequiredSigner::Key(address) => address == signer,
            RequiredSigner::Threshold(authority) => authority.is_member(signer),
        }
    }
}

/// Distinct authority members that have signed
pub fn member_signature_count(
    signatures: &BTreeMap<Address, Signature>,
    authority: &MultisigAuthority,
) -> usize {
    authority
        .members()
        .iter()
        .filter(|member| signatures.contains_key(*member))
        .count()
}

/// True iff at least M distinct members have signed
pub fn threshold_met(
    signatures: &BTreeMap<Address, Signature>,
    authority: &MultisigAuthority,
) -> bool {
    member_signature_count(signatures, authority) >= authority.threshold() as usize
}

/// Resolves a message's declared signers against known authorities
#[derive(Debug, Clone, Copy)]
pub struct MultisigResolver<'a> {
    registry: &'a AuthorityRegistry,
}

impl<'a> MultisigResolver<'a> {
    pub fn new(registry: &'a AuthorityRegistry) -> Self {
        Self { registry }
    }

    /// Expand one declared signer
    pub fn expand(&self, address: &Address) -> RequiredSigner {
        match self.registry.get(address) {
            Some(authority) => RequiredSigner::Threshold(authority.clone()),
            None => {
                if address.prefix() == MULTISIG_PREFIX {
                    log::warn!(
                        "Signer {} looks like a multisig authority but is not registered",
                        address
                    );
                }
                RequiredSigner::Key(*address)
            }
        }
    }

    /// The full required-signer set, fee payer first
    pub fn required_signers(&self, message: &Message) -> Vec<RequiredSigner> {
        message
            .declared_signers()
            .iter()
            .map(|address| self.expand(address))
            .collect()
    }

    /// Whether `signer` is expected to sign this message at all
    pub fn accepts_signer(&self, message: &Message, signer: &Address) -> bool {
        self.required_signers(message)
            .iter()
            .any(|required| required.accepts(signer))
    }

    /// Required entries not yet satisfied
    pub fn outstanding(&self, tx: &Transaction) -> Vec<RequiredSigner> {
        self.required_signers(tx.message())
            .into_iter()
            .filter(|required| !required.is_satisfied(tx.signatures()))
            .collect()
    }

    /// True iff every required entry is satisfied
    pub fn is_complete(&self, tx: &Transaction) -> bool {
        self.required_signers(tx.message())
            .iter()
            .all(|required| required.is_satisfied(tx.signatures()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{programs, RecencyAnchor, TransactionBuilder};
    use crate::crypto::{Hash, KeyPair};
    use chrono::Utc;

    fn setup() -> (AuthorityRegistry, MultisigAuthority, Vec<KeyPair>) {
        let keys: Vec<KeyPair> = (0..3).map(|_| KeyPair::generate()).collect();
        let members = keys.iter().map(|k| k.address()).collect();
        let mut registry = AuthorityRegistry::new();
        let authority = registry.create(2, members, None).unwrap().clone();
        (registry, authority, keys)
    }

    fn fake_signatures(signers: &[&KeyPair]) -> BTreeMap<Address, Signature> {
        signers
            .iter()
            .map(|k| (k.address(), k.sign(b"anything").unwrap()))
            .collect()
    }

    #[test]
    fn test_threshold_any_two_of_three() {
        let (_, authority, keys) = setup();

        assert!(!threshold_met(&fake_signatures(&[]), &authority));
        for i in 0..3 {
            assert!(!threshold_met(&fake_signatures(&[&keys[i]]), &authority));
        }
        for (i, j) in [(0, 1), (0, 2), (1, 2)] {
            assert!(threshold_met(
                &fake_signatures(&[&keys[i], &keys[j]]),
                &authority
            ));
        }
    }

    #[test]
    fn test_outsider_signatures_do_not_count() {
        let (_, authority, keys) = setup();
        let outsider = KeyPair::generate();
        let signatures = fake_signatures(&[&keys[0], &outsider]);

        assert_eq!(member_signature_count(&signatures, &authority), 1);
        assert!(!threshold_met(&signatures, &authority));
    }

    #[test]
    fn test_expand_authority_fee_payer() {
        let (registry, authority, keys) = setup();
        let resolver = MultisigResolver::new(&registry);
        let recipient = KeyPair::generate().address();

        let tx = TransactionBuilder::new(*authority.address())
            .anchor(RecencyAnchor::ephemeral(Hash::new_unique(), Utc::now()))
            .add_instruction(programs::mint_to(
                &KeyPair::generate().address(),
                &recipient,
                authority.address(),
                1,
            ))
            .build()
            .unwrap();

        let required = resolver.required_signers(tx.message());
        assert_eq!(required, vec![RequiredSigner::Threshold(authority.clone())]);

        assert!(resolver.accepts_signer(tx.message(), &keys[2].address()));
        assert!(!resolver.accepts_signer(tx.message(), &recipient));
        assert_eq!(resolver.outstanding(&tx).len(), 1);
        assert!(!resolver.is_complete(&tx));
    }

    #[test]
    fn test_unregistered_address_is_plain_key() {
        let registry = AuthorityRegistry::new();
        let resolver = MultisigResolver::new(&registry);
        let address = KeyPair::generate().address();

        assert_eq!(resolver.expand(&address), RequiredSigner::Key(address));
    }
}
