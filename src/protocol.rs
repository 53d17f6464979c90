//! Caller-facing protocol
//!
//! `Cosigner` ties the pieces together: build, sign, hand off, countersign,
//! check readiness and broadcast. Multisig resolution uses the authority
//! registry it is created with, so every party must load the same one.

use crate::core::{InstructionSet, RecencyAnchor, TrackedTransaction, Transaction, TxStatus};
use crate::crypto::{Address, KeyPair};
use crate::error::ProtocolError;
use crate::keystore::KeyStore;
use crate::ledger::{self, LedgerRpc, Outcome};
use crate::multisig::{AuthorityRegistry, RequiredSigner};
use crate::relay::{self, Expectation};
use crate::signing::PartialSignatureCollector;
use std::time::Duration;

/// Fetch a nonce account's live value and wrap it as a durable anchor
///
/// Call immediately before building; never hold the result across a wait.
pub async fn durable_anchor<L: LedgerRpc>(
    ledger: &L,
    nonce_account: &Address,
    authority: &Address,
) -> Result<RecencyAnchor, ProtocolError> {
    let value = ledger.get_nonce(nonce_account).await?;
    Ok(RecencyAnchor::durable(*nonce_account, value, *authority))
}

/// Transaction assembly and relay for one party
#[derive(Debug, Clone, Copy)]
pub struct Cosigner<'a> {
    collector: PartialSignatureCollector<'a>,
}

impl<'a> Cosigner<'a> {
    pub fn new(registry: &'a AuthorityRegistry) -> Self {
        Self {
            collector: PartialSignatureCollector::new(registry),
        }
    }

    /// Unsigned transaction, or `MalformedTransaction`
    pub fn build(
        &self,
        instructions: InstructionSet,
        fee_payer: Address,
        anchor: RecencyAnchor,
    ) -> Result<Transaction, ProtocolError> {
        Ok(crate::core::build(instructions, fee_payer, anchor)?)
    }

    /// Add `key`'s signature, or `UnexpectedSigner`
    pub fn sign(&self, tx: &Transaction, key: &KeyPair) -> Result<Transaction, ProtocolError> {
        Ok(self.collector.sign(tx, key)?)
    }

    /// Sign with the key stored under `name`
    pub fn sign_as<K: KeyStore>(
        &self,
        tx: &Transaction,
        store: &K,
        name: &str,
    ) -> Result<Transaction, ProtocolError> {
        let key = store.lookup(name)?;
        self.sign(tx, &key)
    }

    pub fn to_relay_payload(&self, tx: &Transaction) -> Vec<u8> {
        relay::to_relay_payload(tx)
    }

    pub fn from_relay_payload(&self, bytes: &[u8]) -> Result<Transaction, ProtocolError> {
        Ok(relay::from_relay_payload(bytes)?)
    }

    /// Phase 2 in one step: check the payload against `expected`, then sign
    ///
    /// A mismatch aborts before any signature is produced.
    pub fn countersign(
        &self,
        payload: &[u8],
        expected: &Expectation,
        key: &KeyPair,
    ) -> Result<Transaction, ProtocolError> {
        if expected.is_empty() {
            log::warn!(
                "Countersigning as {} with no structural expectation",
                key.address().short()
            );
        }
        let received = relay::receive(payload, expected)?;
        self.sign(&received, key)
    }

    /// Combine signatures gathered over independent hops
    pub fn merge(&self, a: &Transaction, b: &Transaction) -> Result<Transaction, ProtocolError> {
        Ok(self.collector.merge(a, b)?)
    }

    /// True iff every required signer (or multisig threshold) is satisfied
    pub fn is_ready(&self, tx: &Transaction) -> bool {
        self.collector.is_complete(tx)
    }

    pub fn outstanding(&self, tx: &Transaction) -> Vec<RequiredSigner> {
        self.collector.outstanding(tx)
    }

    pub fn status(&self, tx: &Transaction) -> TxStatus {
        self.collector.status(tx)
    }

    /// Submit, or `IncompleteSignatures` without contacting the ledger
    pub async fn broadcast<L: LedgerRpc>(
        &self,
        ledger: &L,
        tx: &Transaction,
    ) -> Result<String, ProtocolError> {
        Ok(ledger::broadcast(ledger, self.collector.resolver(), tx).await?)
    }

    /// Broadcast and wait (bounded) for the outcome
    pub async fn broadcast_and_confirm<L: LedgerRpc>(
        &self,
        ledger: &L,
        tx: &Transaction,
        timeout: Duration,
    ) -> Result<(TrackedTransaction, Outcome), ProtocolError> {
        let mut tracked = TrackedTransaction::new(tx.clone(), self.status(tx));
        ledger::broadcast_tracked(ledger, self.collector.resolver(), &mut tracked).await?;
        let outcome = ledger::await_outcome(ledger, &mut tracked, timeout).await?;
        Ok((tracked, outcome))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{
        programs, BuildError, Malformation, Message, TransactionBuilder, EPHEMERAL_VALIDITY_SECS,
    };
    use crate::keystore::{KeyStoreError, MemoryKeyStore};
    use crate::ledger::{
        recovery_action, BroadcastError, RecoveryAction, SimulatedLedger, FEE_PER_SIGNATURE,
    };
    use crate::multisig::MultisigAuthority;
    use crate::relay::{RelayError, StructuralField};
    use chrono::Duration as ChronoDuration;
    use std::collections::BTreeSet;

    const CONFIRM: Duration = Duration::from_secs(2);

    fn sim_ledger() -> SimulatedLedger {
        SimulatedLedger::new().with_poll_interval(Duration::from_millis(5))
    }

    fn key_set(tx: &Transaction) -> BTreeSet<Address> {
        tx.signatures().keys().copied().collect()
    }

    // =========================================================================
    // Scenarios
    // =========================================================================

    #[tokio::test]
    async fn test_delegated_fee_payer_flow() {
        let ledger = sim_ledger();
        let registry = AuthorityRegistry::new();
        let a = KeyPair::generate();
        let b = KeyPair::generate();
        ledger.fund(&a.address(), 1_000).await;
        ledger.fund(&b.address(), 50_000).await;

        // Initiator A: B pays the fee
        let initiator = Cosigner::new(&registry);
        let anchor = ledger.get_recent_anchor().await.unwrap();
        let instructions =
            InstructionSet::new(vec![programs::transfer(&a.address(), &b.address(), 100)]);
        let tx = initiator
            .build(instructions.clone(), b.address(), anchor)
            .unwrap();
        assert_eq!(initiator.status(&tx), TxStatus::Built);

        let partial = initiator.sign(&tx, &a).unwrap();
        assert!(!initiator.is_ready(&partial));
        assert!(matches!(
            initiator.broadcast(&ledger, &partial).await,
            Err(ProtocolError::BroadcastError(BroadcastError::IncompleteSignatures { .. }))
        ));
        let payload = initiator.to_relay_payload(&partial);

        // Counterparty B checks exactly what it agreed to, then countersigns
        let counterparty = Cosigner::new(&registry);
        let expected = Expectation::new()
            .instructions(instructions)
            .fee_payer(b.address())
            .anchor(anchor);
        let complete = counterparty.countersign(&payload, &expected, &b).unwrap();
        assert!(counterparty.is_ready(&complete));

        let (tracked, outcome) = counterparty
            .broadcast_and_confirm(&ledger, &complete, CONFIRM)
            .await
            .unwrap();
        assert_eq!(outcome, Outcome::Confirmed);
        assert_eq!(tracked.status(), TxStatus::Confirmed);
        assert_eq!(ledger.balance(&a.address()).await, 900);
        assert_eq!(
            ledger.balance(&b.address()).await,
            50_000 + 100 - 2 * FEE_PER_SIGNATURE
        );
    }

    #[tokio::test]
    async fn test_durable_nonce_advanced_elsewhere_then_rebuilt() {
        let ledger = sim_ledger();
        let registry = AuthorityRegistry::new();
        let cosigner = Cosigner::new(&registry);
        let a = KeyPair::generate();
        let b = KeyPair::generate();
        ledger.fund(&a.address(), 1_000).await;
        ledger.fund(&b.address(), 100_000).await;
        let nonce = ledger.create_nonce_account(&b.address()).await;

        let build_signed = |anchor: RecencyAnchor| {
            let tx = TransactionBuilder::new(b.address())
                .durable_anchor(anchor)
                .add_instruction(programs::transfer(&a.address(), &b.address(), 100))
                .build()
                .unwrap();
            cosigner.sign(&cosigner.sign(&tx, &a).unwrap(), &b).unwrap()
        };

        let v1 = durable_anchor(&ledger, &nonce, &b.address()).await.unwrap();
        let signed_v1 = build_signed(v1);
        assert!(cosigner.is_ready(&signed_v1));

        // A different transaction consumes V1 first
        ledger.advance_nonce(&nonce).await.unwrap();

        let (tracked, outcome) = cosigner
            .broadcast_and_confirm(&ledger, &signed_v1, CONFIRM)
            .await
            .unwrap();
        assert_eq!(outcome, Outcome::Expired);
        assert_eq!(tracked.status(), TxStatus::Expired);
        assert_eq!(ledger.balance(&a.address()).await, 1_000);

        let window = ChronoDuration::seconds(EPHEMERAL_VALIDITY_SECS);
        let now = ledger.now().await;
        assert_eq!(
            recovery_action(&ledger, &v1, now, window).await.unwrap(),
            RecoveryAction::Rebuild
        );

        let v2 = durable_anchor(&ledger, &nonce, &b.address()).await.unwrap();
        assert_ne!(v1, v2);
        let signed_v2 = build_signed(v2);
        let (_, outcome) = cosigner
            .broadcast_and_confirm(&ledger, &signed_v2, CONFIRM)
            .await
            .unwrap();
        assert_eq!(outcome, Outcome::Confirmed);
        assert_eq!(ledger.balance(&a.address()).await, 900);
    }

    #[tokio::test]
    async fn test_multisig_fee_payer_two_of_three() {
        let ledger = sim_ledger();
        let (x, y, z) = (KeyPair::generate(), KeyPair::generate(), KeyPair::generate());
        let authority =
            MultisigAuthority::new(2, vec![x.address(), y.address(), z.address()], None).unwrap();
        let treasury = *authority.address();
        let recipient = KeyPair::generate().address();

        let mut registry = AuthorityRegistry::new();
        registry.register(authority.clone());
        ledger.register_authority(authority).await;
        ledger.fund(&treasury, 1_000_000).await;

        // X builds and signs
        let x_side = Cosigner::new(&registry);
        let anchor = ledger.get_recent_anchor().await.unwrap();
        let tx = x_side
            .build(
                InstructionSet::new(vec![programs::transfer(&treasury, &recipient, 5_000)]),
                treasury,
                anchor,
            )
            .unwrap();
        let by_x = x_side.sign(&tx, &x).unwrap();
        assert!(!x_side.is_ready(&by_x));
        assert_eq!(x_side.status(&by_x), TxStatus::PartiallySigned);

        // Y, in another process, only ever sees the payload
        let registry_copy: AuthorityRegistry =
            serde_json::from_str(&serde_json::to_string(&registry).unwrap()).unwrap();
        let y_side = Cosigner::new(&registry_copy);
        let received = y_side.from_relay_payload(&x_side.to_relay_payload(&by_x)).unwrap();
        let by_x_and_y = y_side.sign(&received, &y).unwrap();
        assert!(y_side.is_ready(&by_x_and_y));
        assert!(!by_x_and_y.is_signed_by(&z.address()));

        let (_, outcome) = y_side
            .broadcast_and_confirm(&ledger, &by_x_and_y, CONFIRM)
            .await
            .unwrap();
        assert_eq!(outcome, Outcome::Confirmed);
        assert_eq!(ledger.balance(&recipient).await, 5_000);
    }

    #[tokio::test]
    async fn test_ephemeral_expiry_is_safe_to_rebuild() {
        let ledger = sim_ledger();
        let registry = AuthorityRegistry::new();
        let cosigner = Cosigner::new(&registry);
        let payer = KeyPair::generate();
        ledger.fund(&payer.address(), 100_000).await;

        let build_signed = |anchor: RecencyAnchor| {
            let tx = cosigner
                .build(
                    InstructionSet::new(vec![programs::memo("late", &[payer.address()])]),
                    payer.address(),
                    anchor,
                )
                .unwrap();
            cosigner.sign(&tx, &payer).unwrap()
        };

        let stale = ledger.get_recent_anchor().await.unwrap();
        let tx = build_signed(stale);
        ledger
            .advance_clock(ChronoDuration::seconds(EPHEMERAL_VALIDITY_SECS + 5))
            .await;

        let (_, outcome) = cosigner
            .broadcast_and_confirm(&ledger, &tx, CONFIRM)
            .await
            .unwrap();
        assert_eq!(outcome, Outcome::Expired);
        assert_eq!(ledger.balance(&payer.address()).await, 100_000);

        let fresh = ledger.get_recent_anchor().await.unwrap();
        let (_, outcome) = cosigner
            .broadcast_and_confirm(&ledger, &build_signed(fresh), CONFIRM)
            .await
            .unwrap();
        assert_eq!(outcome, Outcome::Confirmed);
    }

    // =========================================================================
    // Properties
    // =========================================================================

    #[test]
    fn test_durable_without_advance_is_malformed() {
        let registry = AuthorityRegistry::new();
        let cosigner = Cosigner::new(&registry);
        let a = KeyPair::generate().address();
        let b = KeyPair::generate().address();
        let anchor = RecencyAnchor::durable(
            KeyPair::generate().address(),
            crate::crypto::Hash::new_unique(),
            b,
        );

        let result = cosigner.build(
            InstructionSet::new(vec![programs::transfer(&a, &b, 100)]),
            b,
            anchor,
        );
        assert!(matches!(
            result,
            Err(ProtocolError::BuildError(BuildError::MalformedTransaction(
                Malformation::MissingAdvanceInstruction
            )))
        ));
    }

    #[tokio::test]
    async fn test_structural_mutation_never_countersigned() {
        let ledger = sim_ledger();
        let registry = AuthorityRegistry::new();
        let cosigner = Cosigner::new(&registry);
        let a = KeyPair::generate();
        let b = KeyPair::generate();

        let tx = cosigner
            .build(
                InstructionSet::new(vec![programs::transfer(&a.address(), &b.address(), 100)]),
                b.address(),
                ledger.get_recent_anchor().await.unwrap(),
            )
            .unwrap();
        let partial = cosigner.sign(&tx, &a).unwrap();
        let expected = Expectation::exact(partial.message());
        let payload = cosigner.to_relay_payload(&partial);

        let message_len =
            u32::from_be_bytes([payload[5], payload[6], payload[7], payload[8]]) as usize;
        let mut mismatches = 0;
        for i in 9..9 + message_len {
            let mut mutated = payload.clone();
            mutated[i] ^= 0x01;
            match cosigner.countersign(&mutated, &expected, &b) {
                Err(ProtocolError::RelayError(RelayError::StructuralMismatch(_))) => {
                    mismatches += 1
                }
                Err(ProtocolError::RelayError(RelayError::CorruptRelayPayload(_))) => {}
                Err(ProtocolError::RelayError(RelayError::MalformedPayload(_))) => {}
                other => panic!("byte {} mutation was not rejected: {:?}", i, other.map(|_| ())),
            }
        }
        assert!(mismatches > 0);
    }

    #[test]
    fn test_malformed_payloads_never_countersigned() {
        let registry = AuthorityRegistry::new();
        let cosigner = Cosigner::new(&registry);
        let payer = KeyPair::generate();
        let nonce = KeyPair::generate().address();

        let empty = Transaction::unsigned(Message::new_unchecked(
            InstructionSet::default(),
            payer.address(),
            RecencyAnchor::ephemeral(crate::crypto::Hash::new_unique(), chrono::Utc::now()),
        ));
        let no_advance = Transaction::unsigned(Message::new_unchecked(
            InstructionSet::new(vec![programs::memo("skip", &[payer.address()])]),
            payer.address(),
            RecencyAnchor::durable(nonce, crate::crypto::Hash::new_unique(), payer.address()),
        ));

        for (tx, reason) in [
            (empty, Malformation::EmptyInstructions),
            (no_advance, Malformation::MissingAdvanceInstruction),
        ] {
            let payload = cosigner.to_relay_payload(&tx);
            match cosigner.from_relay_payload(&payload) {
                Err(ProtocolError::RelayError(RelayError::MalformedPayload(found))) => {
                    assert_eq!(found, reason)
                }
                other => panic!("malformed payload accepted: {:?}", other.map(|_| ())),
            }
            assert!(matches!(
                cosigner.countersign(&payload, &Expectation::new(), &payer),
                Err(ProtocolError::RelayError(RelayError::MalformedPayload(_)))
            ));
        }
    }

    #[test]
    fn test_swapped_fee_payer_reports_field() {
        let registry = AuthorityRegistry::new();
        let cosigner = Cosigner::new(&registry);
        let a = KeyPair::generate();
        let b = KeyPair::generate();
        let anchor =
            RecencyAnchor::ephemeral(crate::crypto::Hash::new_unique(), chrono::Utc::now());
        let instructions =
            InstructionSet::new(vec![programs::transfer(&a.address(), &b.address(), 100)]);

        let agreed = cosigner.build(instructions.clone(), b.address(), anchor).unwrap();
        let swapped = cosigner.build(instructions, a.address(), anchor).unwrap();
        let payload = cosigner.to_relay_payload(&cosigner.sign(&swapped, &a).unwrap());

        assert!(matches!(
            cosigner.countersign(&payload, &Expectation::exact(agreed.message()), &b),
            Err(ProtocolError::RelayError(RelayError::StructuralMismatch(
                StructuralField::FeePayer
            )))
        ));
    }

    #[test]
    fn test_signing_order_does_not_matter() {
        let registry = AuthorityRegistry::new();
        let cosigner = Cosigner::new(&registry);
        let keys = [KeyPair::generate(), KeyPair::generate(), KeyPair::generate()];
        let signers: Vec<Address> = keys.iter().map(|k| k.address()).collect();

        let tx = cosigner
            .build(
                InstructionSet::new(vec![
                    programs::transfer(&signers[1], &signers[0], 10),
                    programs::memo("three parties", &signers[2..]),
                ]),
                signers[0],
                RecencyAnchor::ephemeral(crate::crypto::Hash::new_unique(), chrono::Utc::now()),
            )
            .unwrap();

        let orders = [
            [0, 1, 2],
            [0, 2, 1],
            [1, 0, 2],
            [1, 2, 0],
            [2, 0, 1],
            [2, 1, 0],
        ];
        let results: Vec<Transaction> = orders
            .iter()
            .map(|order| {
                order.iter().fold(tx.clone(), |acc, &i| {
                    cosigner.sign(&acc, &keys[i]).unwrap()
                })
            })
            .collect();

        let expected: BTreeSet<Address> = signers.iter().copied().collect();
        for result in &results {
            assert_eq!(key_set(result), expected);
            assert_eq!(result, &results[0]);
            assert!(cosigner.is_ready(result));
        }
    }

    #[test]
    fn test_resigning_is_idempotent() {
        let registry = AuthorityRegistry::new();
        let cosigner = Cosigner::new(&registry);
        let a = KeyPair::generate();
        let tx = cosigner
            .build(
                InstructionSet::new(vec![programs::memo("hi", &[a.address()])]),
                a.address(),
                RecencyAnchor::ephemeral(crate::crypto::Hash::new_unique(), chrono::Utc::now()),
            )
            .unwrap();

        let once = cosigner.sign(&tx, &a).unwrap();
        let twice = cosigner.sign(&once, &a).unwrap();
        assert_eq!(key_set(&once), key_set(&twice));
        assert!(once.is_structurally_identical(&twice));
    }

    #[test]
    fn test_multisig_completeness_any_two() {
        let keys = [KeyPair::generate(), KeyPair::generate(), KeyPair::generate()];
        let mut registry = AuthorityRegistry::new();
        let authority = registry
            .create(2, keys.iter().map(|k| k.address()).collect(), None)
            .unwrap()
            .clone();
        let cosigner = Cosigner::new(&registry);

        let tx = cosigner
            .build(
                InstructionSet::new(vec![programs::mint_to(
                    &KeyPair::generate().address(),
                    &KeyPair::generate().address(),
                    authority.address(),
                    1_000,
                )]),
                *authority.address(),
                RecencyAnchor::ephemeral(crate::crypto::Hash::new_unique(), chrono::Utc::now()),
            )
            .unwrap();

        for i in 0..3 {
            let one = cosigner.sign(&tx, &keys[i]).unwrap();
            assert!(!cosigner.is_ready(&one));
            // Signing twice with the same member still counts once
            assert!(!cosigner.is_ready(&cosigner.sign(&one, &keys[i]).unwrap()));
            for j in 0..3 {
                if i != j {
                    let two = cosigner.sign(&one, &keys[j]).unwrap();
                    assert!(cosigner.is_ready(&two));
                }
            }
        }
    }

    #[test]
    fn test_payload_round_trip_shapes() {
        let keys = [KeyPair::generate(), KeyPair::generate(), KeyPair::generate()];
        let mut registry = AuthorityRegistry::new();
        let authority = registry
            .create(2, keys.iter().map(|k| k.address()).collect(), Some("ops".into()))
            .unwrap()
            .clone();
        let cosigner = Cosigner::new(&registry);
        let payer = KeyPair::generate();
        let nonce = KeyPair::generate().address();

        let durable = TransactionBuilder::new(payer.address())
            .durable_anchor(RecencyAnchor::durable(
                nonce,
                crate::crypto::Hash::new_unique(),
                payer.address(),
            ))
            .add_instruction(programs::memo("durable", &[]))
            .build()
            .unwrap();
        let multisig = cosigner
            .build(
                InstructionSet::new(vec![programs::transfer(
                    authority.address(),
                    &payer.address(),
                    1,
                )]),
                *authority.address(),
                RecencyAnchor::ephemeral(crate::crypto::Hash::new_unique(), chrono::Utc::now()),
            )
            .unwrap();

        let shapes = vec![
            durable.clone(),
            cosigner.sign(&durable, &payer).unwrap(),
            multisig.clone(),
            cosigner.sign(&multisig, &keys[2]).unwrap(),
            cosigner
                .sign(&cosigner.sign(&multisig, &keys[0]).unwrap(), &keys[1])
                .unwrap(),
        ];
        for tx in shapes {
            let back = cosigner
                .from_relay_payload(&cosigner.to_relay_payload(&tx))
                .unwrap();
            assert_eq!(back, tx);
        }
    }

    #[test]
    fn test_merge_concurrent_member_hops() {
        let keys = [KeyPair::generate(), KeyPair::generate(), KeyPair::generate()];
        let mut registry = AuthorityRegistry::new();
        let authority = registry
            .create(3, keys.iter().map(|k| k.address()).collect(), None)
            .unwrap()
            .clone();
        let cosigner = Cosigner::new(&registry);
        let tx = cosigner
            .build(
                InstructionSet::new(vec![programs::memo("quorum", &[*authority.address()])]),
                *authority.address(),
                RecencyAnchor::ephemeral(crate::crypto::Hash::new_unique(), chrono::Utc::now()),
            )
            .unwrap();

        let left = cosigner.sign(&cosigner.sign(&tx, &keys[0]).unwrap(), &keys[1]).unwrap();
        let right = cosigner.sign(&tx, &keys[2]).unwrap();
        assert!(!cosigner.is_ready(&left));

        let merged = cosigner.merge(&left, &right).unwrap();
        assert!(cosigner.is_ready(&merged));
    }

    #[test]
    fn test_sign_as_missing_credential() {
        let registry = AuthorityRegistry::new();
        let cosigner = Cosigner::new(&registry);
        let mut store = MemoryKeyStore::new();
        let alice = store.generate("alice").unwrap();

        let tx = cosigner
            .build(
                InstructionSet::new(vec![programs::memo("hi", &[alice])]),
                alice,
                RecencyAnchor::ephemeral(crate::crypto::Hash::new_unique(), chrono::Utc::now()),
            )
            .unwrap();

        assert!(cosigner.is_ready(&cosigner.sign_as(&tx, &store, "alice").unwrap()));
        assert!(matches!(
            cosigner.sign_as(&tx, &store, "mallory"),
            Err(ProtocolError::KeyStoreError(KeyStoreError::MissingCredential(_)))
        ));
    }

    #[test]
    fn test_unexpected_signer_is_recoverable() {
        let registry = AuthorityRegistry::new();
        let cosigner = Cosigner::new(&registry);
        let a = KeyPair::generate();
        let tx = cosigner
            .build(
                InstructionSet::new(vec![programs::memo("hi", &[a.address()])]),
                a.address(),
                RecencyAnchor::ephemeral(crate::crypto::Hash::new_unique(), chrono::Utc::now()),
            )
            .unwrap();

        let err = cosigner.sign(&tx, &KeyPair::generate()).unwrap_err();
        assert_eq!(err.class(), crate::error::ErrorClass::Signing);
        assert!(err.is_safe_to_retry());
        assert!(cosigner.is_ready(&cosigner.sign(&tx, &a).unwrap()));
    }
}
