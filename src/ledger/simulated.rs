//! In-memory ledger
//!
//! Behaves like the real thing where this crate can observe it: blockhashes
//! expire, nonce values are consumed once, signatures and multisig
//! thresholds are verified, fees are charged and system transfers move
//! balances. A submission either applies in full or not at all.

use crate::core::codec;
use crate::core::programs::{self, SystemInstruction, SYSTEM_PROGRAM_ID};
use crate::core::{RecencyAnchor, Transaction, EPHEMERAL_VALIDITY_SECS};
use crate::crypto::{Address, Hash, KeyPair};
use crate::ledger::rpc::{LedgerError, LedgerRpc, Outcome, DEFAULT_POLL_INTERVAL};
use crate::multisig::{AuthorityRegistry, MultisigAuthority, MultisigResolver};
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::RwLock;

/// Fee charged per signature carried by a transaction
pub const FEE_PER_SIGNATURE: u64 = 5000;

#[derive(Debug, Clone)]
struct NonceState {
    authority: Address,
    value: Hash,
}

#[derive(Debug)]
struct LedgerState {
    clock_offset: ChronoDuration,
    blockhashes: HashMap<Hash, DateTime<Utc>>,
    nonces: HashMap<Address, NonceState>,
    balances: HashMap<Address, u64>,
    submissions: HashMap<String, Outcome>,
    authorities: AuthorityRegistry,
}

impl LedgerState {
    fn now(&self) -> DateTime<Utc> {
        Utc::now() + self.clock_offset
    }
}

/// Account changes staged while executing one transaction
struct Staged {
    nonces: HashMap<Address, NonceState>,
    balances: HashMap<Address, u64>,
}

impl Staged {
    fn debit(&mut self, address: &Address, amount: u64) -> Result<(), String> {
        let balance = self.balances.get(address).copied().unwrap_or(0);
        if balance < amount {
            return Err(format!(
                "insufficient funds in {}: {} < {}",
                address.short(),
                balance,
                amount
            ));
        }
        self.balances.insert(*address, balance - amount);
        Ok(())
    }

    fn credit(&mut self, address: &Address, amount: u64) {
        let balance = self.balances.entry(*address).or_insert(0);
        *balance = balance.saturating_add(amount);
    }
}

/// Ledger simulation for tests and demos
#[derive(Debug)]
pub struct SimulatedLedger {
    state: RwLock<LedgerState>,
    validity_window: ChronoDuration,
    poll_interval: Duration,
}

impl Default for SimulatedLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedLedger {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(LedgerState {
                clock_offset: ChronoDuration::zero(),
                blockhashes: HashMap::new(),
                nonces: HashMap::new(),
                balances: HashMap::new(),
                submissions: HashMap::new(),
                authorities: AuthorityRegistry::new(),
            }),
            validity_window: ChronoDuration::seconds(EPHEMERAL_VALIDITY_SECS),
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn with_validity_window(mut self, window: Duration) -> Self {
        self.validity_window =
            ChronoDuration::from_std(window).unwrap_or(self.validity_window);
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Make a multisig authority known to the ledger
    pub async fn register_authority(&self, authority: MultisigAuthority) {
        self.state.write().await.authorities.register(authority);
    }

    pub async fn fund(&self, address: &Address, amount: u64) {
        let mut state = self.state.write().await;
        let balance = state.balances.entry(*address).or_insert(0);
        *balance = balance.saturating_add(amount);
    }

    pub async fn balance(&self, address: &Address) -> u64 {
        self.state
            .read()
            .await
            .balances
            .get(address)
            .copied()
            .unwrap_or(0)
    }

    /// Create a nonce account directly, returning its address
    pub async fn create_nonce_account(&self, authority: &Address) -> Address {
        let account = KeyPair::generate().address();
        let mut state = self.state.write().await;
        state.nonces.insert(
            account,
            NonceState {
                authority: *authority,
                value: Hash::new_unique(),
            },
        );
        log::info!("Created nonce account {} for {}", account, authority.short());
        account
    }

    /// Advance a nonce from outside, as a competing transaction would
    pub async fn advance_nonce(&self, account: &Address) -> Result<Hash, LedgerError> {
        let mut state = self.state.write().await;
        let nonce = state
            .nonces
            .get_mut(account)
            .ok_or(LedgerError::UnknownNonceAccount(*account))?;
        nonce.value = Hash::new_unique();
        log::info!("Nonce {} advanced to {}", account.short(), nonce.value);
        Ok(nonce.value)
    }

    /// Move the ledger clock forward
    pub async fn advance_clock(&self, by: ChronoDuration) {
        let mut state = self.state.write().await;
        state.clock_offset = state.clock_offset + by;
    }

    pub async fn now(&self) -> DateTime<Utc> {
        self.state.read().await.now()
    }

    fn process(&self, state: &mut LedgerState, tx: &Transaction) -> Outcome {
        if let Some(address) = tx.invalid_signers().first() {
            return Outcome::Rejected(format!("invalid signature from {}", address));
        }

        let resolver = MultisigResolver::new(&state.authorities);
        if !resolver.is_complete(tx) {
            return Outcome::Rejected("missing required signatures".to_string());
        }

        let message = tx.message();
        match message.anchor() {
            RecencyAnchor::Ephemeral { blockhash, .. } => match state.blockhashes.get(blockhash) {
                Some(issued) if state.now() < *issued + self.validity_window => {}
                _ => return Outcome::Expired,
            },
            RecencyAnchor::Durable {
                nonce_account,
                value,
                authority,
            } => {
                let advance = message
                    .instructions()
                    .first()
                    .and_then(programs::as_nonce_advance);
                if advance != Some((*nonce_account, *authority)) {
                    return Outcome::Rejected(
                        "durable transaction must advance its nonce first".to_string(),
                    );
                }
                match state.nonces.get(nonce_account) {
                    None => {
                        return Outcome::Rejected(format!("unknown nonce account {}", nonce_account))
                    }
                    Some(nonce) if nonce.value != *value => return Outcome::Expired,
                    Some(nonce) if nonce.authority != *authority => {
                        return Outcome::Rejected("nonce authority mismatch".to_string())
                    }
                    Some(_) => {}
                }
            }
        }

        let mut staged = Staged {
            nonces: state.nonces.clone(),
            balances: state.balances.clone(),
        };
        let fee = FEE_PER_SIGNATURE * tx.signature_count() as u64;
        if let Err(reason) = staged.debit(message.fee_payer(), fee) {
            return Outcome::Rejected(format!("cannot pay fee: {}", reason));
        }
        if let Err(reason) = execute(&mut staged, tx) {
            return Outcome::Rejected(reason);
        }

        state.nonces = staged.nonces;
        state.balances = staged.balances;
        Outcome::Confirmed
    }
}

fn execute(staged: &mut Staged, tx: &Transaction) -> Result<(), String> {
    for instruction in tx.message().instructions() {
        if instruction.program_id() != &SYSTEM_PROGRAM_ID {
            continue;
        }
        let account = |i: usize| {
            instruction
                .accounts()
                .get(i)
                .map(|meta| meta.address)
                .ok_or_else(|| format!("system instruction missing account {}", i))
        };
        // Signatures were checked against the signer flags before execution
        let signer = |i: usize| {
            let address = account(i)?;
            match instruction.accounts().get(i) {
                Some(meta) if meta.is_signer() => Ok(address),
                _ => Err(format!("account {} must sign", address)),
            }
        };

        match SystemInstruction::decode(instruction.data()).map_err(|e| e.to_string())? {
            SystemInstruction::Transfer { lamports } => {
                staged.debit(&signer(0)?, lamports)?;
                staged.credit(&account(1)?, lamports);
            }
            SystemInstruction::CreateAccount { lamports, .. } => {
                let new_account = account(1)?;
                if staged.balances.contains_key(&new_account) {
                    return Err(format!("account {} already in use", new_account));
                }
                staged.debit(&signer(0)?, lamports)?;
                staged.credit(&new_account, lamports);
            }
            SystemInstruction::InitializeNonceAccount { authority } => {
                let nonce_account = account(0)?;
                if staged.nonces.contains_key(&nonce_account) {
                    return Err(format!("nonce account {} already initialized", nonce_account));
                }
                staged.nonces.insert(
                    nonce_account,
                    NonceState {
                        authority,
                        value: Hash::new_unique(),
                    },
                );
            }
            SystemInstruction::AdvanceNonceAccount => {
                let nonce_account = account(0)?;
                let nonce = staged
                    .nonces
                    .get_mut(&nonce_account)
                    .ok_or_else(|| format!("unknown nonce account {}", nonce_account))?;
                if signer(2)? != nonce.authority {
                    return Err(format!("nonce {} advanced by a non-authority", nonce_account));
                }
                nonce.value = Hash::new_unique();
            }
        }
    }
    Ok(())
}

impl LedgerRpc for SimulatedLedger {
    async fn submit(&self, signed: &[u8]) -> Result<String, LedgerError> {
        let tx = codec::decode_transaction(signed).map_err(LedgerError::UndecodableSubmission)?;
        let id = tx.id().ok_or(LedgerError::Unsigned)?.to_base58();

        let mut state = self.state.write().await;
        if state.submissions.contains_key(&id) {
            log::info!("Duplicate submission {}", id);
            return Ok(id);
        }

        let outcome = self.process(&mut state, &tx);
        match &outcome {
            Outcome::Confirmed => log::info!("Submission {} confirmed", id),
            Outcome::Expired => log::warn!("Submission {} expired", id),
            Outcome::Rejected(reason) => log::warn!("Submission {} rejected: {}", id, reason),
        }
        state.submissions.insert(id.clone(), outcome);
        Ok(id)
    }

    async fn get_nonce(&self, account: &Address) -> Result<Hash, LedgerError> {
        self.state
            .read()
            .await
            .nonces
            .get(account)
            .map(|nonce| nonce.value)
            .ok_or(LedgerError::UnknownNonceAccount(*account))
    }

    async fn get_recent_anchor(&self) -> Result<RecencyAnchor, LedgerError> {
        let mut state = self.state.write().await;
        let blockhash = Hash::new_unique();
        let now = state.now();
        state.blockhashes.insert(blockhash, now);
        Ok(RecencyAnchor::ephemeral(blockhash, now))
    }

    async fn status(&self, submission_id: &str) -> Result<Option<Outcome>, LedgerError> {
        match self.state.read().await.submissions.get(submission_id) {
            Some(outcome) => Ok(Some(outcome.clone())),
            None => Err(LedgerError::UnknownSubmission(submission_id.to_string())),
        }
    }

    fn poll_interval(&self) -> Duration {
        self.poll_interval
    }
}
