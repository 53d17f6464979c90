//! Transaction construction
//!
//! Assembles instructions, a fee payer and a recency anchor into an
//! unsigned transaction. Construction is pure and validates everything the
//! ledger would otherwise reject for structural reasons.

use crate::core::anchor::RecencyAnchor;
use crate::core::instruction::{Instruction, InstructionSet};
use crate::core::programs;
use crate::core::transaction::{Message, Transaction};
use crate::crypto::{Address, PROGRAM_PREFIX};
use thiserror::Error;

/// Why a transaction could not be built
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Malformation {
    #[error("instruction list is empty")]
    EmptyInstructions,
    #[error("no recency anchor set")]
    MissingAnchor,
    #[error("durable anchor requires a nonce advance as the first instruction")]
    MissingAdvanceInstruction,
    #[error("advance instruction names nonce account {found}, anchor uses {expected}")]
    AdvanceNonceMismatch { expected: Address, found: Address },
    #[error("advance instruction names authority {found}, anchor uses {expected}")]
    AdvanceAuthorityMismatch { expected: Address, found: Address },
    #[error("nonce authority {0} is not marked as a signer of the advance")]
    UnsignedNonceAuthority(Address),
    #[error("nonce account {0} advanced more than once")]
    RepeatedAdvance(Address),
    #[error("fee payer {0} is a program and cannot sign")]
    FeePayerCannotSign(Address),
}

/// Construction errors: local, never retried
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BuildError {
    #[error("Malformed transaction: {0}")]
    MalformedTransaction(#[from] Malformation),
}

/// Check the durable-anchor rules against an instruction list
fn check_durable(
    instructions: &InstructionSet,
    nonce_account: &Address,
    authority: &Address,
) -> Result<(), Malformation> {
    let advance = instructions
        .first()
        .ok_or(Malformation::MissingAdvanceInstruction)?;
    let (found_nonce, found_authority) =
        programs::as_nonce_advance(advance).ok_or(Malformation::MissingAdvanceInstruction)?;

    if &found_nonce != nonce_account {
        return Err(Malformation::AdvanceNonceMismatch {
            expected: *nonce_account,
            found: found_nonce,
        });
    }
    if &found_authority != authority {
        return Err(Malformation::AdvanceAuthorityMismatch {
            expected: *authority,
            found: found_authority,
        });
    }
    if !programs::authority_signs_advance(advance) {
        return Err(Malformation::UnsignedNonceAuthority(found_authority));
    }

    let repeated = instructions
        .iter()
        .skip(1)
        .filter_map(programs::as_nonce_advance)
        .any(|(nonce, _)| &nonce == nonce_account);
    if repeated {
        return Err(Malformation::RepeatedAdvance(*nonce_account));
    }

    Ok(())
}

fn check_fields(
    instructions: &InstructionSet,
    fee_payer: &Address,
    anchor: &RecencyAnchor,
) -> Result<(), Malformation> {
    if instructions.is_empty() {
        return Err(Malformation::EmptyInstructions);
    }

    // The fee payer heads the required-signer set, so it must be signable
    if fee_payer.prefix() == PROGRAM_PREFIX {
        return Err(Malformation::FeePayerCannotSign(*fee_payer));
    }

    if let RecencyAnchor::Durable {
        nonce_account,
        authority,
        ..
    } = anchor
    {
        check_durable(instructions, nonce_account, authority)?;
    }

    Ok(())
}

/// Re-check the construction rules on a message obtained some other way
pub fn validate(message: &Message) -> Result<(), Malformation> {
    check_fields(message.instructions(), message.fee_payer(), message.anchor())
}

/// Validate and assemble an unsigned transaction
pub fn build(
    instructions: InstructionSet,
    fee_payer: Address,
    anchor: RecencyAnchor,
) -> Result<Transaction, BuildError> {
    check_fields(&instructions, &fee_payer, &anchor)?;

    let message = Message::new_unchecked(instructions, fee_payer, anchor);
    log::debug!(
        "Built {} transaction {} ({} instructions, fee payer {})",
        anchor.kind(),
        message.digest(),
        message.instructions().len(),
        fee_payer.short()
    );
    Ok(Transaction::unsigned(message))
}

/// Fluent builder for transactions
pub struct TransactionBuilder {
    fee_payer: Address,
    anchor: Option<RecencyAnchor>,
    instructions: Vec<Instruction>,
    prepend_advance: bool,
}

impl TransactionBuilder {
    pub fn new(fee_payer: Address) -> Self {
        Self {
            fee_payer,
            anchor: None,
            instructions: Vec::new(),
            prepend_advance: false,
        }
    }

    /// Set the recency anchor
    pub fn anchor(mut self, anchor: RecencyAnchor) -> Self {
        self.anchor = Some(anchor);
        self
    }

    /// Set a durable anchor and place its advance instruction first
    pub fn durable_anchor(mut self, anchor: RecencyAnchor) -> Self {
        self.prepend_advance = anchor.is_durable();
        self.anchor = Some(anchor);
        self
    }

    /// Add an instruction
    pub fn add_instruction(mut self, instruction: Instruction) -> Self {
        self.instructions.push(instruction);
        self
    }

    /// Add several instructions in order
    pub fn add_instructions(mut self, instructions: impl IntoIterator<Item = Instruction>) -> Self {
        self.instructions.extend(instructions);
        self
    }

    /// Build without signing
    pub fn build(self) -> Result<Transaction, BuildError> {
        let anchor = self.anchor.ok_or(Malformation::MissingAnchor)?;
        let mut instructions = InstructionSet::new(self.instructions);
        if self.prepend_advance && !instructions.is_empty() {
            instructions = instructions.with_nonce_advance(&anchor);
        }
        build(instructions, self.fee_payer, anchor)
    }
}
