//! Instructions and instruction sets
//!
//! An instruction is an opaque ledger operation: the program that runs it,
//! the accounts it touches (with signer/writable flags) and a data payload.
//! This crate never interprets the payload beyond the handful of system
//! operations it must recognise (see `programs`).

use crate::core::anchor::RecencyAnchor;
use crate::crypto::Address;
use bitflags::bitflags;

bitflags! {
    /// Per-account access flags within one instruction
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
    pub struct AccountFlags: u8 {
        /// The account must sign the transaction
        const SIGNER = 0b0000_0001;
        /// The instruction may modify the account
        const WRITABLE = 0b0000_0010;
    }
}

/// An account referenced by an instruction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AccountMeta {
    pub address: Address,
    pub flags: AccountFlags,
}

impl AccountMeta {
    /// A writable account
    pub fn new(address: Address, is_signer: bool) -> Self {
        let mut flags = AccountFlags::WRITABLE;
        flags.set(AccountFlags::SIGNER, is_signer);
        Self { address, flags }
    }

    /// A read-only account
    pub fn readonly(address: Address, is_signer: bool) -> Self {
        let mut flags = AccountFlags::empty();
        flags.set(AccountFlags::SIGNER, is_signer);
        Self { address, flags }
    }

    pub fn is_signer(&self) -> bool {
        self.flags.contains(AccountFlags::SIGNER)
    }

    pub fn is_writable(&self) -> bool {
        self.flags.contains(AccountFlags::WRITABLE)
    }
}

/// A single ledger operation. Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Instruction {
    program_id: Address,
    accounts: Vec<AccountMeta>,
    data: Vec<u8>,
}

impl Instruction {
    pub fn new(program_id: Address, accounts: Vec<AccountMeta>, data: Vec<u8>) -> Self {
        Self {
            program_id,
            accounts,
            data,
        }
    }

    pub fn program_id(&self) -> &Address {
        &self.program_id
    }

    pub fn accounts(&self) -> &[AccountMeta] {
        &self.accounts
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Accounts flagged as signers, in declaration order
    pub fn signers(&self) -> impl Iterator<Item = &Address> {
        self.accounts
            .iter()
            .filter(|meta| meta.is_signer())
            .map(|meta| &meta.address)
    }
}

/// Ordered, immutable list of instructions
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct InstructionSet {
    instructions: Vec<Instruction>,
}

impl InstructionSet {
    pub fn new(instructions: Vec<Instruction>) -> Self {
        Self { instructions }
    }

    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    pub fn first(&self) -> Option<&Instruction> {
        self.instructions.first()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Instruction> {
        self.instructions.iter()
    }

    pub fn as_slice(&self) -> &[Instruction] {
        &self.instructions
    }

    /// A new set with `instruction` placed ahead of the existing ones
    pub fn prepend(&self, instruction: Instruction) -> Self {
        let mut instructions = Vec::with_capacity(self.instructions.len() + 1);
        instructions.push(instruction);
        instructions.extend(self.instructions.iter().cloned());
        Self { instructions }
    }

    /// A new set opened by the anchor's nonce advance, if it has one
    pub fn with_nonce_advance(&self, anchor: &RecencyAnchor) -> Self {
        match anchor.advance_instruction() {
            Some(advance) => self.prepend(advance),
            None => self.clone(),
        }
    }

    /// Every account flagged as a signer, deduplicated, first occurrence wins
    pub fn signers(&self) -> Vec<Address> {
        let mut seen = Vec::new();
        for address in self.instructions.iter().flat_map(|ix| ix.signers()) {
            if !seen.contains(address) {
                seen.push(*address);
            }
        }
        seen
    }

    /// Whether any instruction runs under the given program id
    pub fn invokes(&self, program_id: &Address) -> bool {
        self.instructions
            .iter()
            .any(|ix| ix.program_id() == program_id)
    }
}

impl From<Vec<Instruction>> for InstructionSet {
    fn from(instructions: Vec<Instruction>) -> Self {
        Self::new(instructions)
    }
}

impl<'a> IntoIterator for &'a InstructionSet {
    type Item = &'a Instruction;
    type IntoIter = std::slice::Iter<'a, Instruction>;

    fn into_iter(self) -> Self::IntoIter {
        self.instructions.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::KeyPair;

    fn program() -> Address {
        Address::program(b"test")
    }

    #[test]
    fn test_account_meta_flags() {
        let address = KeyPair::generate().address();

        let meta = AccountMeta::new(address, true);
        assert!(meta.is_signer());
        assert!(meta.is_writable());

        let meta = AccountMeta::readonly(address, false);
        assert!(!meta.is_signer());
        assert!(!meta.is_writable());
    }

    #[test]
    fn test_signers_deduplicated_in_order() {
        let a = KeyPair::generate().address();
        let b = KeyPair::generate().address();
        let c = KeyPair::generate().address();

        let set = InstructionSet::new(vec![
            Instruction::new(
                program(),
                vec![AccountMeta::new(b, true), AccountMeta::new(c, false)],
                vec![],
            ),
            Instruction::new(
                program(),
                vec![AccountMeta::readonly(a, true), AccountMeta::new(b, true)],
                vec![1],
            ),
        ]);

        assert_eq!(set.signers(), vec![b, a]);
    }

    #[test]
    fn test_prepend_does_not_mutate_original() {
        let a = KeyPair::generate().address();
        let original = InstructionSet::new(vec![Instruction::new(
            program(),
            vec![AccountMeta::new(a, true)],
            vec![7],
        )]);
        let extended = original.prepend(Instruction::new(program(), vec![], vec![0]));

        assert_eq!(original.len(), 1);
        assert_eq!(extended.len(), 2);
        assert_eq!(extended.first().unwrap().data(), &[0]);
    }
}
