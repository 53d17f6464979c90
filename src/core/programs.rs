//! Well-known programs and their instruction constructors
//!
//! The ledger executes these; this crate only encodes them. The system
//! program is the one exception that is also decoded, because durable
//! nonce transactions must be recognised at build time.

use crate::core::instruction::{AccountMeta, Instruction};
use crate::crypto::Address;
use bytes::{Buf, BufMut};
use thiserror::Error;

pub const SYSTEM_PROGRAM_ID: Address = Address::program(b"system");
pub const TOKEN_PROGRAM_ID: Address = Address::program(b"token");
pub const MEMO_PROGRAM_ID: Address = Address::program(b"memo");

/// Read-only sysvar the nonce program consults for recent blockhashes
pub const RECENT_BLOCKHASHES_SYSVAR: Address = Address::program(b"sysvar_recent_blockhashes");

/// Size of a nonce account's data
pub const NONCE_ACCOUNT_LENGTH: u64 = 80;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum InstructionError {
    #[error("Instruction data truncated")]
    Truncated,
    #[error("Unknown system instruction tag {0}")]
    UnknownTag(u32),
}

/// System program operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SystemInstruction {
    CreateAccount {
        lamports: u64,
        space: u64,
        owner: Address,
    },
    Transfer {
        lamports: u64,
    },
    AdvanceNonceAccount,
    InitializeNonceAccount {
        authority: Address,
    },
}

impl SystemInstruction {
    const CREATE_ACCOUNT: u32 = 0;
    const TRANSFER: u32 = 2;
    const ADVANCE_NONCE: u32 = 4;
    const INITIALIZE_NONCE: u32 = 6;

    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(48);
        match self {
            SystemInstruction::CreateAccount {
                lamports,
                space,
                owner,
            } => {
                out.put_u32_le(Self::CREATE_ACCOUNT);
                out.put_u64_le(*lamports);
                out.put_u64_le(*space);
                out.put_slice(owner.as_bytes());
            }
            SystemInstruction::Transfer { lamports } => {
                out.put_u32_le(Self::TRANSFER);
                out.put_u64_le(*lamports);
            }
            SystemInstruction::AdvanceNonceAccount => {
                out.put_u32_le(Self::ADVANCE_NONCE);
            }
            SystemInstruction::InitializeNonceAccount { authority } => {
                out.put_u32_le(Self::INITIALIZE_NONCE);
                out.put_slice(authority.as_bytes());
            }
        }
        out
    }

    pub fn decode(mut data: &[u8]) -> Result<Self, InstructionError> {
        if data.remaining() < 4 {
            return Err(InstructionError::Truncated);
        }
        match data.get_u32_le() {
            Self::CREATE_ACCOUNT => {
                if data.remaining() < 16 + crate::crypto::ADDRESS_BYTES {
                    return Err(InstructionError::Truncated);
                }
                let lamports = data.get_u64_le();
                let space = data.get_u64_le();
                let owner = read_address(&mut data)?;
                Ok(SystemInstruction::CreateAccount {
                    lamports,
                    space,
                    owner,
                })
            }
            Self::TRANSFER => {
                if data.remaining() < 8 {
                    return Err(InstructionError::Truncated);
                }
                Ok(SystemInstruction::Transfer {
                    lamports: data.get_u64_le(),
                })
            }
            Self::ADVANCE_NONCE => Ok(SystemInstruction::AdvanceNonceAccount),
            Self::INITIALIZE_NONCE => Ok(SystemInstruction::InitializeNonceAccount {
                authority: read_address(&mut data)?,
            }),
            tag => Err(InstructionError::UnknownTag(tag)),
        }
    }
}

fn read_address(data: &mut &[u8]) -> Result<Address, InstructionError> {
    let mut bytes = [0u8; crate::crypto::ADDRESS_BYTES];
    if data.remaining() < bytes.len() {
        return Err(InstructionError::Truncated);
    }
    data.copy_to_slice(&mut bytes);
    Ok(Address::new(bytes))
}

/// Move `lamports` from `from` (signer) to `to`
pub fn transfer(from: &Address, to: &Address, lamports: u64) -> Instruction {
    Instruction::new(
        SYSTEM_PROGRAM_ID,
        vec![AccountMeta::new(*from, true), AccountMeta::new(*to, false)],
        SystemInstruction::Transfer { lamports }.encode(),
    )
}

/// Consume the nonce account's current value and store a fresh one
///
/// Must be the first instruction of any transaction anchored on this nonce.
pub fn advance_nonce(nonce_account: &Address, authority: &Address) -> Instruction {
    Instruction::new(
        SYSTEM_PROGRAM_ID,
        vec![
            AccountMeta::new(*nonce_account, false),
            AccountMeta::readonly(RECENT_BLOCKHASHES_SYSVAR, false),
            AccountMeta::readonly(*authority, true),
        ],
        SystemInstruction::AdvanceNonceAccount.encode(),
    )
}

/// If `instruction` is a nonce advance, the (nonce account, authority) it names
pub fn as_nonce_advance(instruction: &Instruction) -> Option<(Address, Address)> {
    if instruction.program_id() != &SYSTEM_PROGRAM_ID {
        return None;
    }
    match SystemInstruction::decode(instruction.data()) {
        Ok(SystemInstruction::AdvanceNonceAccount) => {
            let accounts = instruction.accounts();
            match (accounts.first(), accounts.get(2)) {
                (Some(nonce), Some(authority)) => Some((nonce.address, authority.address)),
                _ => None,
            }
        }
        _ => None,
    }
}

/// True iff the advance lists its authority as a signer
pub fn authority_signs_advance(instruction: &Instruction) -> bool {
    instruction
        .accounts()
        .get(2)
        .map_or(false, |authority| authority.is_signer())
}

/// Fund and initialise a new nonce account controlled by `authority`
///
/// Both `from` and the new `nonce_account` key must sign.
pub fn create_nonce_account(
    from: &Address,
    nonce_account: &Address,
    authority: &Address,
    lamports: u64,
) -> Vec<Instruction> {
    vec![
        Instruction::new(
            SYSTEM_PROGRAM_ID,
            vec![
                AccountMeta::new(*from, true),
                AccountMeta::new(*nonce_account, true),
            ],
            SystemInstruction::CreateAccount {
                lamports,
                space: NONCE_ACCOUNT_LENGTH,
                owner: SYSTEM_PROGRAM_ID,
            }
            .encode(),
        ),
        Instruction::new(
            SYSTEM_PROGRAM_ID,
            vec![
                AccountMeta::new(*nonce_account, false),
                AccountMeta::readonly(RECENT_BLOCKHASHES_SYSVAR, false),
            ],
            SystemInstruction::InitializeNonceAccount {
                authority: *authority,
            }
            .encode(),
        ),
    ]
}

const TOKEN_TRANSFER: u8 = 3;
const TOKEN_MINT_TO: u8 = 7;

/// Move token units between two token accounts; `owner` signs
pub fn token_transfer(
    source: &Address,
    destination: &Address,
    owner: &Address,
    amount: u64,
) -> Instruction {
    let mut data = Vec::with_capacity(9);
    data.put_u8(TOKEN_TRANSFER);
    data.put_u64_le(amount);
    Instruction::new(
        TOKEN_PROGRAM_ID,
        vec![
            AccountMeta::new(*source, false),
            AccountMeta::new(*destination, false),
            AccountMeta::readonly(*owner, true),
        ],
        data,
    )
}

/// Mint new units to `destination`; `mint_authority` signs
///
/// The authority may be a multisig address, in which case the resolver
/// expands it into its members.
pub fn mint_to(
    mint: &Address,
    destination: &Address,
    mint_authority: &Address,
    amount: u64,
) -> Instruction {
    let mut data = Vec::with_capacity(9);
    data.put_u8(TOKEN_MINT_TO);
    data.put_u64_le(amount);
    Instruction::new(
        TOKEN_PROGRAM_ID,
        vec![
            AccountMeta::new(*mint, false),
            AccountMeta::new(*destination, false),
            AccountMeta::readonly(*mint_authority, true),
        ],
        data,
    )
}

/// Attach a UTF-8 note, signed by each of `signers`
pub fn memo(text: &str, signers: &[Address]) -> Instruction {
    Instruction::new(
        MEMO_PROGRAM_ID,
        signers
            .iter()
            .map(|s| AccountMeta::readonly(*s, true))
            .collect(),
        text.as_bytes().to_vec(),
    )
}
