//! Canonical binary encoding
//!
//! Two structurally identical transactions always encode to the same
//! message bytes, and the signature section is written in ascending
//! address order, so the full payload is deterministic too. Decoding is
//! strict: any deviation from the canonical form is rejected rather than
//! normalised, so one payload has exactly one meaning.
//!
//! Layout (integers big-endian):
//!
//! ```text
//! payload   = MAGIC "CSRL" | version u8 | msg_len u32 | message | sig_count u32 | (address | signature)*
//! message   = fee_payer | anchor | ix_count u32 | instruction*
//! anchor    = 0 | blockhash | issued_at_ms i64
//!           | 1 | nonce_account | value | authority
//! instruction = program_id | meta_count u32 | (address | flags u8)* | data_len u32 | data
//! ```

use crate::core::anchor::RecencyAnchor;
use crate::core::instruction::{AccountFlags, AccountMeta, Instruction, InstructionSet};
use crate::core::transaction::{Message, Transaction};
use crate::crypto::{Address, Hash, Signature, ADDRESS_BYTES, HASH_BYTES, SIGNATURE_BYTES};
use bytes::{Buf, BufMut};
use std::collections::BTreeMap;
use thiserror::Error;

/// Payload magic bytes
pub const MAGIC: [u8; 4] = *b"CSRL";

/// Payload format version
pub const CODEC_VERSION: u8 = 1;

const ANCHOR_EPHEMERAL: u8 = 0;
const ANCHOR_DURABLE: u8 = 1;

/// Smallest possible encoded instruction: program id + two empty counts
const MIN_INSTRUCTION_BYTES: usize = ADDRESS_BYTES + 4 + 4;
const META_BYTES: usize = ADDRESS_BYTES + 1;
const SIGNATURE_ENTRY_BYTES: usize = ADDRESS_BYTES + SIGNATURE_BYTES;

/// Decoding failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    #[error("Invalid magic bytes")]
    BadMagic,
    #[error("Unsupported payload version {0}")]
    UnsupportedVersion(u8),
    #[error("Payload truncated: need {need} more bytes, have {have}")]
    Truncated { need: usize, have: usize },
    #[error("Unknown anchor tag {0}")]
    UnknownAnchorTag(u8),
    #[error("Invalid account flags {0:#04x}")]
    InvalidFlags(u8),
    #[error("Signatures not in canonical order at {0}")]
    NonCanonicalSignatureOrder(Address),
    #[error("{0} trailing bytes after payload")]
    TrailingBytes(usize),
}

// =============================================================================
// Encoding
// =============================================================================

fn put_anchor(out: &mut Vec<u8>, anchor: &RecencyAnchor) {
    match anchor {
        RecencyAnchor::Ephemeral {
            blockhash,
            issued_at_ms,
        } => {
            out.put_u8(ANCHOR_EPHEMERAL);
            out.put_slice(blockhash.as_bytes());
            out.put_i64(*issued_at_ms);
        }
        RecencyAnchor::Durable {
            nonce_account,
            value,
            authority,
        } => {
            out.put_u8(ANCHOR_DURABLE);
            out.put_slice(nonce_account.as_bytes());
            out.put_slice(value.as_bytes());
            out.put_slice(authority.as_bytes());
        }
    }
}

fn put_instruction(out: &mut Vec<u8>, instruction: &Instruction) {
    out.put_slice(instruction.program_id().as_bytes());
    out.put_u32(instruction.accounts().len() as u32);
    for meta in instruction.accounts() {
        out.put_slice(meta.address.as_bytes());
        out.put_u8(meta.flags.bits());
    }
    out.put_u32(instruction.data().len() as u32);
    out.put_slice(instruction.data());
}

/// Canonical bytes of the structural fields
pub fn encode_message(message: &Message) -> Vec<u8> {
    let mut out = Vec::with_capacity(256);
    out.put_slice(message.fee_payer().as_bytes());
    put_anchor(&mut out, message.anchor());
    out.put_u32(message.instructions().len() as u32);
    for instruction in message.instructions() {
        put_instruction(&mut out, instruction);
    }
    out
}

/// Full payload: header, message, signatures in address order
pub fn encode_transaction(tx: &Transaction) -> Vec<u8> {
    let message = encode_message(tx.message());
    let mut out =
        Vec::with_capacity(9 + message.len() + 4 + tx.signature_count() * SIGNATURE_ENTRY_BYTES);
    out.put_slice(&MAGIC);
    out.put_u8(CODEC_VERSION);
    out.put_u32(message.len() as u32);
    out.put_slice(&message);
    out.put_u32(tx.signature_count() as u32);
    for (address, signature) in tx.signatures() {
        out.put_slice(address.as_bytes());
        out.put_slice(signature.as_bytes());
    }
    out
}

// =============================================================================
// Decoding
// =============================================================================

struct Reader<'a> {
    buf: &'a [u8],
}

impl<'a> Reader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf }
    }

    fn need(&self, n: usize) -> Result<(), CodecError> {
        if self.buf.remaining() < n {
            return Err(CodecError::Truncated {
                need: n,
                have: self.buf.remaining(),
            });
        }
        Ok(())
    }

    /// Reject counts that could not possibly fit in the remaining input
    fn need_items(&self, count: usize, item_size: usize) -> Result<(), CodecError> {
        self.need(count.saturating_mul(item_size))
    }

    fn u8(&mut self) -> Result<u8, CodecError> {
        self.need(1)?;
        Ok(self.buf.get_u8())
    }

    fn u32(&mut self) -> Result<usize, CodecError> {
        self.need(4)?;
        Ok(self.buf.get_u32() as usize)
    }

    fn i64(&mut self) -> Result<i64, CodecError> {
        self.need(8)?;
        Ok(self.buf.get_i64())
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N], CodecError> {
        self.need(N)?;
        let mut out = [0u8; N];
        self.buf.copy_to_slice(&mut out);
        Ok(out)
    }

    fn address(&mut self) -> Result<Address, CodecError> {
        Ok(Address::new(self.array::<ADDRESS_BYTES>()?))
    }

    fn hash(&mut self) -> Result<Hash, CodecError> {
        Ok(Hash::new(self.array::<HASH_BYTES>()?))
    }

    fn bytes(&mut self, len: usize) -> Result<&'a [u8], CodecError> {
        self.need(len)?;
        let (head, tail) = self.buf.split_at(len);
        self.buf = tail;
        Ok(head)
    }

    fn finish(self) -> Result<(), CodecError> {
        match self.buf.remaining() {
            0 => Ok(()),
            n => Err(CodecError::TrailingBytes(n)),
        }
    }
}

fn read_anchor(reader: &mut Reader<'_>) -> Result<RecencyAnchor, CodecError> {
    match reader.u8()? {
        ANCHOR_EPHEMERAL => Ok(RecencyAnchor::Ephemeral {
            blockhash: reader.hash()?,
            issued_at_ms: reader.i64()?,
        }),
        ANCHOR_DURABLE => Ok(RecencyAnchor::Durable {
            nonce_account: reader.address()?,
            value: reader.hash()?,
            authority: reader.address()?,
        }),
        tag => Err(CodecError::UnknownAnchorTag(tag)),
    }
}

fn read_instruction(reader: &mut Reader<'_>) -> Result<Instruction, CodecError> {
    let program_id = reader.address()?;

    let meta_count = reader.u32()?;
    reader.need_items(meta_count, META_BYTES)?;
    let mut accounts = Vec::with_capacity(meta_count);
    for _ in 0..meta_count {
        let address = reader.address()?;
        let raw = reader.u8()?;
        let flags = AccountFlags::from_bits(raw).ok_or(CodecError::InvalidFlags(raw))?;
        accounts.push(AccountMeta { address, flags });
    }

    let data_len = reader.u32()?;
    let data = reader.bytes(data_len)?.to_vec();

    Ok(Instruction::new(program_id, accounts, data))
}

fn read_message(reader: &mut Reader<'_>) -> Result<Message, CodecError> {
    let fee_payer = reader.address()?;
    let anchor = read_anchor(reader)?;

    let count = reader.u32()?;
    reader.need_items(count, MIN_INSTRUCTION_BYTES)?;
    let mut instructions = Vec::with_capacity(count);
    for _ in 0..count {
        instructions.push(read_instruction(reader)?);
    }

    Ok(Message::new_unchecked(
        InstructionSet::new(instructions),
        fee_payer,
        anchor,
    ))
}

/// Decode bare message bytes (as produced by `encode_message`)
pub fn decode_message(bytes: &[u8]) -> Result<Message, CodecError> {
    let mut reader = Reader::new(bytes);
    let message = read_message(&mut reader)?;
    reader.finish()?;
    Ok(message)
}

/// Decode a full payload (as produced by `encode_transaction`)
pub fn decode_transaction(bytes: &[u8]) -> Result<Transaction, CodecError> {
    let mut reader = Reader::new(bytes);

    if reader.array::<4>()? != MAGIC {
        return Err(CodecError::BadMagic);
    }
    let version = reader.u8()?;
    if version != CODEC_VERSION {
        return Err(CodecError::UnsupportedVersion(version));
    }

    let message_len = reader.u32()?;
    let message = decode_message(reader.bytes(message_len)?)?;

    let sig_count = reader.u32()?;
    reader.need_items(sig_count, SIGNATURE_ENTRY_BYTES)?;
    let mut signatures = BTreeMap::new();
    let mut previous: Option<Address> = None;
    for _ in 0..sig_count {
        let address = reader.address()?;
        let signature = Signature(reader.array::<SIGNATURE_BYTES>()?);
        if previous.map_or(false, |prev| prev >= address) {
            return Err(CodecError::NonCanonicalSignatureOrder(address));
        }
        previous = Some(address);
        signatures.insert(address, signature);
    }
    reader.finish()?;

    Ok(Transaction::from_parts(message, signatures))
}
