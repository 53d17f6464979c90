//! Delegation relay
//!
//! The only channel between initiator and counterparty is an opaque byte
//! sequence. `handoff` produces and checks it; `channel` carries it over a
//! byte stream when the caller wants one.

pub mod channel;
pub mod handoff;

pub use channel::{await_payload, HandoffError, RelayFrameCodec, FRAME_MAGIC, MAX_FRAME_LEN};
pub use handoff::{
    from_relay_payload, receive, to_relay_payload, verify_signatures, verify_structure,
    Expectation, RelayError, StructuralField,
};
