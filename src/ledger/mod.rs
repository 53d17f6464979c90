//! Ledger access
//!
//! - `rpc`: the contract a ledger node fulfils
//! - `simulated`: an in-memory ledger for tests and the demo
//! - `broadcast`: submission, bounded confirmation and recovery advice

pub mod broadcast;
pub mod rpc;
pub mod simulated;

pub use broadcast::{
    await_outcome, broadcast, broadcast_tracked, recovery_action, BroadcastError, RecoveryAction,
};
pub use rpc::{LedgerError, LedgerRpc, Outcome, DEFAULT_POLL_INTERVAL};
pub use simulated::{SimulatedLedger, FEE_PER_SIGNATURE};
