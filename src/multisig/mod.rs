//! Multisig authorities and threshold resolution
//!
//! Provides M-of-N authorities where any M of N member keys may sign on
//! the authority's behalf, possibly hours apart through independent relay
//! hops.
//!
//! # Example
//!
//! ```ignore
//! use cosign_relay::multisig::{AuthorityRegistry, MultisigResolver};
//!
//! // Register a 2-of-3 authority
//! let mut registry = AuthorityRegistry::new();
//! let authority = registry.create(2, vec![x, y, z], None)?.clone();
//!
//! // Any two members complete the transaction
//! let resolver = MultisigResolver::new(&registry);
//! assert!(resolver.is_complete(&signed_by_x_and_y));
//! ```

pub mod authority;
pub mod registry;
pub mod resolver;

pub use authority::{MultisigAuthority, MultisigError, MAX_MEMBERS, MIN_MEMBERS};
pub use registry::AuthorityRegistry;
pub use resolver::{
    member_signature_count, threshold_met, MultisigResolver, RequiredSigner,
};
