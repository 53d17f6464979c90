//! Known multisig authorities
//!
//! Keeps authorities by address so any party can resolve a multisig
//! signer named in a message. Persisted as JSON so independent processes
//! resolve the same definitions.

use crate::crypto::Address;
use crate::multisig::authority::{MultisigAuthority, MultisigError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Registry of multisig authorities by address
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AuthorityRegistry {
    authorities: BTreeMap<Address, MultisigAuthority>,
}

impl AuthorityRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an authority
    ///
    /// Registering the same definition twice returns the existing entry.
    pub fn register(&mut self, authority: MultisigAuthority) -> &MultisigAuthority {
        let address = *authority.address();
        self.authorities.entry(address).or_insert_with(|| {
            log::info!(
                "Registered {} multisig authority {}",
                authority.description(),
                address
            );
            authority
        })
    }

    /// Create and register a new authority
    pub fn create(
        &mut self,
        threshold: u8,
        members: Vec<Address>,
        label: Option<String>,
    ) -> Result<&MultisigAuthority, MultisigError> {
        let authority = MultisigAuthority::new(threshold, members, label)?;
        Ok(self.register(authority))
    }

    /// Get an authority by address
    pub fn get(&self, address: &Address) -> Option<&MultisigAuthority> {
        self.authorities.get(address)
    }

    /// Get an authority by address, failing if unknown
    pub fn require(&self, address: &Address) -> Result<&MultisigAuthority, MultisigError> {
        self.get(address)
            .ok_or(MultisigError::UnknownAuthority(*address))
    }

    /// Check if an address is a known multisig authority
    pub fn is_authority(&self, address: &Address) -> bool {
        self.authorities.contains_key(address)
    }

    /// List all authorities
    pub fn list(&self) -> Vec<&MultisigAuthority> {
        self.authorities.values().collect()
    }

    pub fn len(&self) -> usize {
        self.authorities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.authorities.is_empty()
    }

    /// Save the registry to disk
    pub fn save(&self, path: &Path) -> Result<(), MultisigError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Load a registry from disk, or an empty one if the file is absent
    pub fn load(path: &Path) -> Result<Self, MultisigError> {
        if !path.exists() {
            return Ok(Self::new());
        }
        let json = fs::read_to_string(path)?;
        let registry: Self = serde_json::from_str(&json)?;

        // Re-derive every entry so a hand-edited file cannot smuggle in a
        // threshold or member list that does not match its address
        for (address, authority) in &registry.authorities {
            let rebuilt = MultisigAuthority::new(
                authority.threshold(),
                authority.members().to_vec(),
                None,
            )?;
            if rebuilt.address() != address || authority.address() != address {
                return Err(MultisigError::AddressMismatch(*address));
            }
        }
        Ok(registry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::KeyPair;

    fn members(n: usize) -> Vec<Address> {
        (0..n).map(|_| KeyPair::generate().address()).collect()
    }

    #[test]
    fn test_registry_creation() {
        let registry = AuthorityRegistry::new();
        assert!(registry.is_empty());
    }

    #[test]
    fn test_register_idempotent() {
        let mut registry = AuthorityRegistry::new();
        let members = members(3);

        let first = *registry.create(2, members.clone(), None).unwrap().address();
        let second = *registry.create(2, members, None).unwrap().address();

        assert_eq!(first, second);
        assert_eq!(registry.len(), 1);
        assert!(registry.is_authority(&first));
    }

    #[test]
    fn test_unknown_authority() {
        let registry = AuthorityRegistry::new();
        let address = KeyPair::generate().address();
        assert!(matches!(
            registry.require(&address),
            Err(MultisigError::UnknownAuthority(_))
        ));
    }

    #[test]
    fn test_save_load() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("authorities.json");

        let mut registry = AuthorityRegistry::new();
        let address = *registry
            .create(2, members(3), Some("Ops".to_string()))
            .unwrap()
            .address();
        registry.save(&path).unwrap();

        let loaded = AuthorityRegistry::load(&path).unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded.get(&address), registry.get(&address));
    }

    #[test]
    fn test_load_rejects_tampered_threshold() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("authorities.json");

        let mut registry = AuthorityRegistry::new();
        registry.create(2, members(3), None).unwrap();
        registry.save(&path).unwrap();

        let json = fs::read_to_string(&path).unwrap();
        fs::write(&path, json.replace("\"threshold\": 2", "\"threshold\": 1")).unwrap();

        assert!(matches!(
            AuthorityRegistry::load(&path),
            Err(MultisigError::AddressMismatch(_))
        ));
    }

    #[test]
    fn test_load_missing_file_is_empty() {
        let temp_dir = tempfile::tempdir().unwrap();
        let loaded = AuthorityRegistry::load(&temp_dir.path().join("none.json")).unwrap();
        assert!(loaded.is_empty());
    }
}
