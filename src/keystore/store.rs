//! Named signing keys
//!
//! Keys are looked up by name. A name the store does not know is a
//! `MissingCredential`, never a silently generated key.

use crate::crypto::{Address, KeyError, KeyPair};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Key store errors
#[derive(Error, Debug)]
pub enum KeyStoreError {
    #[error("Missing credential: no key named '{0}'")]
    MissingCredential(String),
    #[error("Key '{0}' already exists")]
    AlreadyExists(String),
    #[error("Invalid key name '{0}': use letters, digits, '-' or '_'")]
    InvalidName(String),
    #[error("Key file for '{0}' does not match its address")]
    AddressMismatch(String),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
    #[error("Crypto error: {0}")]
    CryptoError(#[from] KeyError),
}

/// Source of signing keys
pub trait KeyStore {
    /// The key stored under `name`
    fn lookup(&self, name: &str) -> Result<KeyPair, KeyStoreError>;

    /// Every stored name with its address, sorted by name
    fn list(&self) -> Result<Vec<KeyInfo>, KeyStoreError>;

    /// The name and key controlling `address`, if this store holds it
    fn find_by_address(
        &self,
        address: &Address,
    ) -> Result<Option<(String, KeyPair)>, KeyStoreError> {
        for info in self.list()? {
            if &info.address == address {
                let key = self.lookup(&info.name)?;
                return Ok(Some((info.name, key)));
            }
        }
        Ok(None)
    }
}

/// Public key information (safe to share)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyInfo {
    pub name: String,
    pub address: Address,
}

/// On-disk key format
#[derive(Debug, Serialize, Deserialize)]
struct KeyFile {
    private_key_hex: String,
    address: Address,
}

fn validate_name(name: &str) -> Result<(), KeyStoreError> {
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(())
    } else {
        Err(KeyStoreError::InvalidName(name.to_string()))
    }
}

/// One JSON file per named key in a directory
pub struct FileKeyStore {
    keys_dir: PathBuf,
}

impl FileKeyStore {
    /// Open (creating if needed) a key directory
    pub fn new(keys_dir: &Path) -> Result<Self, KeyStoreError> {
        fs::create_dir_all(keys_dir)?;
        Ok(Self {
            keys_dir: keys_dir.to_path_buf(),
        })
    }

    fn path_for(&self, name: &str) -> Result<PathBuf, KeyStoreError> {
        validate_name(name)?;
        Ok(self.keys_dir.join(format!("{}.json", name)))
    }

    /// Generate and save a new key
    pub fn create(&self, name: &str) -> Result<KeyPair, KeyStoreError> {
        let key = KeyPair::generate();
        self.import(name, &key)?;
        Ok(key)
    }

    /// Save an existing key under `name`
    pub fn import(&self, name: &str, key: &KeyPair) -> Result<(), KeyStoreError> {
        let path = self.path_for(name)?;
        if path.exists() {
            return Err(KeyStoreError::AlreadyExists(name.to_string()));
        }

        let file = KeyFile {
            private_key_hex: key.private_key_hex(),
            address: key.address(),
        };
        fs::write(&path, serde_json::to_string_pretty(&file)?)?;
        log::info!("Saved key '{}' ({})", name, key.address().short());
        Ok(())
    }

    pub fn remove(&self, name: &str) -> Result<(), KeyStoreError> {
        let path = self.path_for(name)?;
        if !path.exists() {
            return Err(KeyStoreError::MissingCredential(name.to_string()));
        }
        fs::remove_file(path)?;
        Ok(())
    }
}

impl KeyStore for FileKeyStore {
    fn lookup(&self, name: &str) -> Result<KeyPair, KeyStoreError> {
        let path = self.path_for(name)?;
        if !path.exists() {
            return Err(KeyStoreError::MissingCredential(name.to_string()));
        }

        let file: KeyFile = serde_json::from_str(&fs::read_to_string(&path)?)?;
        let key = KeyPair::from_private_key_hex(&file.private_key_hex)?;
        if key.address() != file.address {
            return Err(KeyStoreError::AddressMismatch(name.to_string()));
        }
        Ok(key)
    }

    fn list(&self) -> Result<Vec<KeyInfo>, KeyStoreError> {
        let mut keys = Vec::new();

        for entry in fs::read_dir(&self.keys_dir)? {
            let path = entry?.path();
            if !path.extension().map(|e| e == "json").unwrap_or(false) {
                continue;
            }
            let name = match path.file_stem().and_then(|s| s.to_str()) {
                Some(name) => name.to_string(),
                None => continue,
            };
            match self.lookup(&name) {
                Ok(key) => keys.push(KeyInfo {
                    name,
                    address: key.address(),
                }),
                Err(e) => log::warn!("Skipping unreadable key file {}: {}", path.display(), e),
            }
        }

        keys.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(keys)
    }
}

/// Keys held in memory only
#[derive(Default)]
pub struct MemoryKeyStore {
    keys: BTreeMap<String, KeyPair>,
}

impl MemoryKeyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: &str, key: KeyPair) -> Result<(), KeyStoreError> {
        validate_name(name)?;
        if self.keys.contains_key(name) {
            return Err(KeyStoreError::AlreadyExists(name.to_string()));
        }
        self.keys.insert(name.to_string(), key);
        Ok(())
    }

    /// Generate a key under `name`, returning its address
    pub fn generate(&mut self, name: &str) -> Result<Address, KeyStoreError> {
        let key = KeyPair::generate();
        let address = key.address();
        self.insert(name, key)?;
        Ok(address)
    }
}

impl KeyStore for MemoryKeyStore {
    fn lookup(&self, name: &str) -> Result<KeyPair, KeyStoreError> {
        self.keys
            .get(name)
            .cloned()
            .ok_or_else(|| KeyStoreError::MissingCredential(name.to_string()))
    }

    fn list(&self) -> Result<Vec<KeyInfo>, KeyStoreError> {
        Ok(self
            .keys
            .iter()
            .map(|(name, key)| KeyInfo {
                name: name.clone(),
                address: key.address(),
            })
            .collect())
    }
}
