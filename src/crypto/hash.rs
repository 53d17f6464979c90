//! SHA-256 hashing and the 32-byte `Hash` value
//!
//! Blockhashes, durable nonce values and derived authority addresses are
//! all SHA-256 digests.

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;

use super::keys::KeyError;

/// Size of a hash in bytes
pub const HASH_BYTES: usize = 32;

/// Computes SHA-256 hash of the input data
pub fn sha256(data: &[u8]) -> [u8; HASH_BYTES] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Computes SHA-256 over several slices as if they were concatenated
pub fn hashv(parts: &[&[u8]]) -> [u8; HASH_BYTES] {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part);
    }
    hasher.finalize().into()
}

/// Computes SHA-256 hash and returns it as a hex string
pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(sha256(data))
}

/// A 32-byte digest, displayed as base58
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Hash(pub [u8; HASH_BYTES]);

impl Hash {
    pub const fn new(bytes: [u8; HASH_BYTES]) -> Self {
        Self(bytes)
    }

    /// Hash arbitrary data
    pub fn of(data: &[u8]) -> Self {
        Self(sha256(data))
    }

    /// A fresh random value, as a ledger would mint for a new blockhash
    pub fn new_unique() -> Self {
        Self(rand::random())
    }

    pub fn as_bytes(&self) -> &[u8; HASH_BYTES] {
        &self.0
    }

    pub fn to_base58(&self) -> String {
        bs58::encode(self.0).into_string()
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_base58())
    }
}

impl fmt::Debug for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hash({})", self.to_base58())
    }
}

impl FromStr for Hash {
    type Err = KeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = bs58::decode(s)
            .into_vec()
            .map_err(|_| KeyError::InvalidEncoding(s.to_string()))?;
        let bytes: [u8; HASH_BYTES] = bytes
            .try_into()
            .map_err(|_| KeyError::InvalidEncoding(s.to_string()))?;
        Ok(Self(bytes))
    }
}

impl Serialize for Hash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_base58())
    }
}

impl<'de> Deserialize<'de> for Hash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sha256() {
        let data = b"hello world";
        assert_eq!(sha256(data).len(), 32);
        assert_eq!(
            sha256_hex(data),
            "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9"
        );
    }

    #[test]
    fn test_hashv_matches_concatenation() {
        assert_eq!(hashv(&[b"hello ", b"world"]), sha256(b"hello world"));
    }

    #[test]
    fn test_base58_parse() {
        let hash = Hash::of(b"nonce");
        let parsed: Hash = hash.to_base58().parse().unwrap();
        assert_eq!(hash, parsed);
        assert!("not-base58!".parse::<Hash>().is_err());
        assert!(bs58::encode([1u8; 5]).into_string().parse::<Hash>().is_err());
    }

    #[test]
    fn test_unique_hashes_differ() {
        assert_ne!(Hash::new_unique(), Hash::new_unique());
    }
}
