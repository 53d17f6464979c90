//! Account references
//!
//! An `Address` is a fixed 33-byte identifier. Key accounts use the
//! compressed secp256k1 public key (prefix 0x02/0x03). Derived accounts
//! carry a prefix byte that is never a valid curve point prefix, so a
//! derived address can never be signed for directly.

use secp256k1::PublicKey;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use super::hash::hashv;
use super::keys::KeyError;

/// Size of an address in bytes
pub const ADDRESS_BYTES: usize = 33;

/// Prefix for program identifiers
pub const PROGRAM_PREFIX: u8 = 0x00;

/// Prefix for multisig authority addresses
pub const MULTISIG_PREFIX: u8 = 0x05;

/// A fixed-length public account identifier
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Address(pub [u8; ADDRESS_BYTES]);

impl Address {
    pub const fn new(bytes: [u8; ADDRESS_BYTES]) -> Self {
        Self(bytes)
    }

    /// Program identifier spelled from a short ASCII name
    pub const fn program(name: &[u8]) -> Self {
        let mut bytes = [0u8; ADDRESS_BYTES];
        bytes[0] = PROGRAM_PREFIX;
        let mut i = 0;
        while i < name.len() && i + 1 < ADDRESS_BYTES {
            bytes[i + 1] = name[i];
            i += 1;
        }
        Self(bytes)
    }

    /// Address = prefix || SHA256(parts...)
    pub fn derive(prefix: u8, parts: &[&[u8]]) -> Self {
        let mut bytes = [0u8; ADDRESS_BYTES];
        bytes[0] = prefix;
        bytes[1..].copy_from_slice(&hashv(parts));
        Self(bytes)
    }

    pub fn from_public_key(public_key: &PublicKey) -> Self {
        Self(public_key.serialize())
    }

    pub fn to_public_key(&self) -> Result<PublicKey, KeyError> {
        PublicKey::from_slice(&self.0).map_err(|_| KeyError::InvalidPublicKey)
    }

    /// Whether a private key can exist for this address
    pub fn is_on_curve(&self) -> bool {
        self.to_public_key().is_ok()
    }

    pub fn prefix(&self) -> u8 {
        self.0[0]
    }

    pub fn as_bytes(&self) -> &[u8; ADDRESS_BYTES] {
        &self.0
    }

    pub fn to_base58(&self) -> String {
        bs58::encode(self.0).into_string()
    }

    /// First characters of the base58 form, for log lines
    pub fn short(&self) -> String {
        let full = self.to_base58();
        full.chars().take(8).collect()
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_base58())
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self.to_base58())
    }
}

impl FromStr for Address {
    type Err = KeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = bs58::decode(s)
            .into_vec()
            .map_err(|_| KeyError::InvalidEncoding(s.to_string()))?;
        let bytes: [u8; ADDRESS_BYTES] = bytes
            .try_into()
            .map_err(|_| KeyError::InvalidEncoding(s.to_string()))?;
        Ok(Self(bytes))
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_base58())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::KeyPair;

    #[test]
    fn test_key_address_is_on_curve() {
        let kp = KeyPair::generate();
        let address = kp.address();
        assert!(address.is_on_curve());
        assert_eq!(address.to_public_key().unwrap(), kp.public_key);
    }

    #[test]
    fn test_derived_address_is_off_curve() {
        let derived = Address::derive(MULTISIG_PREFIX, &[b"members"]);
        assert_eq!(derived.prefix(), MULTISIG_PREFIX);
        assert!(!derived.is_on_curve());
        assert!(!Address::program(b"system").is_on_curve());
    }

    #[test]
    fn test_program_addresses_distinct() {
        assert_ne!(Address::program(b"system"), Address::program(b"token"));
    }

    #[test]
    fn test_json_uses_base58() {
        let address = KeyPair::generate().address();
        let json = serde_json::to_string(&address).unwrap();
        assert_eq!(json, format!("\"{}\"", address.to_base58()));
        let back: Address = serde_json::from_str(&json).unwrap();
        assert_eq!(back, address);
    }
}
