//! # Account Addresses
//!
//! A 20-byte account identifier, rendered as `0x` followed by 40 lowercase
//! hex characters. Both externally-owned accounts and the ledger itself are
//! addressed this way; the ledger's address is derived from its deployer so
//! that the same deployment parameters always yield the same ledger.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

use crate::config::{ADDRESS_LENGTH, LEDGER_ADDRESS_DOMAIN};
use crate::crypto::hash::blake3_hash;

/// Errors produced when parsing an [`Address`] from text.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AddressError {
    /// The string is not valid hex.
    #[error("invalid hex in address: {0}")]
    InvalidHex(String),

    /// The decoded byte length is not 20.
    #[error("invalid address length: expected {ADDRESS_LENGTH} bytes, got {0}")]
    InvalidLength(usize),
}

/// A 20-byte account address.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Address([u8; ADDRESS_LENGTH]);

impl Address {
    /// The all-zero address.
    pub const ZERO: Address = Address([0u8; ADDRESS_LENGTH]);

    /// Wraps raw address bytes.
    pub const fn from_bytes(bytes: [u8; ADDRESS_LENGTH]) -> Self {
        Self(bytes)
    }

    /// Returns the raw 20 address bytes.
    pub fn as_bytes(&self) -> &[u8; ADDRESS_LENGTH] {
        &self.0
    }

    /// Returns the `0x`-prefixed lowercase hex form.
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }

    /// Parses an address from hex, with or without the `0x` prefix.
    pub fn from_hex(s: &str) -> Result<Self, AddressError> {
        let trimmed = s
            .strip_prefix("0x")
            .or_else(|| s.strip_prefix("0X"))
            .unwrap_or(s);
        let bytes = hex::decode(trimmed).map_err(|e| AddressError::InvalidHex(e.to_string()))?;
        if bytes.len() != ADDRESS_LENGTH {
            return Err(AddressError::InvalidLength(bytes.len()));
        }
        let mut arr = [0u8; ADDRESS_LENGTH];
        arr.copy_from_slice(&bytes);
        Ok(Self(arr))
    }

    /// Generates a random address. Handy for dev deployers and tests.
    pub fn random() -> Self {
        Self(rand::random())
    }

    /// Derives an address from arbitrary bytes by taking the last 20 bytes
    /// of their BLAKE3 digest.
    pub fn from_digest_of(data: &[u8]) -> Self {
        let digest = blake3_hash(data);
        let mut arr = [0u8; ADDRESS_LENGTH];
        arr.copy_from_slice(&digest[digest.len() - ADDRESS_LENGTH..]);
        Self(arr)
    }

    /// Derives the address of a ledger created by `deployer` with the given
    /// deployment `nonce`.
    ///
    /// `BLAKE3(LEDGER_ADDRESS_DOMAIN || deployer || nonce_be)[12..32]`
    pub fn derive_ledger(deployer: &Address, nonce: u64) -> Self {
        let mut preimage = Vec::with_capacity(LEDGER_ADDRESS_DOMAIN.len() + ADDRESS_LENGTH + 8);
        preimage.extend_from_slice(LEDGER_ADDRESS_DOMAIN);
        preimage.extend_from_slice(deployer.as_bytes());
        preimage.extend_from_slice(&nonce.to_be_bytes());
        Self::from_digest_of(&preimage)
    }

    /// Returns `true` for the all-zero address.
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; ADDRESS_LENGTH]
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self.to_hex())
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl std::str::FromStr for Address {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

// Addresses travel as hex strings so they can be JSON map keys.
impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Address::from_hex(&s).map_err(serde::de::Error::custom)
    }
}
