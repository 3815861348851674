//! # Hashing Utilities
//!
//! BLAKE3 is the only hash function the ledger needs. It derives the
//! ledger's own address from its deployer and commits the full balance
//! table to a single 32-byte state root, so two nodes holding the same
//! balances can prove it by comparing one value.

use crate::config::STATE_LEAF_DOMAIN;
use crate::types::{Address, Tier};

/// Computes the BLAKE3 digest of `data`.
///
/// # Example
///
/// ```
/// use tiermint_protocol::crypto::blake3_hash;
///
/// let hash = blake3_hash(b"tier F");
/// assert_eq!(hash.len(), 32);
/// ```
pub fn blake3_hash(data: &[u8]) -> [u8; 32] {
    *blake3::hash(data).as_bytes()
}

/// Hashes several byte slices as if they were concatenated, without
/// allocating the concatenation.
pub fn blake3_hash_multi(parts: &[&[u8]]) -> [u8; 32] {
    let mut hasher = blake3::Hasher::new();
    for part in parts {
        hasher.update(part);
    }
    *hasher.finalize().as_bytes()
}

/// Hashes `parts` after a domain tag, so leaves of different kinds can never
/// collide with each other or with interior Merkle nodes.
pub fn domain_hash(domain: &[u8], parts: &[&[u8]]) -> [u8; 32] {
    let mut hasher = blake3::Hasher::new();
    hasher.update(&(domain.len() as u32).to_be_bytes());
    hasher.update(domain);
    for part in parts {
        hasher.update(part);
    }
    *hasher.finalize().as_bytes()
}

/// Leaf hash for one `(address, tier, balance)` entry of the state root.
pub fn balance_leaf(address: &Address, tier: Tier, balance: u64) -> [u8; 32] {
    let tier_byte = [tier.token_id()];
    let balance_bytes = balance.to_be_bytes();
    domain_hash(
        STATE_LEAF_DOMAIN,
        &[
            address.as_bytes().as_slice(),
            tier_byte.as_slice(),
            balance_bytes.as_slice(),
        ],
    )
}

/// Computes a binary Merkle root over `leaves` using BLAKE3.
///
/// An odd node at any level is paired with itself. A single leaf is also
/// paired with itself, so the root is always a hash output and never a raw
/// leaf. An empty input yields `[0u8; 32]`.
///
/// Callers must pass leaves in a canonical order; the root is
/// order-sensitive.
pub fn merkle_root(leaves: &[[u8; 32]]) -> [u8; 32] {
    match leaves.len() {
        0 => return [0u8; 32],
        1 => return blake3_hash_multi(&[leaves[0].as_slice(), leaves[0].as_slice()]),
        _ => {}
    }

    let mut level: Vec<[u8; 32]> = leaves.to_vec();
    while level.len() > 1 {
        level = level
            .chunks(2)
            .map(|pair| {
                let right = pair.get(1).unwrap_or(&pair[0]);
                blake3_hash_multi(&[pair[0].as_slice(), right.as_slice()])
            })
            .collect();
    }
    level[0]
}
