//! # Cryptographic Primitives
//!
//! Thin wrappers around BLAKE3 for address derivation and state
//! commitments. Nothing here is novel and nothing here should be.

pub mod hash;

pub use hash::{balance_leaf, blake3_hash, blake3_hash_multi, domain_hash, merkle_root};
