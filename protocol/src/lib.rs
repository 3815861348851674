// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # Tiermint Protocol: Shared Primitives
//!
//! Everything both the ledger contract and the node need to agree on:
//!
//! - **types**: `Address`, `Tier`, `CallContext`, native-currency amounts.
//! - **crypto**: BLAKE3 hashing, ledger address derivation, Merkle roots.
//! - **storage**: sled-backed snapshot persistence.
//! - **config**: protocol constants and default mint economics.
//!
//! ## Design Philosophy
//!
//! 1. Balances are `u64`, payments are `u128`, and every arithmetic step on
//!    either is checked.
//! 2. The caller kind is data handed to the contract, not something the
//!    contract sniffs out.
//! 3. If it touches balances, it has tests. Plural.

pub mod config;
pub mod crypto;
pub mod storage;
pub mod types;
