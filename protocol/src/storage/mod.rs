//! # Storage Module
//!
//! Persistence for ledger state. The contract keeps its state in memory;
//! the node writes a full snapshot here after every successful mutation,
//! appends the events that mutation emitted, and reloads the snapshot on
//! startup.
//!
//! Bincode is the on-disk encoding: compact, fast, deterministic. JSON is
//! for the API; bincode is for storage.

pub mod db;

pub use db::{DbError, DbResult, LedgerStore, META_NETWORK};
