//! # Tiermint Contracts
//!
//! The tiered mint ledger as a self-contained state machine:
//!
//! - **Asset Ledger**: per-address, per-tier balances with atomic batch
//!   updates and a supply conservation check.
//! - **Approval Registry**: owner-controlled operator flags. The ledger
//!   must be approved before it can burn an owner's tokens.
//! - **Caller Guard**: keeps contract code out of the mint entry points.
//! - **Mint Pipeline**: `mint_token_f` (paid in native currency),
//!   `mint_token_n` (burns F) and `mint_token_t` (burns F and N).
//!
//! ## Design Principles
//!
//! 1. Every balance and payment update is checked arithmetic. Overflow is an
//!    error, never a wrap.
//! 2. Checks first, then one atomic batch of balance changes. A rejected call
//!    changes nothing.
//! 3. Every public type is serializable (serde) so the host can persist the
//!    whole contract and ship receipts over the wire.

pub mod approval_registry;
pub mod asset_ledger;
pub mod caller_guard;
pub mod error;
pub mod events;
pub mod mint_pipeline;

pub use error::LedgerError;
pub use events::LedgerEvent;
pub use mint_pipeline::{MintCosts, MintReceipt, TierMintContract};
