//! Core type definitions shared by the contract and the node.
//!
//! These types are small and `Copy` so they can be passed by value through
//! every layer without cloning ceremony.

pub mod address;
pub mod amount;
pub mod call;
pub mod tier;

pub use address::{Address, AddressError};
pub use amount::{format_ether, parse_ether, AmountError, Wei, WEI_PER_ETHER};
pub use call::{CallContext, CallerKind};
pub use tier::{Tier, UnknownTier};
