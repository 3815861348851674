//! Events emitted by ledger mutations.
//!
//! Every balance change and every approval change produces exactly one
//! event. The contract keeps the full log; the node streams it to
//! WebSocket subscribers.

use serde::{Deserialize, Serialize};
use std::fmt;
use tiermint_protocol::types::{Address, Tier};

/// A single observable state change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LedgerEvent {
    /// `qty` units of `tier` were credited to `to`.
    Minted { to: Address, tier: Tier, qty: u64 },
    /// `qty` units of `tier` were burned from `from`.
    Burned { from: Address, tier: Tier, qty: u64 },
    /// `owner` set the operator flag for `operator`.
    ApprovalForAll {
        owner: Address,
        operator: Address,
        approved: bool,
    },
}

impl LedgerEvent {
    /// The account whose state this event changed.
    pub fn account(&self) -> Address {
        match self {
            LedgerEvent::Minted { to, .. } => *to,
            LedgerEvent::Burned { from, .. } => *from,
            LedgerEvent::ApprovalForAll { owner, .. } => *owner,
        }
    }

    /// Signed balance delta for `tier`, or `None` for approval events.
    pub fn balance_delta(&self, tier: Tier) -> Option<i128> {
        match self {
            LedgerEvent::Minted { tier: t, qty, .. } if *t == tier => Some(*qty as i128),
            LedgerEvent::Burned { tier: t, qty, .. } if *t == tier => Some(-(*qty as i128)),
            LedgerEvent::Minted { .. } | LedgerEvent::Burned { .. } => Some(0),
            LedgerEvent::ApprovalForAll { .. } => None,
        }
    }
}

impl fmt::Display for LedgerEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LedgerEvent::Minted { to, tier, qty } => write!(f, "mint {} {} -> {}", qty, tier, to),
            LedgerEvent::Burned { from, tier, qty } => {
                write!(f, "burn {} {} <- {}", qty, tier, from)
            }
            LedgerEvent::ApprovalForAll {
                owner,
                operator,
                approved,
            } => write!(f, "approval {} -> {} = {}", owner, operator, approved),
        }
    }
}
