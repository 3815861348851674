//! # Asset Ledger
//!
//! Per-address, per-tier balance storage. Balances spring into existence at
//! zero the first time they are touched and are never removed.
//!
//! The ledger also keeps running `minted` and `burned` totals per tier, which
//! makes supply conservation directly checkable:
//!
//! ```text
//! sum(balances[tier]) == minted[tier] - burned[tier]
//! ```
//!
//! Both totals are `u128`, so they can exceed the largest single balance.
//!
//! Multi-step mutations go through [`AssetLedger::apply`], which validates an
//! ordered batch against staged balances before committing any of it.
//! Zero-quantity operations are no-ops and emit no event.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tiermint_protocol::crypto::{balance_leaf, merkle_root};
use tiermint_protocol::types::{Address, Tier};

use crate::error::LedgerError;
use crate::events::LedgerEvent;

/// Balances of one address, indexed by [`Tier::index`].
pub type TierBalances = [u64; 3];

// ---------------------------------------------------------------------------
// Balance operations
// ---------------------------------------------------------------------------

/// A single balance mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BalanceOp {
    /// Increase `address`'s `tier` balance by `qty`.
    Credit { address: Address, tier: Tier, qty: u64 },
    /// Decrease `address`'s `tier` balance by `qty`.
    Debit { address: Address, tier: Tier, qty: u64 },
}

impl BalanceOp {
    pub fn credit(address: Address, tier: Tier, qty: u64) -> Self {
        BalanceOp::Credit { address, tier, qty }
    }

    pub fn debit(address: Address, tier: Tier, qty: u64) -> Self {
        BalanceOp::Debit { address, tier, qty }
    }

    fn qty(&self) -> u64 {
        match *self {
            BalanceOp::Credit { qty, .. } | BalanceOp::Debit { qty, .. } => qty,
        }
    }

    fn key(&self) -> (Address, Tier) {
        match *self {
            BalanceOp::Credit { address, tier, .. } | BalanceOp::Debit { address, tier, .. } => {
                (address, tier)
            }
        }
    }

    fn event(&self) -> LedgerEvent {
        match *self {
            BalanceOp::Credit { address, tier, qty } => LedgerEvent::Minted {
                to: address,
                tier,
                qty,
            },
            BalanceOp::Debit { address, tier, qty } => LedgerEvent::Burned {
                from: address,
                tier,
                qty,
            },
        }
    }
}

// ---------------------------------------------------------------------------
// Ledger
// ---------------------------------------------------------------------------

/// Tier balances for every address that has ever held a token.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetLedger {
    balances: BTreeMap<Address, TierBalances>,
    minted: [u128; 3],
    burned: [u128; 3],
}

impl AssetLedger {
    /// Creates an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Increases `address`'s `tier` balance by `qty`. Returns the emitted
    /// event, or `None` when `qty` is zero.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Overflow`] if the balance would exceed
    /// `u64::MAX`.
    pub fn credit(
        &mut self,
        address: Address,
        tier: Tier,
        qty: u64,
    ) -> Result<Option<LedgerEvent>, LedgerError> {
        self.apply_one(BalanceOp::credit(address, tier, qty))
    }

    /// Decreases `address`'s `tier` balance by `qty`.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::InsufficientBalance`] if the balance is below
    /// `qty`.
    pub fn debit(
        &mut self,
        address: Address,
        tier: Tier,
        qty: u64,
    ) -> Result<Option<LedgerEvent>, LedgerError> {
        self.apply_one(BalanceOp::debit(address, tier, qty))
    }

    fn apply_one(&mut self, op: BalanceOp) -> Result<Option<LedgerEvent>, LedgerError> {
        Ok(self.apply(&[op])?.pop())
    }

    /// Applies `ops` in order, all or nothing.
    ///
    /// Each operation sees the balances produced by the operations before
    /// it. If any operation fails, the ledger is left exactly as it was and
    /// the first error is returned. On success one event per non-zero
    /// operation is returned, in order.
    pub fn apply(&mut self, ops: &[BalanceOp]) -> Result<Vec<LedgerEvent>, LedgerError> {
        let effective: Vec<&BalanceOp> = ops.iter().filter(|op| op.qty() > 0).collect();
        let mut staged: Vec<((Address, Tier), u64)> = Vec::with_capacity(effective.len());
        let mut minted = self.minted;
        let mut burned = self.burned;

        for op in &effective {
            let key = op.key();
            let current = staged
                .iter()
                .rev()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| *v)
                .unwrap_or_else(|| self.balance_of(&key.0, key.1));

            let next = match **op {
                BalanceOp::Credit { tier, qty, .. } => {
                    let idx = tier.index();
                    minted[idx] = minted[idx]
                        .checked_add(qty as u128)
                        .ok_or(LedgerError::Overflow)?;
                    current.checked_add(qty).ok_or(LedgerError::Overflow)?
                }
                BalanceOp::Debit { tier, qty, .. } => {
                    if current < qty {
                        return Err(LedgerError::InsufficientBalance {
                            tier,
                            available: current,
                            requested: qty,
                        });
                    }
                    let idx = tier.index();
                    burned[idx] = burned[idx]
                        .checked_add(qty as u128)
                        .ok_or(LedgerError::Overflow)?;
                    current - qty
                }
            };
            staged.push((key, next));
        }

        // Commit. Later entries for the same key overwrite earlier ones.
        for ((address, tier), balance) in staged {
            self.balances.entry(address).or_default()[tier.index()] = balance;
        }
        self.minted = minted;
        self.burned = burned;

        Ok(effective.into_iter().map(BalanceOp::event).collect())
    }

    /// Balance of `address` for `tier`; zero if never touched.
    pub fn balance_of(&self, address: &Address, tier: Tier) -> u64 {
        self.balances
            .get(address)
            .map(|b| b[tier.index()])
            .unwrap_or(0)
    }

    /// All three balances of `address`, in tier order.
    pub fn balances_of(&self, address: &Address) -> TierBalances {
        self.balances.get(address).copied().unwrap_or_default()
    }

    /// Units of `tier` currently in circulation.
    pub fn total_supply(&self, tier: Tier) -> u128 {
        let idx = tier.index();
        self.minted[idx].saturating_sub(self.burned[idx])
    }

    /// Units of `tier` ever credited.
    pub fn minted(&self, tier: Tier) -> u128 {
        self.minted[tier.index()]
    }

    /// Units of `tier` ever debited.
    pub fn burned(&self, tier: Tier) -> u128 {
        self.burned[tier.index()]
    }

    /// Returns `true` if, for every tier, the sum of all balances equals
    /// minted minus burned.
    pub fn check_conservation(&self) -> bool {
        Tier::ALL.iter().all(|&tier| {
            let idx = tier.index();
            let held: u128 = self.balances.values().map(|b| b[idx] as u128).sum();
            self.burned[idx] <= self.minted[idx] && held == self.minted[idx] - self.burned[idx]
        })
    }

    /// Addresses that currently hold a non-zero balance of any tier.
    pub fn holders(&self) -> Vec<Address> {
        self.balances
            .iter()
            .filter(|(_, b)| b.iter().any(|v| *v > 0))
            .map(|(a, _)| *a)
            .collect()
    }

    /// Number of addresses ever touched by the ledger.
    pub fn account_count(&self) -> usize {
        self.balances.len()
    }

    /// Merkle root over every non-zero `(address, tier, balance)` entry.
    ///
    /// Leaves are ordered by address then tier, so two ledgers with the same
    /// balances always produce the same root.
    pub fn state_root(&self) -> [u8; 32] {
        let leaves: Vec<[u8; 32]> = self
            .balances
            .iter()
            .flat_map(|(address, balances)| {
                Tier::ALL
                    .iter()
                    .filter(|tier| balances[tier.index()] > 0)
                    .map(|&tier| balance_leaf(address, tier, balances[tier.index()]))
                    .collect::<Vec<_>>()
            })
            .collect();
        merkle_root(&leaves)
    }
}
