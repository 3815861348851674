//! # Tiered Mint Pipeline
//!
//! The three mint entry points and everything they depend on.
//!
//! ## Acquisition Precedence
//!
//! | Tier | Funded by                          | Default cost         |
//! |------|------------------------------------|----------------------|
//! | F    | native currency                    | 0.01 per unit        |
//! | N    | burning F                          | 3 F per unit         |
//! | T    | burning F and N                    | 10 F + 1 N per unit  |
//!
//! Burn-funded mints debit the caller's balances with the ledger acting as
//! operator, so the caller must first approve [`TierMintContract::ledger_address`]
//! through [`TierMintContract::set_approval_for_all`].
//!
//! ## Call Semantics
//!
//! Every entry point runs all of its checks before touching any balance and
//! then commits its balance changes as a single [`AssetLedger::apply`] batch.
//! A rejected call therefore leaves no trace: no balance change, no event, no
//! retained payment.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tiermint_protocol::config::{
    DEFAULT_COST_N_IN_F, DEFAULT_COST_T_IN_F, DEFAULT_COST_T_IN_N, DEFAULT_PRICE_F_WEI,
};
use tiermint_protocol::types::{Address, CallContext, Tier, Wei};
use uuid::Uuid;

use crate::approval_registry::ApprovalRegistry;
use crate::asset_ledger::{AssetLedger, BalanceOp, TierBalances};
use crate::caller_guard::CallerGuard;
use crate::error::LedgerError;
use crate::events::LedgerEvent;

// ---------------------------------------------------------------------------
// Mint costs
// ---------------------------------------------------------------------------

/// Pricing and burn ratios, fixed when the contract is deployed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MintCosts {
    /// Native currency per tier-F unit, in wei.
    pub price_f: Wei,
    /// Tier-F units burned per tier-N unit.
    pub n_in_f: u64,
    /// Tier-F units burned per tier-T unit.
    pub t_in_f: u64,
    /// Tier-N units burned per tier-T unit.
    pub t_in_n: u64,
}

impl MintCosts {
    /// Builds a cost table, rejecting zero burn ratios.
    pub fn new(price_f: Wei, n_in_f: u64, t_in_f: u64, t_in_n: u64) -> Result<Self, LedgerError> {
        let costs = Self {
            price_f,
            n_in_f,
            t_in_f,
            t_in_n,
        };
        costs.validate()?;
        Ok(costs)
    }

    /// A zero ratio would let an upper tier be minted for free.
    pub fn validate(&self) -> Result<(), LedgerError> {
        if self.n_in_f == 0 {
            return Err(LedgerError::InvalidCosts("tier N must burn at least one F"));
        }
        if self.t_in_f == 0 {
            return Err(LedgerError::InvalidCosts("tier T must burn at least one F"));
        }
        if self.t_in_n == 0 {
            return Err(LedgerError::InvalidCosts("tier T must burn at least one N"));
        }
        Ok(())
    }
}

impl Default for MintCosts {
    fn default() -> Self {
        Self {
            price_f: DEFAULT_PRICE_F_WEI,
            n_in_f: DEFAULT_COST_N_IN_F,
            t_in_f: DEFAULT_COST_T_IN_F,
            t_in_n: DEFAULT_COST_T_IN_N,
        }
    }
}

// ---------------------------------------------------------------------------
// Receipts
// ---------------------------------------------------------------------------

/// Record of one successful mint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MintReceipt {
    pub receipt_id: Uuid,
    pub caller: Address,
    pub tier: Tier,
    pub qty: u64,
    /// Native currency retained by the contract for this call. Zero for
    /// burn-funded tiers.
    pub paid: Wei,
    /// Balance events in the order they were applied.
    pub events: Vec<LedgerEvent>,
    pub timestamp: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Contract
// ---------------------------------------------------------------------------

/// The tiered mint ledger.
///
/// A plain state machine: mutations take `&mut self`, so callers that share
/// the contract across threads must serialize access themselves.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TierMintContract {
    address: Address,
    deployer: Address,
    costs: MintCosts,
    ledger: AssetLedger,
    approvals: ApprovalRegistry,
    #[serde(skip)]
    guard: CallerGuard,
    /// Accumulated tier-F payments, overpayments included.
    native_balance: Wei,
    /// Events emitted since deployment. The events themselves are handed
    /// out in receipts and stored outside the snapshot.
    event_count: u64,
    deployed_at: DateTime<Utc>,
}

impl TierMintContract {
    /// Deploys a fresh contract.
    ///
    /// The ledger's own address is derived from `deployer` and `nonce`, so
    /// redeploying with the same pair yields the same address.
    pub fn deploy(deployer: Address, nonce: u64, costs: MintCosts) -> Result<Self, LedgerError> {
        costs.validate()?;
        let address = Address::derive_ledger(&deployer, nonce);
        tracing::debug!(%address, %deployer, nonce, "ledger deployed");
        Ok(Self {
            address,
            deployer,
            costs,
            ledger: AssetLedger::new(),
            approvals: ApprovalRegistry::new(),
            guard: CallerGuard,
            native_balance: 0,
            event_count: 0,
            deployed_at: Utc::now(),
        })
    }

    // -- entry points -------------------------------------------------------

    /// Buys `qty` tier-F units with the native currency attached to `ctx`.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::ContractCallerRejected`] if the caller is contract code.
    /// - [`LedgerError::InsufficientPayment`] if `ctx.value < qty * price_f`.
    pub fn mint_token_f(
        &mut self,
        ctx: &CallContext,
        qty: u64,
    ) -> Result<MintReceipt, LedgerError> {
        self.guard.assert_is_originating_caller(ctx)?;

        let required = (qty as Wei)
            .checked_mul(self.costs.price_f)
            .ok_or(LedgerError::Overflow)?;
        if ctx.value < required {
            return Err(LedgerError::InsufficientPayment {
                required,
                provided: ctx.value,
            });
        }
        let retained = self
            .native_balance
            .checked_add(ctx.value)
            .ok_or(LedgerError::Overflow)?;

        let events = self
            .ledger
            .apply(&[BalanceOp::credit(ctx.caller, Tier::F, qty)])?;
        self.native_balance = retained;

        Ok(self.record(ctx, Tier::F, qty, ctx.value, events))
    }

    /// Mints `qty` tier-N units by burning `qty * n_in_f` tier-F units.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::ContractCallerRejected`] if the caller is contract code.
    /// - [`LedgerError::NonPayable`] if native currency is attached.
    /// - [`LedgerError::OperatorNotApproved`] if the ledger is not approved.
    /// - [`LedgerError::InsufficientTierFBalance`] if the caller is short on F.
    pub fn mint_token_n(
        &mut self,
        ctx: &CallContext,
        qty: u64,
    ) -> Result<MintReceipt, LedgerError> {
        self.check_burn_funded_call(ctx)?;

        let burn_f = burn_amount(qty, self.costs.n_in_f)?;
        self.require_balance(&ctx.caller, Tier::F, burn_f)?;

        let events = self.ledger.apply(&[
            BalanceOp::debit(ctx.caller, Tier::F, burn_f),
            BalanceOp::credit(ctx.caller, Tier::N, qty),
        ])?;

        Ok(self.record(ctx, Tier::N, qty, 0, events))
    }

    /// Mints `qty` tier-T units by burning `qty * t_in_f` tier-F units and
    /// `qty * t_in_n` tier-N units. The F balance is checked before N.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::ContractCallerRejected`] if the caller is contract code.
    /// - [`LedgerError::NonPayable`] if native currency is attached.
    /// - [`LedgerError::OperatorNotApproved`] if the ledger is not approved.
    /// - [`LedgerError::InsufficientTierFBalance`] if the caller is short on F.
    /// - [`LedgerError::InsufficientTierNBalance`] if the caller is short on N.
    pub fn mint_token_t(
        &mut self,
        ctx: &CallContext,
        qty: u64,
    ) -> Result<MintReceipt, LedgerError> {
        self.check_burn_funded_call(ctx)?;

        let burn_f = burn_amount(qty, self.costs.t_in_f)?;
        self.require_balance(&ctx.caller, Tier::F, burn_f)?;
        let burn_n = burn_amount(qty, self.costs.t_in_n)?;
        self.require_balance(&ctx.caller, Tier::N, burn_n)?;

        let events = self.ledger.apply(&[
            BalanceOp::debit(ctx.caller, Tier::F, burn_f),
            BalanceOp::debit(ctx.caller, Tier::N, burn_n),
            BalanceOp::credit(ctx.caller, Tier::T, qty),
        ])?;

        Ok(self.record(ctx, Tier::T, qty, 0, events))
    }

    /// Sets whether `operator` may debit the caller's balances.
    ///
    /// To use the burn-funded mints, pass [`ledger_address`](Self::ledger_address)
    /// as the operator.
    pub fn set_approval_for_all(
        &mut self,
        ctx: &CallContext,
        operator: Address,
        approved: bool,
    ) -> Result<LedgerEvent, LedgerError> {
        if ctx.value > 0 {
            return Err(LedgerError::NonPayable { value: ctx.value });
        }
        let event = self.approvals.set_approval(ctx.caller, operator, approved)?;
        tracing::debug!(owner = %ctx.caller, %operator, approved, "approval set");
        self.event_count += 1;
        Ok(event)
    }

    // -- checks -------------------------------------------------------------

    fn check_burn_funded_call(&self, ctx: &CallContext) -> Result<(), LedgerError> {
        self.guard.assert_is_originating_caller(ctx)?;
        if ctx.value > 0 {
            return Err(LedgerError::NonPayable { value: ctx.value });
        }
        if !self.approvals.is_approved(&ctx.caller, &self.address) {
            return Err(LedgerError::OperatorNotApproved);
        }
        Ok(())
    }

    fn require_balance(
        &self,
        owner: &Address,
        tier: Tier,
        required: u64,
    ) -> Result<(), LedgerError> {
        let available = self.ledger.balance_of(owner, tier);
        if available >= required {
            return Ok(());
        }
        match tier {
            Tier::F => Err(LedgerError::InsufficientTierFBalance {
                required,
                available,
            }),
            Tier::N => Err(LedgerError::InsufficientTierNBalance {
                required,
                available,
            }),
            Tier::T => Err(LedgerError::InsufficientBalance {
                tier,
                available,
                requested: required,
            }),
        }
    }

    fn record(
        &mut self,
        ctx: &CallContext,
        tier: Tier,
        qty: u64,
        paid: Wei,
        events: Vec<LedgerEvent>,
    ) -> MintReceipt {
        self.event_count += events.len() as u64;
        tracing::debug!(caller = %ctx.caller, %tier, qty, paid, "mint accepted");
        MintReceipt {
            receipt_id: Uuid::new_v4(),
            caller: ctx.caller,
            tier,
            qty,
            paid,
            events,
            timestamp: Utc::now(),
        }
    }

    // -- reads --------------------------------------------------------------

    pub fn balance_of(&self, owner: &Address, tier: Tier) -> u64 {
        self.ledger.balance_of(owner, tier)
    }

    /// F, N and T balances of `owner`.
    pub fn balances_of(&self, owner: &Address) -> TierBalances {
        self.ledger.balances_of(owner)
    }

    pub fn is_approved_for_all(&self, owner: &Address, operator: &Address) -> bool {
        self.approvals.is_approved(owner, operator)
    }

    /// Wei per tier-F unit.
    pub fn mint_token_f_cost(&self) -> Wei {
        self.costs.price_f
    }

    /// Tier-F units burned per tier-N unit.
    pub fn mint_token_n_cost(&self) -> u64 {
        self.costs.n_in_f
    }

    /// Tier-F units burned per tier-T unit.
    pub fn mint_token_t_cost(&self) -> u64 {
        self.costs.t_in_f
    }

    /// Tier-N units burned per tier-T unit.
    pub fn mint_token_t_cost_in_n(&self) -> u64 {
        self.costs.t_in_n
    }

    pub fn costs(&self) -> &MintCosts {
        &self.costs
    }

    /// The address owners approve so the ledger can burn on their behalf.
    pub fn ledger_address(&self) -> Address {
        self.address
    }

    pub fn deployer(&self) -> Address {
        self.deployer
    }

    pub fn deployed_at(&self) -> DateTime<Utc> {
        self.deployed_at
    }

    /// Native currency retained from tier-F purchases.
    pub fn native_balance(&self) -> Wei {
        self.native_balance
    }

    /// Number of events emitted since deployment. The next event gets this
    /// sequence number.
    pub fn event_count(&self) -> u64 {
        self.event_count
    }

    pub fn ledger(&self) -> &AssetLedger {
        &self.ledger
    }

    pub fn state_root(&self) -> [u8; 32] {
        self.ledger.state_root()
    }
}

/// `qty * ratio`, or [`LedgerError::Overflow`].
fn burn_amount(qty: u64, ratio: u64) -> Result<u64, LedgerError> {
    qty.checked_mul(ratio).ok_or(LedgerError::Overflow)
}
