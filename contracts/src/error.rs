//! # Ledger Errors
//!
//! Every rejected call maps to exactly one [`LedgerError`]. A rejection
//! never leaves partial state behind: all preconditions run before the
//! first balance is touched.
//!
//! The `Display` text of each variant is the revert reason clients match
//! on, so it must not change. Structured details live in the fields.

use thiserror::Error;
use tiermint_protocol::types::{Tier, Wei};

/// Reasons a ledger call can be rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    /// The attached payment is below `qty * PRICE_F`.
    #[error("Not enough ether sent")]
    InsufficientPayment {
        /// Payment the call needed.
        required: Wei,
        /// Payment the call carried.
        provided: Wei,
    },

    /// The caller is deployed contract code.
    #[error("Caller cannot be contract")]
    ContractCallerRejected,

    /// The caller has not approved the ledger as an operator.
    #[error("Not approved for transfer")]
    OperatorNotApproved,

    /// The caller holds too little tier F to burn.
    #[error("Not enough Token F sent")]
    InsufficientTierFBalance {
        /// Tier-F units the burn needed.
        required: u64,
        /// Tier-F units the caller holds.
        available: u64,
    },

    /// The caller holds too little tier N to burn.
    #[error("Not enough Token N sent")]
    InsufficientTierNBalance {
        /// Tier-N units the burn needed.
        required: u64,
        /// Tier-N units the caller holds.
        available: u64,
    },

    /// Last-resort guard inside the ledger: a debit exceeded the balance.
    /// The tier-specific checks above should always fire first.
    #[error("ERC1155: burn amount exceeds balance")]
    InsufficientBalance {
        /// The tier being debited.
        tier: Tier,
        /// Balance at the time of the debit.
        available: u64,
        /// Amount the debit asked for.
        requested: u64,
    },

    /// An owner tried to approve themselves as their own operator.
    #[error("ERC1155: setting approval status for self")]
    SelfApproval,

    /// Native currency was attached to an entry point that takes none.
    #[error("non-payable function received value")]
    NonPayable {
        /// The value that was attached.
        value: Wei,
    },

    /// Mint economics with a zero burn ratio were supplied at construction.
    #[error("invalid mint costs: {0}")]
    InvalidCosts(&'static str),

    /// Checked arithmetic failed. This is an invariant violation, not a
    /// condition callers are expected to recover from.
    #[error("arithmetic overflow")]
    Overflow,
}

impl LedgerError {
    /// The verbatim revert reason.
    pub fn reason(&self) -> String {
        self.to_string()
    }

    /// Stable machine-readable identifier for the variant.
    pub fn kind(&self) -> &'static str {
        match self {
            LedgerError::InsufficientPayment { .. } => "InsufficientPayment",
            LedgerError::ContractCallerRejected => "ContractCallerRejected",
            LedgerError::OperatorNotApproved => "OperatorNotApproved",
            LedgerError::InsufficientTierFBalance { .. } => "InsufficientTierFBalance",
            LedgerError::InsufficientTierNBalance { .. } => "InsufficientTierNBalance",
            LedgerError::InsufficientBalance { .. } => "InsufficientBalance",
            LedgerError::SelfApproval => "SelfApproval",
            LedgerError::NonPayable { .. } => "NonPayable",
            LedgerError::InvalidCosts(_) => "InvalidCosts",
            LedgerError::Overflow => "Overflow",
        }
    }

    /// Returns `true` for invariant violations that indicate a bug or an
    /// attack rather than an ordinary rejected call.
    pub fn is_fatal(&self) -> bool {
        matches!(self, LedgerError::Overflow)
    }
}
