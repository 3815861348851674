//! Operator approvals: which addresses may debit an owner's balances.
//!
//! Flags default to `false`. Only the owner can change their own entries;
//! the caller of [`ApprovalRegistry::set_approval`] is always the owner.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tiermint_protocol::types::Address;

use crate::error::LedgerError;
use crate::events::LedgerEvent;

/// Set of `(owner, operator)` pairs whose flag is `true`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalRegistry {
    approved: BTreeSet<(Address, Address)>,
}

impl ApprovalRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the flag for `(owner, operator)` to `approved`.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::SelfApproval`] if `owner == operator`.
    pub fn set_approval(
        &mut self,
        owner: Address,
        operator: Address,
        approved: bool,
    ) -> Result<LedgerEvent, LedgerError> {
        if owner == operator {
            return Err(LedgerError::SelfApproval);
        }
        if approved {
            self.approved.insert((owner, operator));
        } else {
            self.approved.remove(&(owner, operator));
        }
        Ok(LedgerEvent::ApprovalForAll {
            owner,
            operator,
            approved,
        })
    }

    pub fn is_approved(&self, owner: &Address, operator: &Address) -> bool {
        self.approved.contains(&(*owner, *operator))
    }

    /// Number of `(owner, operator)` pairs currently approved.
    pub fn len(&self) -> usize {
        self.approved.len()
    }

    pub fn is_empty(&self) -> bool {
        self.approved.is_empty()
    }
}
