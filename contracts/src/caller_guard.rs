//! Rejects mint calls made by deployed contract code.
//!
//! The calling boundary declares what kind of caller it is forwarding via
//! [`CallerKind`]. Code still running its constructor has no deployed code
//! yet, so [`CallerKind::Constructing`] passes; that gap is kept on purpose
//! to match the code-size check it replaces.

use serde::{Deserialize, Serialize};
use tiermint_protocol::types::{CallContext, CallerKind};

use crate::error::LedgerError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallerGuard;

impl CallerGuard {
    /// Fails with [`LedgerError::ContractCallerRejected`] if `ctx` comes from
    /// deployed contract code.
    pub fn assert_is_originating_caller(&self, ctx: &CallContext) -> Result<(), LedgerError> {
        if ctx.kind.has_deployed_code() {
            tracing::debug!(caller = %ctx.caller, kind = %ctx.kind, "contract caller rejected");
            return Err(LedgerError::ContractCallerRejected);
        }
        if ctx.kind == CallerKind::Constructing {
            tracing::debug!(caller = %ctx.caller, "constructing caller passed origin guard");
        }
        Ok(())
    }
}
