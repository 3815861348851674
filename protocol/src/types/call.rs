//! # Call Context
//!
//! Every contract entry point receives a [`CallContext`] describing who is
//! calling, how much native currency is attached, and what kind of caller
//! it is. The caller kind is decided by the boundary that accepted the
//! request (the RPC layer, a test, an embedding host), never inspected by the
//! contract itself.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::address::Address;
use super::amount::Wei;

/// Where a call came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallerKind {
    /// A request submitted directly by an account holder.
    #[default]
    External,
    /// A call issued by deployed contract code.
    Contract,
    /// A call issued by contract code that is still running its constructor.
    ///
    /// A code-presence check cannot tell these apart from `External`
    /// callers, and the origin guard deliberately treats them the same way.
    Constructing,
}

impl CallerKind {
    /// Returns `true` if a code-presence check would see code at the caller.
    pub fn has_deployed_code(self) -> bool {
        matches!(self, CallerKind::Contract)
    }
}

impl fmt::Display for CallerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CallerKind::External => write!(f, "external"),
            CallerKind::Contract => write!(f, "contract"),
            CallerKind::Constructing => write!(f, "constructing"),
        }
    }
}

impl std::str::FromStr for CallerKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "external" | "eoa" => Ok(CallerKind::External),
            "contract" => Ok(CallerKind::Contract),
            "constructing" | "constructor" => Ok(CallerKind::Constructing),
            other => Err(format!("unknown caller kind: {}", other)),
        }
    }
}

/// The environment of a single contract call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallContext {
    /// The immediate caller. Balances are read from and credited to this
    /// address.
    pub caller: Address,
    /// Native currency attached to the call.
    pub value: Wei,
    /// What kind of caller this is.
    pub kind: CallerKind,
}

impl CallContext {
    /// A call from an external account with no attached value.
    pub fn external(caller: Address) -> Self {
        Self {
            caller,
            value: 0,
            kind: CallerKind::External,
        }
    }

    /// A call from deployed contract code.
    pub fn from_contract(caller: Address) -> Self {
        Self {
            caller,
            value: 0,
            kind: CallerKind::Contract,
        }
    }

    /// Attaches native currency to the call.
    pub fn with_value(mut self, value: Wei) -> Self {
        self.value = value;
        self
    }

    /// Overrides the caller kind.
    pub fn with_kind(mut self, kind: CallerKind) -> Self {
        self.kind = kind;
        self
    }
}
