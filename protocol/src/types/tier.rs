//! The three token tiers and their acquisition precedence.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One of the three token kinds issued by the ledger.
///
/// Ordered by acquisition precedence: `F` is bought with native currency,
/// `N` is minted by burning `F`, and `T` by burning both `F` and `N`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Tier {
    F,
    N,
    T,
}

impl Tier {
    /// All tiers in precedence order.
    pub const ALL: [Tier; 3] = [Tier::F, Tier::N, Tier::T];

    /// Numeric token id used on the wire (0, 1, 2).
    pub fn token_id(self) -> u8 {
        match self {
            Tier::F => 0,
            Tier::N => 1,
            Tier::T => 2,
        }
    }

    /// Position of this tier in per-tier arrays.
    pub fn index(self) -> usize {
        self.token_id() as usize
    }

    /// Inverse of [`token_id`](Self::token_id).
    pub fn from_token_id(id: u64) -> Option<Self> {
        match id {
            0 => Some(Tier::F),
            1 => Some(Tier::N),
            2 => Some(Tier::T),
            _ => None,
        }
    }

    /// Display name, e.g. `"Token F"`.
    pub fn token_name(self) -> &'static str {
        match self {
            Tier::F => "Token F",
            Tier::N => "Token N",
            Tier::T => "Token T",
        }
    }

    /// Returns `true` for tiers minted by burning lower tiers.
    pub fn is_burn_funded(self) -> bool {
        !matches!(self, Tier::F)
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tier::F => write!(f, "F"),
            Tier::N => write!(f, "N"),
            Tier::T => write!(f, "T"),
        }
    }
}

/// Error for unparseable tier strings.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown tier: {0}")]
pub struct UnknownTier(pub String);

impl std::str::FromStr for Tier {
    type Err = UnknownTier;

    /// Accepts `F`, `TokenF`, `token_f` or the numeric token id, in any case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .chars()
            .filter(|c| *c != '_' && *c != ' ')
            .collect::<String>()
            .to_ascii_uppercase();
        let name = normalized.strip_prefix("TOKEN").unwrap_or(&normalized);
        match name {
            "F" | "0" => Ok(Tier::F),
            "N" | "1" => Ok(Tier::N),
            "T" | "2" => Ok(Tier::T),
            _ => Err(UnknownTier(s.to_string())),
        }
    }
}
