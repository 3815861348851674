//! # Protocol Configuration & Constants
//!
//! Every magic number in the tiered mint ledger lives here. If you're
//! hardcoding a price or a burn ratio somewhere else, move it here.
//!
//! The cost constants are the economic DNA of a deployed ledger: they are
//! copied into the contract at construction and can never change afterwards.
//! A node can override them at `init` time, but only before the ledger exists.

use crate::types::amount::{Wei, WEI_PER_ETHER};

// ---------------------------------------------------------------------------
// Network Identifiers
// ---------------------------------------------------------------------------

/// Mainnet. Payments here are real money.
pub const NETWORK_ID_MAINNET: u32 = 0x544D4E54; // "TMNT"

/// Testnet: public, long-lived, worthless currency.
pub const NETWORK_ID_TESTNET: u32 = 0x544D5454; // "TMTT"

/// Devnet: local, disposable. The default for `tiermint-node init`.
pub const NETWORK_ID_DEVNET: u32 = 0x544D4456; // "TMDV"

// ---------------------------------------------------------------------------
// Protocol Version
// ---------------------------------------------------------------------------

/// Major version. Bump on any change to mint/burn arithmetic or error
/// precedence, since clients match on both.
pub const PROTOCOL_VERSION_MAJOR: u16 = 0;

/// Minor version: backward-compatible additions.
pub const PROTOCOL_VERSION_MINOR: u16 = 1;

/// Patch version: fixes that don't change observable behavior.
pub const PROTOCOL_VERSION_PATCH: u16 = 0;

/// The full version string.
pub const PROTOCOL_VERSION: &str = "0.1.0";

/// Snapshot format version written next to every persisted ledger.
/// Bump whenever the serialized layout of the contract changes.
pub const SNAPSHOT_FORMAT_VERSION: u32 = 2;

// ---------------------------------------------------------------------------
// Addressing & Hashing
// ---------------------------------------------------------------------------

/// Account addresses are 20 bytes, rendered as `0x` + 40 hex characters.
pub const ADDRESS_LENGTH: usize = 20;

/// BLAKE3 output length in bytes.
pub const HASH_OUTPUT_LENGTH: usize = 32;

/// Domain separator for deriving a ledger's own address from its deployer.
/// Changing this changes every ledger address, so don't.
pub const LEDGER_ADDRESS_DOMAIN: &[u8] = b"tiermint/ledger";

/// Domain separator for state-root leaves.
pub const STATE_LEAF_DOMAIN: &[u8] = b"tiermint/balance";

// ---------------------------------------------------------------------------
// Mint Economics
// ---------------------------------------------------------------------------

/// Price of one tier-F token: 0.01 of the native currency unit.
pub const DEFAULT_PRICE_F_WEI: Wei = WEI_PER_ETHER / 100;

/// Tier-F tokens burned per tier-N token minted.
pub const DEFAULT_COST_N_IN_F: u64 = 3;

/// Tier-F tokens burned per tier-T token minted.
pub const DEFAULT_COST_T_IN_F: u64 = 10;

/// Tier-N tokens burned per tier-T token minted.
pub const DEFAULT_COST_T_IN_N: u64 = 1;

// ---------------------------------------------------------------------------
// Node Parameters
// ---------------------------------------------------------------------------

/// Default RPC/REST API port.
pub const DEFAULT_RPC_PORT: u16 = 9841;

/// Default metrics (Prometheus) port.
pub const DEFAULT_METRICS_PORT: u16 = 9842;

/// Capacity of the in-process event broadcast channel. Slow WebSocket
/// subscribers that fall further behind than this lose events.
pub const EVENT_CHANNEL_CAPACITY: usize = 256;

// ---------------------------------------------------------------------------
// Utility
// ---------------------------------------------------------------------------

/// Returns a friendly name for a network ID, mainly for logging.
pub fn network_name(network_id: u32) -> String {
    match network_id {
        NETWORK_ID_MAINNET => "mainnet".to_string(),
        NETWORK_ID_TESTNET => "testnet".to_string(),
        NETWORK_ID_DEVNET => "devnet".to_string(),
        other => format!("unknown(0x{:08X})", other),
    }
}

/// Resolves a network name back to its ID. Unknown names yield `None`.
pub fn network_id(name: &str) -> Option<u32> {
    match name.to_ascii_lowercase().as_str() {
        "mainnet" => Some(NETWORK_ID_MAINNET),
        "testnet" => Some(NETWORK_ID_TESTNET),
        "devnet" => Some(NETWORK_ID_DEVNET),
        _ => None,
    }
}
