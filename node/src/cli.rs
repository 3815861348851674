//! # CLI Interface
//!
//! Defines the command-line argument structure for `tiermint-node` using
//! `clap` derive. Supports four subcommands: `run`, `init`, `status`,
//! and `version`.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use tiermint_protocol::config::{
    DEFAULT_COST_N_IN_F, DEFAULT_COST_T_IN_F, DEFAULT_COST_T_IN_N, DEFAULT_METRICS_PORT,
    DEFAULT_RPC_PORT,
};

/// Tiered mint ledger node.
///
/// Hosts a single tiered mint ledger, persists it to disk after every
/// accepted call, serves the REST / JSON-RPC / WebSocket API and exposes
/// Prometheus metrics.
#[derive(Parser, Debug)]
#[command(
    name = "tiermint-node",
    about = "Tiered mint ledger node",
    version,
    propagate_version = true
)]
pub struct TiermintNodeCli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level subcommands for the node binary.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the node, loading the ledger from the data directory.
    Run(RunArgs),
    /// Initialize a data directory and deploy a fresh ledger into it.
    Init(InitArgs),
    /// Query the status of a running node via its HTTP endpoint.
    Status(StatusArgs),
    /// Print version information and exit.
    Version,
}

/// Arguments for the `run` subcommand.
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Path to the node data directory where the ledger database lives.
    ///
    /// Created on first run if it does not exist.
    #[arg(long, short = 'd', env = "TIERMINT_DATA_DIR", default_value = ".tiermint")]
    pub data_dir: PathBuf,

    /// Port for the JSON-RPC, REST and WebSocket API.
    #[arg(long, env = "TIERMINT_RPC_PORT", default_value_t = DEFAULT_RPC_PORT)]
    pub rpc_port: u16,

    /// Port for the Prometheus metrics endpoint.
    #[arg(long, env = "TIERMINT_METRICS_PORT", default_value_t = DEFAULT_METRICS_PORT)]
    pub metrics_port: u16,

    /// Network to serve: mainnet, testnet, or devnet.
    #[arg(long, env = "TIERMINT_NETWORK", default_value = "devnet")]
    pub network: String,

    /// Deployer address used when the data directory holds no ledger yet.
    ///
    /// Ignored once a ledger has been persisted.
    #[arg(long, env = "TIERMINT_DEPLOYER")]
    pub deployer: Option<String>,

    /// Log output format: pretty or json.
    #[arg(long, env = "TIERMINT_LOG_FORMAT", default_value = "pretty")]
    pub log_format: String,
}

/// Arguments for the `init` subcommand.
#[derive(Parser, Debug)]
pub struct InitArgs {
    /// Path to the data directory to initialize.
    #[arg(long, short = 'd', env = "TIERMINT_DATA_DIR", default_value = ".tiermint")]
    pub data_dir: PathBuf,

    /// Network to configure for: mainnet, testnet, or devnet.
    #[arg(long, env = "TIERMINT_NETWORK", default_value = "devnet")]
    pub network: String,

    /// Hex-encoded deployer address. A random one is generated when omitted.
    #[arg(long, env = "TIERMINT_DEPLOYER")]
    pub deployer: Option<String>,

    /// Deployer nonce mixed into the ledger address.
    #[arg(long, default_value_t = 0)]
    pub nonce: u64,

    /// Price of one tier-F unit, in whole currency units (e.g. "0.01").
    #[arg(long, default_value = "0.01")]
    pub price_f: String,

    /// Tier-F units burned per tier-N unit.
    #[arg(long, default_value_t = DEFAULT_COST_N_IN_F)]
    pub cost_n_in_f: u64,

    /// Tier-F units burned per tier-T unit.
    #[arg(long, default_value_t = DEFAULT_COST_T_IN_F)]
    pub cost_t_in_f: u64,

    /// Tier-N units burned per tier-T unit.
    #[arg(long, default_value_t = DEFAULT_COST_T_IN_N)]
    pub cost_t_in_n: u64,
}

/// Arguments for the `status` subcommand.
#[derive(Parser, Debug)]
pub struct StatusArgs {
    /// HTTP endpoint of the running node.
    #[arg(long, default_value = "http://127.0.0.1:9841")]
    pub rpc_url: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli_structure() {
        TiermintNodeCli::command().debug_assert();
    }

    #[test]
    fn init_defaults_match_protocol_costs() {
        let cli = TiermintNodeCli::parse_from(["tiermint-node", "init", "--nonce", "4"]);
        match cli.command {
            Commands::Init(args) => {
                assert_eq!(args.nonce, 4);
                assert_eq!(args.price_f, "0.01");
                assert_eq!(args.cost_n_in_f, 3);
                assert_eq!(args.cost_t_in_f, 10);
                assert_eq!(args.cost_t_in_n, 1);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }
}
