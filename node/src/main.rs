// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # Tiermint Node
//!
//! Entry point for the `tiermint-node` binary. Parses CLI arguments,
//! initializes logging and metrics, loads the ledger from disk and serves the
//! HTTP/WS API.
//!
//! The binary supports four subcommands:
//!
//! - `run`    : start the node
//! - `init`   : initialize a data directory and deploy a ledger into it
//! - `status` : query a running node's status endpoint
//! - `version`: print build version information

mod api;
mod cli;
mod logging;
mod metrics;
mod service;

use anyhow::{bail, Context, Result};
use clap::Parser;
use std::path::Path;
use std::sync::Arc;
use tokio::signal;
use tokio::sync::broadcast;

use tiermint_contracts::{MintCosts, TierMintContract};
use tiermint_protocol::config::{self, EVENT_CHANNEL_CAPACITY};
use tiermint_protocol::storage::{LedgerStore, META_NETWORK};
use tiermint_protocol::types::{format_ether, parse_ether, Address};

use cli::{Commands, TiermintNodeCli};
use logging::LogFormat;
use metrics::NodeMetrics;
use service::{LedgerService, LEDGER_SNAPSHOT};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = TiermintNodeCli::parse();

    match cli.command {
        Commands::Run(args) => run_node(args).await,
        Commands::Init(args) => init_node(args),
        Commands::Status(args) => query_status(args).await,
        Commands::Version => {
            print_version();
            Ok(())
        }
    }
}

/// Resolves a network name to its id, rejecting unknown names.
fn resolve_network(name: &str) -> Result<u32> {
    config::network_id(name)
        .with_context(|| format!("unknown network '{}': expected mainnet, testnet or devnet", name))
}

fn parse_deployer(hex: Option<&str>) -> Result<Address> {
    match hex {
        Some(s) => s
            .parse::<Address>()
            .with_context(|| format!("invalid deployer address: {}", s)),
        None => {
            let generated = Address::random();
            tracing::warn!(deployer = %generated, "no deployer given, using a random address");
            Ok(generated)
        }
    }
}

/// Opens the store under `data_dir/db` and checks it belongs to `network`.
fn open_store(data_dir: &Path, network: &str) -> Result<LedgerStore> {
    let db_path = data_dir.join("db");
    std::fs::create_dir_all(&db_path)
        .with_context(|| format!("failed to create database directory: {}", db_path.display()))?;

    let store = LedgerStore::open(&db_path)
        .with_context(|| format!("failed to open database at {}", db_path.display()))?;

    bind_network(&store, network)
        .with_context(|| format!("data directory {} is unusable", data_dir.display()))?;
    Ok(store)
}

/// Records `network` in a fresh store, or checks it against the recorded one.
fn bind_network(store: &LedgerStore, network: &str) -> Result<()> {
    match store.get_meta(META_NETWORK)? {
        Some(stored) if stored != network => {
            bail!("store belongs to network '{}', not '{}'", stored, network)
        }
        Some(_) => Ok(()),
        None => Ok(store.put_meta(META_NETWORK, network)?),
    }
}

/// Starts the node: loads or deploys the ledger, then serves the API and
/// metrics endpoints until a shutdown signal arrives.
async fn run_node(args: cli::RunArgs) -> Result<()> {
    logging::init_logging(
        "tiermint_node=info,tiermint_contracts=info,tower_http=debug",
        LogFormat::from_str_lossy(&args.log_format),
    );

    let network_id = resolve_network(&args.network)?;
    tracing::info!(
        rpc_port = args.rpc_port,
        metrics_port = args.metrics_port,
        network = %args.network,
        data_dir = %args.data_dir.display(),
        "starting tiermint-node"
    );

    // --- Persistent storage ---
    let store = open_store(&args.data_dir, &args.network)?;

    // --- Metrics ---
    let node_metrics = Arc::new(NodeMetrics::new());

    // --- Event broadcast ---
    let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

    // --- Ledger ---
    // The deployer only matters when the store holds no ledger yet.
    let deployer = if store.has_snapshot(LEDGER_SNAPSHOT)? {
        Address::ZERO
    } else {
        parse_deployer(args.deployer.as_deref())?
    };
    let service = LedgerService::load_or_deploy(
        store,
        deployer,
        0,
        MintCosts::default(),
        Arc::clone(&node_metrics),
        event_tx.clone(),
    )?;
    let ledger_address = service.read(|c| c.ledger_address());

    // --- Application state ---
    let app_state = api::AppState {
        version: format!(
            "{} (protocol {})",
            env!("CARGO_PKG_VERSION"),
            config::PROTOCOL_VERSION,
        ),
        network: args.network.clone(),
        network_id,
        service: Arc::new(service),
        event_tx,
        metrics: Arc::clone(&node_metrics),
    };

    // --- API server ---
    let api_router = api::create_router(app_state);
    let api_addr = format!("0.0.0.0:{}", args.rpc_port);
    let api_listener = tokio::net::TcpListener::bind(&api_addr)
        .await
        .with_context(|| format!("failed to bind RPC listener on {}", api_addr))?;
    tracing::info!(ledger = %ledger_address, "RPC/API server listening on {}", api_addr);

    // --- Metrics server ---
    let metrics_router = axum::Router::new()
        .route("/metrics", axum::routing::get(metrics::metrics_handler))
        .with_state(Arc::clone(&node_metrics));
    let metrics_addr = format!("0.0.0.0:{}", args.metrics_port);
    let metrics_listener = tokio::net::TcpListener::bind(&metrics_addr)
        .await
        .with_context(|| format!("failed to bind metrics listener on {}", metrics_addr))?;
    tracing::info!("Metrics server listening on {}", metrics_addr);

    // --- Serve ---
    tokio::select! {
        res = axum::serve(api_listener, api_router) => {
            if let Err(e) = res {
                tracing::error!("API server error: {}", e);
            }
        }
        res = axum::serve(metrics_listener, metrics_router) => {
            if let Err(e) = res {
                tracing::error!("Metrics server error: {}", e);
            }
        }
        _ = shutdown_signal() => {
            tracing::info!("shutdown signal received, draining connections");
        }
    }

    tracing::info!("tiermint-node stopped");
    Ok(())
}

/// Initializes a data directory and deploys a fresh ledger into it.
fn init_node(args: cli::InitArgs) -> Result<()> {
    logging::init_logging("tiermint_node=info", LogFormat::Pretty);

    resolve_network(&args.network)?;
    let data_dir = &args.data_dir;
    tracing::info!(data_dir = %data_dir.display(), network = %args.network, "initializing node");

    let store = open_store(data_dir, &args.network)?;
    let metrics = Arc::new(NodeMetrics::new());
    let (event_tx, _) = broadcast::channel(1);
    if let Some(existing) = LedgerService::load(store.clone(), metrics, event_tx)? {
        bail!(
            "data directory {} already holds ledger {}",
            data_dir.display(),
            existing.read(|c| c.ledger_address())
        );
    }

    let price_f = parse_ether(&args.price_f)
        .with_context(|| format!("invalid --price-f: {}", args.price_f))?;
    let costs = MintCosts::new(price_f, args.cost_n_in_f, args.cost_t_in_f, args.cost_t_in_n)?;
    let deployer = parse_deployer(args.deployer.as_deref())?;

    let contract = TierMintContract::deploy(deployer, args.nonce, costs)?;
    store
        .put_snapshot(LEDGER_SNAPSHOT, &contract)
        .context("failed to persist ledger snapshot")?;

    tracing::info!(
        ledger = %contract.ledger_address(),
        deployer = %deployer,
        "ledger deployed"
    );

    println!("Ledger initialized successfully.");
    println!("  Data directory : {}", data_dir.display());
    println!("  Network        : {}", args.network);
    println!("  Deployer       : {}", deployer);
    println!("  Ledger address : {}", contract.ledger_address());
    println!("  Token F price  : {} ({} wei)", format_ether(price_f), price_f);
    println!("  Token N cost   : {} F", costs.n_in_f);
    println!("  Token T cost   : {} F + {} N", costs.t_in_f, costs.t_in_n);

    Ok(())
}

/// Queries a running node's status endpoint and prints the result.
async fn query_status(args: cli::StatusArgs) -> Result<()> {
    let body = http_get(&args.rpc_url, "/status").await?;
    println!("{}", body);
    Ok(())
}

/// Minimal HTTP/1.1 GET over a raw TCP stream.
async fn http_get(base_url: &str, path: &str) -> Result<String> {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    let authority = base_url
        .strip_prefix("http://")
        .unwrap_or(base_url)
        .trim_end_matches('/');
    if authority.is_empty() || authority.contains('/') {
        bail!("invalid node URL: {}", base_url);
    }
    let addr = if authority.contains(':') {
        authority.to_string()
    } else {
        format!("{}:80", authority)
    };

    let mut stream = tokio::net::TcpStream::connect(&addr)
        .await
        .with_context(|| format!("failed to connect to {}", addr))?;

    let request = format!(
        "GET {} HTTP/1.1\r\nHost: {}\r\nConnection: close\r\n\r\n",
        path, authority,
    );
    stream.write_all(request.as_bytes()).await?;
    stream.shutdown().await?;

    let mut buf = Vec::new();
    stream.read_to_end(&mut buf).await?;
    let response = String::from_utf8_lossy(&buf);

    let (head, body) = response
        .split_once("\r\n\r\n")
        .context("malformed HTTP response")?;
    if !head.starts_with("HTTP/1.1 200") {
        bail!(
            "node returned {}",
            head.lines().next().unwrap_or("an empty status line")
        );
    }
    Ok(body.to_string())
}

/// Prints version information to stdout.
fn print_version() {
    println!("tiermint-node {}", env!("CARGO_PKG_VERSION"));
    println!("protocol      {}", config::PROTOCOL_VERSION);
    println!("rustc         {}", rustc_version());
}

/// Returns the Rust compiler version used to build this binary.
fn rustc_version() -> &'static str {
    option_env!("RUSTC_VERSION").unwrap_or("unknown")
}

/// Waits for SIGINT (Ctrl+C) or SIGTERM, whichever comes first.
///
/// On non-Unix platforms, only Ctrl+C is supported.
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
