// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # ATTEST Registry Node
//!
//! Entry point for the `attest-node` binary. Parses CLI arguments,
//! initializes logging and metrics, replays the ledger, and serves the
//! HTTP API.
//!
//! Subcommands:
//!
//! - `run`: start the node
//! - `init`: create the data directory and an authority keypair
//! - `status`: print a running node's totals
//! - `check`: print the validity of one credential
//! - `version`: print build version information

mod api;
mod auth;
mod cli;
mod client;
mod logging;
mod metrics;

use anyhow::{bail, Context, Result};
use clap::Parser;
use std::path::Path;
use std::sync::Arc;
use tokio::signal;

use attest_contracts::Engine;
use attest_protocol::crypto::{Hash256, Keypair};
use attest_protocol::identity::Address;
use attest_protocol::storage::LedgerDb;

use cli::{AttestNodeCli, Commands};
use client::{ClientConfig, EngineClient};
use logging::LogFormat;
use metrics::NodeMetrics;

/// Authority key file inside the data directory, written by `init`.
const AUTHORITY_KEY_FILE: &str = "authority.key";
/// Ledger database directory inside the data directory.
const LEDGER_DIR: &str = "ledger";

#[tokio::main]
async fn main() -> Result<()> {
    let cli = AttestNodeCli::parse();

    match cli.command {
        Commands::Run(args) => run_node(args).await,
        Commands::Init(args) => init_node(args),
        Commands::Status(args) => query_status(args).await,
        Commands::Check(args) => check_credential(args).await,
        Commands::Version => {
            print_version();
            Ok(())
        }
    }
}

/// Starts the node: replays the ledger, then serves the API and metrics.
async fn run_node(args: cli::RunArgs) -> Result<()> {
    logging::init_logging(logging::DEFAULT_DIRECTIVES, args.log_format.into());

    tracing::info!(
        rpc_port = args.rpc_port,
        metrics_port = args.metrics_port,
        data_dir = %args.data_dir.display(),
        "starting attest-node"
    );

    let authority = resolve_authority(args.authority.as_deref(), &args.data_dir)?;
    tracing::info!(authority = %authority, "registry authority");

    // --- Persistent storage ---
    let db_path = args.data_dir.join(LEDGER_DIR);
    std::fs::create_dir_all(&db_path)
        .with_context(|| format!("failed to create ledger directory: {}", db_path.display()))?;
    let db = LedgerDb::open(&db_path)
        .with_context(|| format!("failed to open ledger at {}", db_path.display()))?;
    tracing::info!(path = %db_path.display(), events = db.event_count(), "ledger opened");

    // --- Metrics ---
    let node_metrics = Arc::new(NodeMetrics::new().context("failed to register metrics")?);

    // --- Engine ---
    let engine = Engine::builder(authority)
        .sink(node_metrics.clone())
        .open(db.clone())
        .context("failed to replay ledger")?;
    tracing::info!(stats = ?engine.stats(), "registries ready");

    let app_state = api::AppState {
        version: format!(
            "{} (protocol {})",
            env!("CARGO_PKG_VERSION"),
            attest_protocol::config::PROTOCOL_VERSION,
        ),
        engine: Arc::new(engine),
        metrics: Arc::clone(&node_metrics),
    };

    // --- API server ---
    let api_router = api::create_router(app_state);
    let api_addr = format!("0.0.0.0:{}", args.rpc_port);
    let api_listener = tokio::net::TcpListener::bind(&api_addr)
        .await
        .with_context(|| format!("failed to bind API listener on {}", api_addr))?;
    tracing::info!("API server listening on {}", api_addr);

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
            tracing::info!("shutdown signal received");
        }
    }

    db.flush().context("failed to flush ledger")?;
    tracing::info!("attest-node stopped");
    Ok(())
}

/// The authority address: the explicit flag wins, otherwise the key file
/// written by `init`.
fn resolve_authority(flag: Option<&str>, data_dir: &Path) -> Result<Address> {
    if let Some(raw) = flag {
        return Address::parse(raw).with_context(|| format!("invalid --authority {raw:?}"));
    }
    let key_path = data_dir.join(AUTHORITY_KEY_FILE);
    let hex = std::fs::read_to_string(&key_path).with_context(|| {
        format!(
            "no --authority given and no key at {} (run `attest-node init`)",
            key_path.display()
        )
    })?;
    let keypair = Keypair::from_hex(hex.trim())
        .with_context(|| format!("malformed authority key in {}", key_path.display()))?;
    Ok(keypair.address())
}

/// Creates the data directory and writes a fresh authority keypair.
fn init_node(args: cli::InitArgs) -> Result<()> {
    logging::init_logging("attest_node=info", LogFormat::Pretty);

    let data_dir = &args.data_dir;
    std::fs::create_dir_all(data_dir)
        .with_context(|| format!("failed to create data directory: {}", data_dir.display()))?;

    let key_path = data_dir.join(AUTHORITY_KEY_FILE);
    if key_path.exists() && !args.force {
        bail!(
            "{} already exists; pass --force to replace it",
            key_path.display()
        );
    }

    let keypair = Keypair::generate();
    write_secret_key(&key_path, &keypair.to_hex())
        .with_context(|| format!("failed to write authority key to {}", key_path.display()))?;

    tracing::info!(
        address = %keypair.address(),
        key_path = %key_path.display(),
        "authority keypair generated"
    );

    println!("Node initialized.");
    println!("  Data directory : {}", data_dir.display());
    println!("  Authority key  : {}", key_path.display());
    println!("  Authority      : {}", keypair.address());
    println!("  Public key     : {}", keypair.public_key().to_hex());

    Ok(())
}

/// Writes `contents` to a fresh file readable by the owner only.
///
/// An existing file is removed first so the mode applies from creation.
fn write_secret_key(path: &Path, contents: &str) -> std::io::Result<()> {
    use std::io::Write;

    match std::fs::remove_file(path) {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => return Err(e),
    }

    let mut options = std::fs::OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    let mut file = options.open(path)?;
    file.write_all(contents.as_bytes())?;
    file.sync_all()
}

/// Prints a running node's totals as JSON.
async fn query_status(args: cli::StatusArgs) -> Result<()> {
    let client = EngineClient::new(ClientConfig::new(&args.rpc_url))?;
    let stats = client
        .stats()
        .await
        .with_context(|| format!("failed to query {}", args.rpc_url))?;
    println!("{}", serde_json::to_string_pretty(&stats)?);
    Ok(())
}

/// Prints the validity of one credential as JSON. Exits non-zero when the
/// credential is not currently valid, so scripts can branch on it.
async fn check_credential(args: cli::CheckArgs) -> Result<()> {
    let hash = Hash256::from_hex(&args.hash)
        .with_context(|| format!("invalid credential hash {:?}", args.hash))?;
    let client = EngineClient::new(ClientConfig::new(&args.rpc_url))?;
    let validity = client
        .validity(&hash)
        .await
        .with_context(|| format!("failed to query {}", args.rpc_url))?;
    println!("{}", serde_json::to_string_pretty(&validity)?);
    if !validity.valid {
        std::process::exit(1);
    }
    Ok(())
}

fn print_version() {
    println!("attest-node {}", env!("CARGO_PKG_VERSION"));
    println!("protocol    {}", attest_protocol::config::PROTOCOL_VERSION);
    println!("ledger      v{}", attest_protocol::config::LEDGER_SCHEMA_VERSION);
}

/// Waits for SIGINT (Ctrl+C) or SIGTERM, whichever comes first.
///
/// On non-Unix platforms, only Ctrl+C is supported.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!("failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn authority_from_flag_or_key_file() {
        let dir = tempfile::tempdir().unwrap();
        let flag = "0x00000000000000000000000000000000000000aa";
        assert_eq!(
            resolve_authority(Some(flag), dir.path()).unwrap(),
            Address::parse(flag).unwrap()
        );

        assert!(resolve_authority(None, dir.path()).is_err());

        let keypair = Keypair::from_seed(&[5; 32]);
        std::fs::write(dir.path().join(AUTHORITY_KEY_FILE), keypair.to_hex()).unwrap();
        assert_eq!(
            resolve_authority(None, dir.path()).unwrap(),
            keypair.address()
        );
    }

    #[test]
    fn secret_key_is_owner_only_and_replaced() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(AUTHORITY_KEY_FILE);
        std::fs::write(&path, "stale").unwrap();

        let keypair = Keypair::from_seed(&[6; 32]);
        write_secret_key(&path, &keypair.to_hex()).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), keypair.to_hex());

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = std::fs::metadata(&path).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o600);
        }
    }

    #[test]
    fn bad_authority_flag_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        assert!(resolve_authority(Some("not-an-address"), dir.path()).is_err());
    }
}
