//! # CLI Interface
//!
//! Defines the command-line argument structure for `attest-node` using
//! `clap` derive. Every flag that matters in deployment also reads an
//! `ATTEST_*` environment variable.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use attest_protocol::config::{DEFAULT_DATA_DIR, DEFAULT_METRICS_PORT, DEFAULT_RPC_PORT};

use crate::logging::LogFormat;

/// ATTEST credential registry node.
///
/// Hosts the issuer, DID and credential registries over a sled ledger,
/// serves the HTTP API, and exposes Prometheus metrics.
#[derive(Parser, Debug)]
#[command(
    name = "attest-node",
    about = "ATTEST credential registry node",
    version,
    propagate_version = true
)]
pub struct AttestNodeCli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the registry node.
    Run(RunArgs),
    /// Create the data directory and generate an authority keypair.
    Init(InitArgs),
    /// Print the totals reported by a running node.
    Status(StatusArgs),
    /// Check the validity of one credential on a running node.
    Check(CheckArgs),
    /// Print version information and exit.
    Version,
}

#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Directory holding the ledger database and keys.
    ///
    /// Created on first run if it does not exist.
    #[arg(long, short = 'd', env = "ATTEST_DATA_DIR", default_value = DEFAULT_DATA_DIR)]
    pub data_dir: PathBuf,

    /// Port for the HTTP API.
    #[arg(long, env = "ATTEST_RPC_PORT", default_value_t = DEFAULT_RPC_PORT)]
    pub rpc_port: u16,

    /// Port for the Prometheus metrics endpoint.
    #[arg(long, env = "ATTEST_METRICS_PORT", default_value_t = DEFAULT_METRICS_PORT)]
    pub metrics_port: u16,

    /// Address allowed to verify issuers (`0x` + 40 hex).
    ///
    /// When omitted, the node derives it from `authority.key` in the data
    /// directory, as written by `init`.
    #[arg(long, env = "ATTEST_AUTHORITY")]
    pub authority: Option<String>,

    /// Log output format.
    #[arg(long, env = "ATTEST_LOG_FORMAT", value_enum, default_value_t = LogFormatArg::Pretty)]
    pub log_format: LogFormatArg,
}

#[derive(Parser, Debug)]
pub struct InitArgs {
    /// Data directory to initialize.
    #[arg(long, short = 'd', env = "ATTEST_DATA_DIR", default_value = DEFAULT_DATA_DIR)]
    pub data_dir: PathBuf,

    /// Overwrite an existing authority key.
    #[arg(long)]
    pub force: bool,
}

#[derive(Parser, Debug)]
pub struct StatusArgs {
    /// API endpoint of the running node.
    #[arg(long, env = "ATTEST_RPC_URL", default_value = "http://127.0.0.1:9841")]
    pub rpc_url: String,
}

#[derive(Parser, Debug)]
pub struct CheckArgs {
    /// Credential hash (`0x` + 64 hex).
    pub hash: String,

    /// API endpoint of the running node.
    #[arg(long, env = "ATTEST_RPC_URL", default_value = "http://127.0.0.1:9841")]
    pub rpc_url: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Json,
}

impl From<LogFormatArg> for LogFormat {
    fn from(arg: LogFormatArg) -> Self {
        match arg {
            LogFormatArg::Pretty => LogFormat::Pretty,
            LogFormatArg::Json => LogFormat::Json,
        }
    }
}
