//! Allowance CLI - children's allowances in your terminal

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

mod commands;
mod output;

use commands::{account, config, export, receive, settle, status, tx};

/// Allow - allowance, tithing and savings tracker
#[derive(Parser)]
#[command(name = "allow", version, about, long_about = None)]
struct Cli {
    /// The logging verbosity. One of, from least to most verbose:
    /// off, error, warn, info, debug, trace
    ///
    /// This can be overridden by RUST_LOG.
    #[arg(long, global = true, default_value_t = LevelFilter::WARN)]
    log_level: LevelFilter,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show balances for every child
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Manage children's accounts
    Account {
        #[command(subcommand)]
        command: account::AccountCommands,
    },

    /// Record, edit or delete transactions
    Tx {
        #[command(subcommand)]
        command: tx::TxCommands,
    },

    /// Pay out everything currently due
    Settle {
        #[command(subcommand)]
        command: settle::SettleCommands,
    },

    /// Replace the ledger with a snapshot received from another device
    Receive {
        /// File holding a replication message or a bare snapshot
        file: PathBuf,
        /// Skip confirmation prompt
        #[arg(long, short)]
        force: bool,
    },

    /// Print the replication message for the current ledger
    Export {
        /// Write to a file instead of stdout
        #[arg(long, short)]
        output: Option<PathBuf>,
    },

    /// Show or change device settings
    Config {
        #[command(subcommand)]
        command: Option<config::ConfigCommands>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logger(cli.log_level);
    debug!("Log level set to {}", cli.log_level.to_string().to_lowercase());

    match run(cli.command).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            output::error(&format!("{:#}", e));
            ExitCode::FAILURE
        }
    }
}

fn init_logger(level: LevelFilter) {
    let filter = match std::env::var("RUST_LOG").ok() {
        Some(_) => EnvFilter::from_default_env(),
        None => EnvFilter::new(format!(
            "allowance_core={},{}={}",
            level,
            env!("CARGO_CRATE_NAME"),
            level
        )),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(command: Commands) -> Result<()> {
    match command {
        Commands::Status { json } => status::run(json).await,
        Commands::Account { command } => account::run(command).await,
        Commands::Tx { command } => tx::run(command).await,
        Commands::Settle { command } => settle::run(command).await,
        Commands::Receive { file, force } => receive::run(&file, force).await,
        Commands::Export { output } => export::run(output.as_deref()).await,
        Commands::Config { command } => config::run(command),
    }
}
