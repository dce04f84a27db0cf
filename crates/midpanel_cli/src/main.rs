//! midpanel CLI
//!
//! Operator tools for the reseller panel: mirror reconciliation, subscriber
//! writes across one or two middleware endpoints, ledger and payment
//! bookkeeping, and store inspection.
//!
//! # Commands
//!
//! - `sync` - Rebuild the local mirror from the primary middleware
//! - `account` - Create, renew, suspend, delete, or message subscribers
//! - `ledger` - List, correct, or void financial events
//! - `payment` - List, record, or cancel reseller payments
//! - `balance` - Windowed balance report for a reseller
//! - `plans` - List tariff plans offered by the primary middleware
//! - `reseller` - Manage the reseller directory
//! - `recover` - Sweep dangling write intents after an interrupted create
//! - `inspect` - Display panel store statistics

mod commands;
mod config;
mod context;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// midpanel command-line operator tools.
#[derive(Parser)]
#[command(name = "midpanel")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the panel configuration file (JSON)
    #[arg(global = true, short, long)]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Rebuild the local mirror from the primary middleware
    Sync {
        /// Limit the pass to one reseller
        #[arg(short, long)]
        reseller: Option<u64>,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Create, renew, suspend, delete, or message subscribers
    Account {
        #[command(subcommand)]
        command: commands::account::AccountCommand,
    },

    /// List, correct, or void financial events
    Ledger {
        #[command(subcommand)]
        command: commands::ledger::LedgerCommand,
    },

    /// List, record, or cancel reseller payments
    Payment {
        #[command(subcommand)]
        command: commands::payment::PaymentCommand,
    },

    /// Windowed balance report for a reseller
    Balance {
        /// Reseller to report on
        #[arg(short, long)]
        reseller: u64,

        /// Window start date, inclusive (YYYY-MM-DD)
        #[arg(long)]
        from: Option<String>,

        /// Window end date, inclusive (YYYY-MM-DD)
        #[arg(long)]
        to: Option<String>,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// List tariff plans offered by the primary middleware
    Plans {
        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Manage the reseller directory
    Reseller {
        #[command(subcommand)]
        command: commands::reseller::ResellerCommand,
    },

    /// Sweep dangling write intents left by interrupted creates
    Recover {
        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Display panel store statistics
    Inspect {
        /// Show per-reseller account counts and balances
        #[arg(short, long)]
        resellers: bool,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Show version information
    Version,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.command {
        Commands::Sync { reseller, format } => {
            let ctx = open_context(cli.config)?;
            commands::sync::run(&ctx, reseller, &format)?;
        }
        Commands::Account { command } => {
            let ctx = open_context(cli.config)?;
            commands::account::run(&ctx, command)?;
        }
        Commands::Ledger { command } => {
            let ctx = open_context(cli.config)?;
            commands::ledger::run(&ctx, command)?;
        }
        Commands::Payment { command } => {
            let ctx = open_context(cli.config)?;
            commands::payment::run(&ctx, command)?;
        }
        Commands::Balance {
            reseller,
            from,
            to,
            format,
        } => {
            let ctx = open_context(cli.config)?;
            commands::balance::run(&ctx, reseller, from.as_deref(), to.as_deref(), &format)?;
        }
        Commands::Plans { format } => {
            let ctx = open_context(cli.config)?;
            commands::plans::run(&ctx, &format)?;
        }
        Commands::Reseller { command } => {
            let ctx = open_context(cli.config)?;
            commands::reseller::run(&ctx, command)?;
        }
        Commands::Recover { format } => {
            let ctx = open_context(cli.config)?;
            commands::recover::run(&ctx, &format)?;
        }
        Commands::Inspect { resellers, format } => {
            let ctx = open_context(cli.config)?;
            commands::inspect::run(&ctx, resellers, &format)?;
        }
        Commands::Version => {
            println!("midpanel CLI v{}", env!("CARGO_PKG_VERSION"));
            println!("midpanel Core v{}", midpanel_core::VERSION);
        }
    }

    Ok(())
}

fn open_context(
    config: Option<PathBuf>,
) -> Result<context::PanelContext, Box<dyn std::error::Error>> {
    let path = config.ok_or("Configuration file required; pass --config")?;
    let config = config::PanelConfig::load(&path)?;
    context::PanelContext::open(config)
}
