//! Reseller directory command implementations.

use crate::commands::format_amount;
use crate::context::PanelContext;
use clap::Subcommand;
use midpanel_core::{Currency, Reseller, ResellerId, Scope};
use midpanel_ledger::Window;
use serde::Serialize;

/// Reseller directory operations.
#[derive(Subcommand)]
pub enum ResellerCommand {
    /// Add a reseller or update an existing one
    Add {
        /// Panel-side identifier
        #[arg(short, long)]
        id: u64,

        /// Display name
        #[arg(short, long)]
        name: String,

        /// Currency all of this reseller's ledger rows are kept in
        #[arg(long)]
        currency: String,

        /// Balance ceiling before further sales are refused, minor units
        #[arg(long)]
        credit_limit: Option<i64>,

        /// Maximum number of owned accounts
        #[arg(long)]
        max_accounts: Option<u32>,
    },

    /// List the reseller directory
    List {
        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },
}

/// One directory entry for output.
#[derive(Debug, Serialize)]
pub struct ResellerRow {
    /// Reseller id.
    pub id: u64,
    /// Display name.
    pub name: String,
    /// Ledger currency.
    pub currency: String,
    /// Credit limit in minor units, if one is set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credit_limit: Option<i64>,
    /// Account cap, if one is set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_accounts: Option<u32>,
    /// Mirrored rows currently owned.
    pub accounts: usize,
    /// Closing balance over all history, minor units.
    pub balance: i64,
}

/// Runs a reseller subcommand.
pub fn run(ctx: &PanelContext, command: ResellerCommand) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        ResellerCommand::Add {
            id,
            name,
            currency,
            credit_limit,
            max_accounts,
        } => add(ctx, id, name, &currency, credit_limit, max_accounts),
        ResellerCommand::List { format } => list(ctx, &format),
    }
}

fn add(
    ctx: &PanelContext,
    id: u64,
    name: String,
    currency: &str,
    credit_limit: Option<i64>,
    max_accounts: Option<u32>,
) -> Result<(), Box<dyn std::error::Error>> {
    let actor = ctx.actor();
    if !actor.capabilities.all_resellers {
        return Err(format!(
            "{} may not manage the reseller directory",
            actor.label
        )
        .into());
    }

    let mut entry = Reseller::new(ResellerId::new(id), name, Currency::parse(currency)?);
    if let Some(limit) = credit_limit {
        entry = entry.with_credit_limit(limit);
    }
    if let Some(max) = max_accounts {
        entry = entry.with_max_accounts(max);
    }

    ctx.resellers.upsert(entry)?;
    println!("Reseller {id} saved");
    Ok(())
}

fn list(ctx: &PanelContext, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    let actor = ctx.actor();
    let mut entries = ctx.resellers.list();
    if !actor.capabilities.all_resellers {
        entries.retain(|entry| Some(entry.id) == actor.reseller);
    }

    let rows: Vec<ResellerRow> = entries
        .into_iter()
        .map(|entry| {
            let accounts = ctx.mirror.accounts(Scope::Reseller(entry.id)).len();
            let balance = ctx.ledger.balance(entry.id, Window::ALL).closing_balance;
            ResellerRow {
                id: entry.id.as_u64(),
                name: entry.name,
                currency: entry.currency.to_string(),
                credit_limit: entry.credit_limit_minor,
                max_accounts: entry.max_accounts,
                accounts,
                balance,
            }
        })
        .collect();

    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&rows)?),
        _ => {
            println!("Resellers ({} total)", rows.len());
            println!();
            for row in &rows {
                println!(
                    "  [{}] {:24} {}  {:>4} accounts  balance {:>12}",
                    row.id,
                    row.name,
                    row.currency,
                    row.accounts,
                    format_amount(row.balance)
                );
            }
        }
    }

    Ok(())
}
