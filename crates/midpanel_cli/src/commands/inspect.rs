//! Inspect command implementation.

use crate::commands::format_amount;
use crate::context::PanelContext;
use midpanel_core::Scope;
use midpanel_ledger::Window;
use serde::Serialize;

/// Panel store statistics.
#[derive(Debug, Serialize)]
pub struct PanelStats {
    /// Panel directory path.
    pub data_dir: String,
    /// Mirrored subscriber rows.
    pub accounts: usize,
    /// Rows with no resolved owner.
    pub unassigned_accounts: usize,
    /// Resellers in the directory.
    pub resellers: usize,
    /// Financial events in the ledger journal.
    pub ledger_events: usize,
    /// Payments in the ledger journal.
    pub payments: usize,
    /// Orphan audit notes.
    pub orphan_notes: usize,
    /// Write intents awaiting the recovery sweep.
    pub pending_intents: usize,
    /// Per-reseller breakdown, when requested.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub breakdown: Vec<ResellerStats>,
}

/// Per-reseller figures for the breakdown listing.
#[derive(Debug, Serialize)]
pub struct ResellerStats {
    /// Reseller id.
    pub id: u64,
    /// Display name.
    pub name: String,
    /// Mirrored rows owned by this reseller.
    pub accounts: usize,
    /// Closing balance over all history, minor units.
    pub balance: i64,
}

/// Runs the inspect command.
pub fn run(
    ctx: &PanelContext,
    resellers: bool,
    format: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let all = ctx.mirror.accounts(Scope::AllResellers);
    let unassigned = all.iter().filter(|row| row.owner.is_none()).count();

    let breakdown = if resellers {
        ctx.resellers
            .list()
            .into_iter()
            .map(|entry| {
                let accounts = ctx.mirror.accounts(Scope::Reseller(entry.id)).len();
                let balance = ctx.ledger.balance(entry.id, Window::ALL).closing_balance;
                ResellerStats {
                    id: entry.id.as_u64(),
                    name: entry.name,
                    accounts,
                    balance,
                }
            })
            .collect()
    } else {
        Vec::new()
    };

    let stats = PanelStats {
        data_dir: ctx.data_dir().display().to_string(),
        accounts: all.len(),
        unassigned_accounts: unassigned,
        resellers: ctx.resellers.len(),
        ledger_events: ctx.ledger.event_count(),
        payments: ctx.ledger.payment_count(),
        orphan_notes: ctx.ledger.orphan_count(),
        pending_intents: ctx.pending_intents()?,
        breakdown,
    };

    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&stats)?),
        _ => print_text_output(&stats),
    }

    Ok(())
}

fn print_text_output(stats: &PanelStats) {
    println!("Panel Store Statistics");
    println!("================");
    println!();
    println!("Data dir:         {}", stats.data_dir);
    println!(
        "Accounts:         {} ({} unassigned)",
        stats.accounts, stats.unassigned_accounts
    );
    println!("Resellers:        {}", stats.resellers);
    println!("Ledger events:    {}", stats.ledger_events);
    println!("Payments:         {}", stats.payments);
    println!("Orphan notes:     {}", stats.orphan_notes);
    println!("Pending intents:  {}", stats.pending_intents);

    if !stats.breakdown.is_empty() {
        println!();
        println!("Per reseller:");
        for entry in &stats.breakdown {
            println!(
                "  [{}] {:24} {:>6} accounts  balance {:>12}",
                entry.id,
                entry.name,
                entry.accounts,
                format_amount(entry.balance)
            );
        }
    }
}
