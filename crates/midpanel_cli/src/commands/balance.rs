//! Balance command implementation.

use crate::commands::{format_amount, window_from};
use crate::context::PanelContext;
use midpanel_core::{ResellerId, Scope};
use serde::Serialize;

/// Windowed balance figures for output.
#[derive(Debug, Serialize)]
pub struct BalanceOutput {
    /// Reseller id.
    pub reseller: u64,
    /// Reseller display name.
    pub name: String,
    /// Currency all figures are in.
    pub currency: String,
    /// Balance carried in from before the window.
    pub opening_balance: i64,
    /// Plans sold inside the window; positive means plans were sold.
    pub total_sales: i64,
    /// Active payments dated inside the window.
    pub total_payments: i64,
    /// `opening + sales - payments`. Positive means the reseller owes.
    pub closing_balance: i64,
}

/// Runs the balance command.
pub fn run(
    ctx: &PanelContext,
    reseller: u64,
    from: Option<&str>,
    to: Option<&str>,
    format: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let id = ResellerId::new(reseller);
    let actor = ctx.actor();
    if !actor.capabilities.all_resellers && actor.reseller != Some(id) {
        return Err(format!("{} may not read {id}'s balance", actor.label).into());
    }

    let entry = ctx
        .resellers
        .get(id)
        .ok_or_else(|| format!("unknown reseller {id}"))?;
    let window = window_from(from, to)?;

    let report = {
        let _guard = ctx.locks.lock(Scope::Reseller(id));
        ctx.ledger.balance(id, window)
    };

    let output = BalanceOutput {
        reseller,
        name: entry.name,
        currency: entry.currency.to_string(),
        opening_balance: report.opening_balance,
        total_sales: report.total_sales,
        total_payments: report.total_payments,
        closing_balance: report.closing_balance,
    };

    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&output)?),
        _ => print_text_output(&output, from, to),
    }

    Ok(())
}

fn print_text_output(output: &BalanceOutput, from: Option<&str>, to: Option<&str>) {
    let standing = if output.closing_balance > 0 {
        "reseller owes"
    } else if output.closing_balance < 0 {
        "in credit"
    } else {
        "settled"
    };

    println!("Balance for {} (reseller {})", output.name, output.reseller);
    println!("================");
    println!();
    match (from, to) {
        (None, None) => println!("  window:   all history"),
        _ => println!(
            "  window:   {} .. {}",
            from.unwrap_or("start"),
            to.unwrap_or("now")
        ),
    }
    println!(
        "  opening:  {:>12} {}",
        format_amount(output.opening_balance),
        output.currency
    );
    println!(
        "  sales:    {:>12} {}",
        format_amount(output.total_sales),
        output.currency
    );
    println!(
        "  payments: {:>12} {}",
        format_amount(output.total_payments),
        output.currency
    );
    println!(
        "  closing:  {:>12} {} ({standing})",
        format_amount(output.closing_balance),
        output.currency
    );
}
