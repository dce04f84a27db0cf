//! Plans command implementation.

use crate::commands::format_amount;
use crate::context::PanelContext;
use serde::Serialize;

/// One tariff plan for output.
#[derive(Debug, Serialize)]
pub struct PlanRow {
    /// Tariff code, used as the panel's plan reference.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Price in minor currency units.
    pub price: i64,
    /// Subscription period in days.
    pub days: u32,
}

/// Runs the plans command.
pub fn run(ctx: &PanelContext, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    let plans = ctx.primary()?.list_plans()?;
    let rows: Vec<PlanRow> = plans
        .into_iter()
        .map(|plan| PlanRow {
            id: plan.id,
            name: plan.name,
            price: plan.price,
            days: plan.days,
        })
        .collect();

    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&rows)?),
        _ => {
            println!("Tariff plans ({} total)", rows.len());
            println!();
            for row in &rows {
                println!(
                    "  {:12} {:24} {:>10}  {} days",
                    row.id,
                    row.name,
                    format_amount(row.price),
                    row.days
                );
            }
        }
    }

    Ok(())
}
