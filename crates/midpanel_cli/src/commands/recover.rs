//! Recover command implementation.
//!
//! A create interrupted between its secondary and primary writes leaves a
//! pending intent in the journal. The sweep issues the compensating
//! deletes those intents still owe; anything it cannot close stays pending
//! for the next run.

use crate::commands::format_timestamp;
use crate::context::PanelContext;
use midpanel_coordinator::RecoveryOutcome;
use serde::Serialize;

/// Outcome of one swept intent for output.
#[derive(Debug, Serialize)]
pub struct RecoveredRow {
    /// Intent identifier.
    pub id: String,
    /// Device the interrupted create targeted.
    pub device: String,
    /// Handle the interrupted create targeted.
    pub handle: String,
    /// When the intent was opened, UTC.
    pub opened_at: String,
    /// `swept`, or the reason the intent is still pending.
    pub outcome: String,
}

/// Runs the recover command.
pub fn run(ctx: &PanelContext, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    let actor = ctx.actor();
    if !actor.capabilities.write_accounts {
        return Err(format!("{} may not sweep write intents", actor.label).into());
    }

    let recovered = ctx.coordinator()?.recover()?;
    let rows: Vec<RecoveredRow> = recovered
        .iter()
        .map(|entry| RecoveredRow {
            id: entry.intent.id.to_string(),
            device: entry.intent.device.to_string(),
            handle: entry.intent.handle.clone(),
            opened_at: format_timestamp(entry.intent.opened_at),
            outcome: match &entry.outcome {
                RecoveryOutcome::Swept => "swept".to_owned(),
                RecoveryOutcome::StillPending { reason } => format!("still pending: {reason}"),
            },
        })
        .collect();

    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&rows)?),
        _ => print_text_output(&rows),
    }

    Ok(())
}

fn print_text_output(rows: &[RecoveredRow]) {
    if rows.is_empty() {
        println!("No dangling write intents");
        return;
    }

    let swept = rows.iter().filter(|row| row.outcome == "swept").count();
    println!("Swept {swept} of {} dangling intents", rows.len());
    println!();
    for row in rows {
        println!(
            "  {} {} ({}) opened {}: {}",
            row.id, row.device, row.handle, row.opened_at, row.outcome
        );
    }
}
