//! Sync command implementation.

use crate::context::PanelContext;
use midpanel_core::ResellerId;
use serde::Serialize;

/// Reconciliation result for output.
#[derive(Debug, Serialize)]
pub struct SyncReport {
    /// Rows staged and swapped into the mirror.
    pub synced: usize,
    /// Upstream records dropped for missing identity fields.
    pub skipped: usize,
    /// Mirror devices no longer present upstream.
    pub orphans_detected: usize,
    /// Wall-clock duration of the pass in milliseconds.
    pub duration_ms: u128,
}

/// Runs the sync command.
pub fn run(
    ctx: &PanelContext,
    reseller: Option<u64>,
    format: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let engine = ctx.engine()?;
    let report = engine.reconcile(reseller.map(ResellerId::new), &ctx.actor())?;

    let output = SyncReport {
        synced: report.synced,
        skipped: report.skipped,
        orphans_detected: report.orphans_detected,
        duration_ms: report.duration.as_millis(),
    };

    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&output)?),
        _ => {
            println!("Mirror rebuilt: {} accounts", output.synced);
            println!("  skipped (unusable upstream rows): {}", output.skipped);
            println!("  orphans detected: {}", output.orphans_detected);
            println!("  took {} ms", output.duration_ms);
        }
    }

    Ok(())
}
