//! Ledger command implementations.
//!
//! Corrections and voids annotate rows; nothing is ever deleted. Both run
//! under the owning reseller's scope lock so they cannot interleave with a
//! reconciliation pass over the same reseller.

use crate::commands::{format_amount, format_timestamp, window_from};
use crate::context::PanelContext;
use clap::Subcommand;
use midpanel_core::{EventId, ResellerId, Scope};
use midpanel_ledger::{EventCategory, EventStatus, LedgerEvent};
use serde::Serialize;

/// Financial event operations.
#[derive(Subcommand)]
pub enum LedgerCommand {
    /// List events for a reseller
    List {
        /// Reseller to list
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

    /// Adjust an event's net effect, keeping the original row
    Correct {
        /// Event to correct
        #[arg(short, long)]
        event: u64,

        /// Signed correction amount, minor currency units
        #[arg(short, long)]
        amount: i64,

        /// Reason for the correction (never empty)
        #[arg(short, long)]
        note: String,
    },

    /// Zero an event's net effect, keeping the row for audit
    Void {
        /// Event to void
        #[arg(short, long)]
        event: u64,

        /// Reason for the void (never empty)
        #[arg(short, long)]
        note: String,
    },
}

/// One ledger row for output.
#[derive(Debug, Serialize)]
pub struct EventRow {
    /// Event identifier.
    pub id: u64,
    /// Creation time, UTC.
    pub at: String,
    /// `sale` or `adjustment`.
    pub category: String,
    /// Original amount, minor units. Sales are negative.
    pub amount: i64,
    /// Amount counted after corrections and voids, minor units.
    pub net_effect: i64,
    /// `active`, `corrected`, or `voided`.
    pub status: String,
    /// Statement description.
    pub description: String,
    /// Correction or void note, when one applies.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// Runs a ledger subcommand.
pub fn run(ctx: &PanelContext, command: LedgerCommand) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        LedgerCommand::List {
            reseller,
            from,
            to,
            format,
        } => list(ctx, reseller, from.as_deref(), to.as_deref(), &format),
        LedgerCommand::Correct {
            event,
            amount,
            note,
        } => correct(ctx, EventId::new(event), amount, &note),
        LedgerCommand::Void { event, note } => void(ctx, EventId::new(event), &note),
    }
}

fn list(
    ctx: &PanelContext,
    reseller: u64,
    from: Option<&str>,
    to: Option<&str>,
    format: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let id = ResellerId::new(reseller);
    check_read_scope(ctx, id)?;

    let window = window_from(from, to)?;
    let events = ctx.ledger.events_for(id, window);
    let rows: Vec<EventRow> = events.iter().map(event_row).collect();

    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&rows)?),
        _ => print_text_output(&rows),
    }

    Ok(())
}

fn correct(
    ctx: &PanelContext,
    event: EventId,
    amount: i64,
    note: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let row = check_write_scope(ctx, event)?;

    let _guard = ctx.locks.lock(Scope::Reseller(row.reseller));
    ctx.ledger
        .correct(event, amount, note, ctx.actor().label.as_str())?;
    println!("Event {event} corrected by {}: {note}", format_amount(amount));
    Ok(())
}

fn void(ctx: &PanelContext, event: EventId, note: &str) -> Result<(), Box<dyn std::error::Error>> {
    let row = check_write_scope(ctx, event)?;

    let _guard = ctx.locks.lock(Scope::Reseller(row.reseller));
    ctx.ledger.void(event, note, ctx.actor().label.as_str())?;
    println!("Event {event} voided: {note}");
    Ok(())
}

fn check_read_scope(
    ctx: &PanelContext,
    reseller: ResellerId,
) -> Result<(), Box<dyn std::error::Error>> {
    let actor = ctx.actor();
    if !actor.capabilities.all_resellers && actor.reseller != Some(reseller) {
        return Err(format!("{} may not read {reseller}'s ledger", actor.label).into());
    }
    Ok(())
}

fn check_write_scope(
    ctx: &PanelContext,
    event: EventId,
) -> Result<LedgerEvent, Box<dyn std::error::Error>> {
    let actor = ctx.actor();
    if !actor.capabilities.write_ledger {
        return Err(format!("{} may not write ledger entries", actor.label).into());
    }
    let row = ctx
        .ledger
        .event(event)
        .ok_or_else(|| format!("no ledger event {event}"))?;
    if !actor.capabilities.all_resellers && actor.reseller != Some(row.reseller) {
        return Err(format!("{} may not touch {}'s events", actor.label, row.reseller).into());
    }
    Ok(row)
}

fn event_row(event: &LedgerEvent) -> EventRow {
    let note = match (&event.voided, &event.correction) {
        (Some(mark), _) => Some(mark.note.clone()),
        (None, Some(correction)) => Some(correction.note.clone()),
        (None, None) => None,
    };

    EventRow {
        id: event.id.as_u64(),
        at: format_timestamp(event.at),
        category: match event.category {
            EventCategory::Sale => "sale".to_owned(),
            EventCategory::Adjustment => "adjustment".to_owned(),
        },
        amount: event.amount,
        net_effect: event.net_effect(),
        status: match event.status {
            EventStatus::Active => "active".to_owned(),
            EventStatus::Corrected => "corrected".to_owned(),
            EventStatus::Voided => "voided".to_owned(),
        },
        description: event.description.clone(),
        note,
    }
}

fn print_text_output(rows: &[EventRow]) {
    println!("Ledger events ({} total)", rows.len());
    println!("================");
    println!();

    for row in rows {
        println!(
            "[{:06}] {} {:10} {:>12} net {:>12} {:9} {}",
            row.id,
            row.at,
            row.category,
            format_amount(row.amount),
            format_amount(row.net_effect),
            row.status,
            row.description
        );
        if let Some(note) = &row.note {
            println!("         note: {note}");
        }
    }
}
