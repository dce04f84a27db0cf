//! Payment command implementations.
//!
//! Payments are the credit side of the ledger: recorded once, cancelled
//! with a reason, never deleted. Mutations run under the paying reseller's
//! scope lock, same as corrections.

use crate::commands::{format_amount, format_timestamp, parse_date, window_from};
use crate::context::PanelContext;
use clap::Subcommand;
use midpanel_core::{now_millis, Currency, PaymentId, ResellerId, Scope};
use midpanel_ledger::{PaymentRecord, PaymentStatus};
use serde::Serialize;

/// Payment operations.
#[derive(Subcommand)]
pub enum PaymentCommand {
    /// List payments for a reseller
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

    /// Record an incoming payment
    Record {
        /// Paying reseller
        #[arg(short, long)]
        reseller: u64,

        /// Amount received, minor currency units (positive)
        #[arg(short, long)]
        amount: i64,

        /// Currency of the amount (must match the reseller's)
        #[arg(long)]
        currency: String,

        /// Business date (YYYY-MM-DD); defaults to now
        #[arg(short, long)]
        date: Option<String>,

        /// Payment channel (bank, cash, transfer service)
        #[arg(short, long, default_value = "bank")]
        method: String,

        /// External reference such as a bank transaction id
        #[arg(long, default_value = "")]
        reference: String,
    },

    /// Cancel a payment, keeping the row for audit
    Cancel {
        /// Payment to cancel
        #[arg(short, long)]
        payment: u64,

        /// Reason for the cancellation (never empty)
        #[arg(long)]
        reason: String,
    },
}

/// One payment row for output.
#[derive(Debug, Serialize)]
pub struct PaymentRow {
    /// Payment identifier.
    pub id: u64,
    /// Business date, UTC.
    pub date: String,
    /// Amount in minor units.
    pub amount: i64,
    /// Currency code.
    pub currency: String,
    /// Payment channel.
    pub method: String,
    /// External reference.
    pub reference: String,
    /// `active` or `cancelled`.
    pub status: String,
    /// Cancellation reason, when cancelled.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Runs a payment subcommand.
pub fn run(ctx: &PanelContext, command: PaymentCommand) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        PaymentCommand::List {
            reseller,
            from,
            to,
            format,
        } => list(ctx, reseller, from.as_deref(), to.as_deref(), &format),
        PaymentCommand::Record {
            reseller,
            amount,
            currency,
            date,
            method,
            reference,
        } => record(ctx, reseller, amount, &currency, date.as_deref(), method, reference),
        PaymentCommand::Cancel { payment, reason } => {
            cancel(ctx, PaymentId::new(payment), &reason)
        }
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
    let actor = ctx.actor();
    if !actor.capabilities.all_resellers && actor.reseller != Some(id) {
        return Err(format!("{} may not read {id}'s payments", actor.label).into());
    }

    let window = window_from(from, to)?;
    let payments = ctx.ledger.payments_for(id, window);
    let rows: Vec<PaymentRow> = payments.iter().map(payment_row).collect();

    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&rows)?),
        _ => print_text_output(&rows),
    }

    Ok(())
}

fn record(
    ctx: &PanelContext,
    reseller: u64,
    amount: i64,
    currency: &str,
    date: Option<&str>,
    method: String,
    reference: String,
) -> Result<(), Box<dyn std::error::Error>> {
    let id = ResellerId::new(reseller);
    let actor = check_write_scope(ctx, id)?;

    let entry = ctx
        .resellers
        .get(id)
        .ok_or_else(|| format!("unknown reseller {id}"))?;
    let currency = Currency::parse(currency)?;
    if currency != entry.currency {
        return Err(format!(
            "payment currency {currency} does not match {}'s currency {}",
            entry.name, entry.currency
        )
        .into());
    }

    let date = match date {
        Some(raw) => parse_date(raw)?,
        None => now_millis(),
    };

    let _guard = ctx.locks.lock(Scope::Reseller(id));
    let payment = ctx
        .ledger
        .record_payment(id, amount, currency.clone(), date, method, reference, actor)?;
    println!(
        "Payment {payment} recorded: {} {currency} from {}",
        format_amount(amount),
        entry.name
    );
    Ok(())
}

fn cancel(
    ctx: &PanelContext,
    payment: PaymentId,
    reason: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let row = ctx
        .ledger
        .payment(payment)
        .ok_or_else(|| format!("no payment {payment}"))?;
    let actor = check_write_scope(ctx, row.reseller)?;

    let _guard = ctx.locks.lock(Scope::Reseller(row.reseller));
    ctx.ledger.cancel_payment(payment, reason, actor)?;
    println!("Payment {payment} cancelled: {reason}");
    Ok(())
}

/// Returns the actor label to attribute the write to, or an error if the
/// operator may not touch this reseller's ledger.
fn check_write_scope(
    ctx: &PanelContext,
    reseller: ResellerId,
) -> Result<String, Box<dyn std::error::Error>> {
    let actor = ctx.actor();
    if !actor.capabilities.write_ledger {
        return Err(format!("{} may not write ledger entries", actor.label).into());
    }
    if !actor.capabilities.all_resellers && actor.reseller != Some(reseller) {
        return Err(format!("{} may not touch {reseller}'s payments", actor.label).into());
    }
    Ok(actor.label)
}

fn payment_row(payment: &PaymentRecord) -> PaymentRow {
    PaymentRow {
        id: payment.id.as_u64(),
        date: format_timestamp(payment.date),
        amount: payment.amount,
        currency: payment.currency.to_string(),
        method: payment.method.clone(),
        reference: payment.reference.clone(),
        status: match payment.status {
            PaymentStatus::Active => "active".to_owned(),
            PaymentStatus::Cancelled => "cancelled".to_owned(),
        },
        reason: payment
            .cancellation
            .as_ref()
            .map(|cancellation| cancellation.reason.clone()),
    }
}

fn print_text_output(rows: &[PaymentRow]) {
    println!("Payments ({} total)", rows.len());
    println!("================");
    println!();

    for row in rows {
        println!(
            "[{:06}] {} {:>12} {} {:12} {:9} {}",
            row.id,
            row.date,
            format_amount(row.amount),
            row.currency,
            row.method,
            row.status,
            row.reference
        );
        if let Some(reason) = &row.reason {
            println!("         reason: {reason}");
        }
    }
}
