//! Account command implementations.
//!
//! Every mutation goes through the write coordinator, so dual-endpoint
//! replication, intent journaling, billing, and mirror upkeep behave the
//! same here as for any other caller. The only rule enforced at this
//! surface is the per-reseller account cap, which the directory documents
//! as informational.

use crate::commands::parse_date_end;
use crate::context::PanelContext;
use clap::Subcommand;
use midpanel_coordinator::{Charge, WriteOp, WriteOutcome};
use midpanel_core::{AccountPatch, Currency, DeviceId, NewAccount, PlanRef, ResellerId, Scope};

/// Subscriber account operations.
#[derive(Subcommand)]
pub enum AccountCommand {
    /// Create a subscriber on the configured endpoints
    Create {
        /// Device MAC address
        #[arg(short, long)]
        mac: String,

        /// Display username
        #[arg(short, long)]
        login: String,

        /// Subscriber full name
        #[arg(short, long, default_value = "")]
        name: String,

        /// Contact phone
        #[arg(long, default_value = "")]
        phone: String,

        /// Contact e-mail
        #[arg(long, default_value = "")]
        email: String,

        /// Tariff plan code
        #[arg(long)]
        plan: Option<String>,

        /// Owning reseller (admins only; others default to their own)
        #[arg(short, long)]
        owner: Option<u64>,

        /// Price to bill, minor currency units
        #[arg(long)]
        price: Option<i64>,

        /// Discount to subtract, minor currency units
        #[arg(long, default_value = "0")]
        discount: i64,

        /// Currency of the price (must match the reseller's)
        #[arg(long)]
        currency: Option<String>,

        /// Ledger description for the sale
        #[arg(long)]
        description: Option<String>,
    },

    /// Renew a subscription: new plan and/or expiry, with an optional charge
    Renew {
        /// Device MAC address
        #[arg(short, long)]
        mac: String,

        /// New tariff plan code
        #[arg(long)]
        plan: Option<String>,

        /// Last day of service (YYYY-MM-DD)
        #[arg(long)]
        expires: Option<String>,

        /// Price to bill, minor currency units
        #[arg(long)]
        price: Option<i64>,

        /// Discount to subtract, minor currency units
        #[arg(long, default_value = "0")]
        discount: i64,

        /// Currency of the price (must match the reseller's)
        #[arg(long)]
        currency: Option<String>,

        /// Ledger description for the sale
        #[arg(long)]
        description: Option<String>,
    },

    /// Enable or disable a subscriber
    SetStatus {
        /// Device MAC address
        #[arg(short, long)]
        mac: String,

        /// Desired state
        #[arg(short, long, value_parser = ["active", "suspended"])]
        state: String,
    },

    /// Delete a subscriber by display username
    Delete {
        /// Display username on the primary middleware
        #[arg(short, long)]
        login: String,
    },

    /// Push a status message to a subscriber's device
    Message {
        /// Device MAC address
        #[arg(short, long)]
        mac: String,

        /// Message text
        #[arg(short, long)]
        text: String,
    },
}

/// Runs an account subcommand.
pub fn run(ctx: &PanelContext, command: AccountCommand) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        AccountCommand::Create {
            mac,
            login,
            name,
            phone,
            email,
            plan,
            owner,
            price,
            discount,
            currency,
            description,
        } => {
            let device = DeviceId::parse(&mac)?;
            let owner = owner.map(ResellerId::new);
            let actor = ctx.actor();
            check_account_cap(ctx, owner.or(actor.reseller))?;

            let fallback = format!("subscription for {login}");
            let charge = build_charge(price, discount, currency.as_deref(), description, &fallback)?;
            let outcome = ctx.coordinator()?.apply(
                WriteOp::Create {
                    account: NewAccount {
                        device_id: device,
                        handle: login.clone(),
                        full_name: name,
                        phone,
                        email,
                        plan: plan.map(PlanRef::new),
                        owner,
                    },
                    charge,
                },
                &actor,
            )?;
            report_outcome("created", &login, &outcome);
        }

        AccountCommand::Renew {
            mac,
            plan,
            expires,
            price,
            discount,
            currency,
            description,
        } => {
            let device = DeviceId::parse(&mac)?;
            let expires_at = expires.as_deref().map(parse_date_end).transpose()?;
            let patch = AccountPatch {
                plan: plan.map(PlanRef::new),
                expires_at,
                ..AccountPatch::default()
            };

            let fallback = format!("renewal for {device}");
            let charge = build_charge(price, discount, currency.as_deref(), description, &fallback)?;
            let outcome = ctx.coordinator()?.apply(
                WriteOp::Update {
                    device,
                    patch,
                    charge,
                },
                &ctx.actor(),
            )?;
            report_outcome("renewed", &mac, &outcome);
        }

        AccountCommand::SetStatus { mac, state } => {
            let device = DeviceId::parse(&mac)?;
            let active = state == "active";
            let outcome = ctx
                .coordinator()?
                .apply(WriteOp::SetStatus { device, active }, &ctx.actor())?;
            let verb = if active { "activated" } else { "suspended" };
            report_outcome(verb, &mac, &outcome);
        }

        AccountCommand::Delete { login } => {
            let outcome = ctx.coordinator()?.apply(
                WriteOp::Delete {
                    handle: login.clone(),
                },
                &ctx.actor(),
            )?;
            report_outcome("deleted", &login, &outcome);
        }

        AccountCommand::Message { mac, text } => {
            let actor = ctx.actor();
            if !actor.capabilities.write_accounts {
                return Err(format!("{} may not message subscribers", actor.label).into());
            }
            let device = DeviceId::parse(&mac)?;
            ctx.primary()?.send_message(&device, &text)?;
            println!("Message sent to {device}");
        }
    }

    Ok(())
}

/// Refuses a create that would push a reseller past its account cap.
fn check_account_cap(
    ctx: &PanelContext,
    owner: Option<ResellerId>,
) -> Result<(), Box<dyn std::error::Error>> {
    let Some(owner) = owner else {
        return Ok(());
    };
    let Some(reseller) = ctx.resellers.get(owner) else {
        return Ok(());
    };
    let Some(max) = reseller.max_accounts else {
        return Ok(());
    };

    let held = ctx.mirror.accounts(Scope::Reseller(owner)).len();
    if held >= max as usize {
        return Err(format!(
            "{} already holds {held} of {max} allowed accounts",
            reseller.name
        )
        .into());
    }
    Ok(())
}

fn build_charge(
    price: Option<i64>,
    discount: i64,
    currency: Option<&str>,
    description: Option<String>,
    fallback: &str,
) -> Result<Option<Charge>, Box<dyn std::error::Error>> {
    let Some(price) = price else {
        return Ok(None);
    };
    let currency = currency.ok_or("--currency is required when --price is given")?;
    let description = description.unwrap_or_else(|| fallback.to_owned());
    Ok(Some(
        Charge::new(price, Currency::parse(currency)?, description).with_discount(discount),
    ))
}

fn report_outcome(verb: &str, subject: &str, outcome: &WriteOutcome) {
    println!("Account {subject} {verb}");
    if let Some(device) = &outcome.device {
        println!("  device: {device}");
    }
    if let Some(event) = outcome.ledger_event {
        println!("  billed: ledger event {event}");
    }
    for warning in &outcome.warnings {
        println!("  WARNING [{}]: {}", warning.endpoint, warning.message);
    }
}
