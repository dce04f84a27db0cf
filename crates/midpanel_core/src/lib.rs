//! # midpanel core
//!
//! Shared domain vocabulary for the midpanel workspace: identifiers,
//! subscriber account records, reseller access control, money, and the
//! normalization helpers every other crate builds on.
//!
//! The crates above this one follow a strict split:
//!
//! - `midpanel_store` persists mirrors, assignments, and journals
//! - `midpanel_ledger` owns the financial journal and balance math
//! - `midpanel_upstream` talks to the middleware replicas
//! - `midpanel_coordinator` applies writes across replicas
//! - `midpanel_sync` rebuilds the local mirror from upstream
//!
//! This crate has no I/O and no locking; it is safe to use from any of them.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod access;
mod account;
mod error;
mod id;
mod money;
mod phone;
mod reseller;
mod time;

pub use access::{Actor, Capabilities, Role, Scope};
pub use account::{Account, AccountPatch, NewAccount};
pub use error::{CoreError, CoreResult};
pub use id::{DeviceId, EventId, PaymentId, PlanRef, ResellerId};
pub use money::Currency;
pub use phone::normalize_phone;
pub use reseller::Reseller;
pub use time::now_millis;

/// Crate version, surfaced by the CLI.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
