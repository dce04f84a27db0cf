//! # midpanel coordinator
//!
//! Applies account mutations across the primary middleware endpoint and an
//! optional secondary replica, in an order that keeps the two from quietly
//! diverging:
//!
//! - creates go secondary first, behind a durable intent record, so a
//!   primary failure can be compensated (or swept later by [`recover`])
//! - updates and status flips are best-effort on the secondary and
//!   authoritative on the primary
//! - deletes resolve the device identifier from the primary before touching
//!   anything
//!
//! Successful writes that carry a [`Charge`] append a sale to the ledger;
//! the charge is validated before any endpoint is contacted. Notification
//! delivery is fire and forget and never changes an outcome.
//!
//! [`recover`]: WriteCoordinator::recover

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod charge;
mod config;
mod coordinator;
mod error;
mod intent;
mod notifier;
mod op;

pub use charge::Charge;
pub use config::CoordinatorConfig;
pub use coordinator::WriteCoordinator;
pub use error::{CoordinatorError, CoordinatorResult};
pub use intent::{IntentJournal, RecoveredIntent, RecoveryOutcome, WriteIntent};
pub use notifier::{Delivery, LogNotifier, Notifier};
pub use op::{ReplicaWarning, WriteOp, WriteOutcome};
