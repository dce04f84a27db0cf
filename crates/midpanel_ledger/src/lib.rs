//! # midpanel ledger
//!
//! Append-only financial journal with a correction overlay, plus the
//! balance calculator built on it.
//!
//! Money facts are never edited in place. A sale or payment is appended
//! once; later changes arrive as further appends: a correction adjusts an
//! event's net effect, a void zeroes it, a cancellation neutralizes a
//! payment. Balances are derived at query time from the full history, so
//! correcting an old event retroactively changes every subsequent report
//! in a deterministic way.
//!
//! Sales are stored as negative amounts (a deduction against the reseller's
//! account); payments are stored positive. A positive closing balance means
//! the reseller owes the panel operator.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod balance;
mod error;
mod event;
mod record;
mod store;

pub use balance::{BalanceReport, Window};
pub use error::{LedgerError, LedgerResult};
pub use event::{
    Cancellation, Correction, EventCategory, EventStatus, LedgerEvent, OrphanNote, PaymentRecord,
    PaymentStatus, VoidMark,
};
pub use record::{LedgerRecord, LedgerRecordKind};
pub use store::LedgerStore;
