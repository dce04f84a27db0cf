//! # midpanel sync
//!
//! Rebuilds the local account mirror from the authoritative upstream list.
//!
//! A reconciliation pass is fetch-then-swap: the full upstream list is
//! fetched first, staged into new mirror rows, and only then swapped in.
//! An upstream failure therefore aborts the pass with the mirror exactly
//! as it was. Reseller ownership survives rebuilds through the assignment
//! mapping, which the engine both consumes and re-persists on every pass.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod engine;
mod error;

pub use config::EngineConfig;
pub use engine::{ReconcileEngine, ReconcileReport};
pub use error::{ReconcileError, ReconcileResult};
