//! # midpanel upstream
//!
//! Client for the middleware servers that own the subscriber records.
//!
//! The middleware speaks a small fixed vocabulary: JSON envelopes with a
//! `status` field on every response, URL-encoded form bodies on writes,
//! HTTP Basic authentication throughout. [`UpstreamClient`] is the trait
//! seam the reconciliation engine and the write coordinator program
//! against; [`HttpUpstream`] is the real implementation and
//! [`MockUpstream`] a scriptable in-memory stand-in for tests.
//!
//! Reads carry a bounded retry for transient failures. Writes are never
//! retried here: the middleware has no idempotency keys, so a blind retry
//! could double-apply.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod api;
mod client;
mod config;
mod error;
mod http;
mod mock;

pub use api::{ApiResponse, Plan, UpstreamAccount};
pub use client::UpstreamClient;
pub use config::{EndpointConfig, RetryConfig};
pub use error::{UpstreamError, UpstreamResult};
pub use http::HttpUpstream;
pub use mock::{MockCall, MockUpstream};
