//! Outbound notification seam.
//!
//! The coordinator announces successful mutations through a [`Notifier`].
//! Delivery is strictly best effort: a failed notification is logged and
//! forgotten, and must never roll back or fail the write that triggered it.

use std::fmt;
use tracing::info;

/// What happened to one notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// The notifier accepted the message.
    Sent,
    /// The notifier could not deliver. The write stands regardless.
    Failed,
}

/// Delivers event notifications to operators or subscribers.
pub trait Notifier: Send + Sync {
    /// Delivers one message.
    ///
    /// `channel` names the event ("account_created", "account_deleted", ...),
    /// `recipient` is an address in whatever scheme the implementation
    /// understands, and `vars` carries template variables.
    fn notify(&self, channel: &str, recipient: &str, vars: &[(&str, String)]) -> Delivery;
}

/// Default notifier: writes the notification to the log and reports it sent.
///
/// Useful in development and as a stand-in until a real transport (mail,
/// telegram, webhook) is wired in.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, channel: &str, recipient: &str, vars: &[(&str, String)]) -> Delivery {
        info!(
            target: "midpanel::notify",
            channel,
            recipient,
            vars = ?vars,
            "notification"
        );
        Delivery::Sent
    }
}

impl fmt::Display for Delivery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Delivery::Sent => f.write_str("sent"),
            Delivery::Failed => f.write_str("failed"),
        }
    }
}
