//! Reporting window and balance arithmetic.

use midpanel_core::ResellerId;
use serde::{Deserialize, Serialize};

/// Half-open-ended time window over epoch milliseconds, inclusive at both
/// ends when bounds are present.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Window {
    /// First instant inside the window, if bounded below.
    pub start: Option<u64>,
    /// Last instant inside the window, if bounded above.
    pub end: Option<u64>,
}

impl Window {
    /// A window covering all of history.
    pub const ALL: Window = Window {
        start: None,
        end: None,
    };

    /// Creates a window from optional bounds.
    #[must_use]
    pub const fn new(start: Option<u64>, end: Option<u64>) -> Self {
        Self { start, end }
    }

    /// Creates a window starting at `start` with no upper bound.
    #[must_use]
    pub const fn since(start: u64) -> Self {
        Self {
            start: Some(start),
            end: None,
        }
    }

    /// Returns true if `at` falls inside the window.
    #[must_use]
    pub fn contains(&self, at: u64) -> bool {
        self.start.is_none_or(|s| at >= s) && self.end.is_none_or(|e| at <= e)
    }

    /// Returns true if `at` falls strictly before the window start.
    ///
    /// A window with no lower bound has no "before": opening balances over
    /// such windows are zero.
    #[must_use]
    pub fn precedes(&self, at: u64) -> bool {
        self.start.is_some_and(|s| at < s)
    }
}

/// Balance figures for one reseller over one window.
///
/// All four figures are derived at query time from the event and payment
/// history; nothing here is ever stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceReport {
    /// The reseller the report is for.
    pub reseller: ResellerId,
    /// The window the totals cover.
    pub window: Window,
    /// Balance carried into the window: the closing balance of everything
    /// strictly before it. Zero when the window has no lower bound.
    pub opening_balance: i64,
    /// Total sold in the window: the negated sum of event net effects, so
    /// a reported positive number means plans were sold.
    pub total_sales: i64,
    /// Total of active payments dated inside the window.
    pub total_payments: i64,
    /// `opening + total_sales - total_payments`. Positive means the
    /// reseller owes; negative means the reseller is in credit.
    pub closing_balance: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unbounded_window_contains_everything() {
        assert!(Window::ALL.contains(0));
        assert!(Window::ALL.contains(u64::MAX));
        assert!(!Window::ALL.precedes(0));
    }

    #[test]
    fn bounds_are_inclusive() {
        let w = Window::new(Some(100), Some(200));
        assert!(w.contains(100));
        assert!(w.contains(200));
        assert!(!w.contains(99));
        assert!(!w.contains(201));
    }

    #[test]
    fn precedes_needs_a_lower_bound() {
        let w = Window::since(100);
        assert!(w.precedes(99));
        assert!(!w.precedes(100));
        assert!(!Window::new(None, Some(50)).precedes(10));
    }
}
