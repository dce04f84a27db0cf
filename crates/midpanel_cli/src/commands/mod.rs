//! CLI command implementations.

pub mod account;
pub mod balance;
pub mod inspect;
pub mod ledger;
pub mod payment;
pub mod plans;
pub mod recover;
pub mod reseller;
pub mod sync;

use chrono::{DateTime, NaiveDate};
use midpanel_ledger::Window;

/// Parses a `YYYY-MM-DD` business date into epoch milliseconds at
/// midnight UTC.
pub(crate) fn parse_date(raw: &str) -> Result<u64, Box<dyn std::error::Error>> {
    let at = parse_naive(raw)?
        .and_hms_opt(0, 0, 0)
        .ok_or("date out of range")?
        .and_utc()
        .timestamp_millis();
    u64::try_from(at).map_err(|_| format!("date {raw} is before 1970").into())
}

/// Parses a `YYYY-MM-DD` date into the last millisecond of that day, for
/// inclusive upper bounds.
pub(crate) fn parse_date_end(raw: &str) -> Result<u64, Box<dyn std::error::Error>> {
    let at = parse_naive(raw)?
        .and_hms_milli_opt(23, 59, 59, 999)
        .ok_or("date out of range")?
        .and_utc()
        .timestamp_millis();
    u64::try_from(at).map_err(|_| format!("date {raw} is before 1970").into())
}

fn parse_naive(raw: &str) -> Result<NaiveDate, Box<dyn std::error::Error>> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|err| format!("bad date {raw:?} (expected YYYY-MM-DD): {err}").into())
}

/// Builds a reporting window from optional inclusive date bounds.
pub(crate) fn window_from(
    from: Option<&str>,
    to: Option<&str>,
) -> Result<Window, Box<dyn std::error::Error>> {
    let start = from.map(parse_date).transpose()?;
    let end = to.map(parse_date_end).transpose()?;
    if let (Some(start), Some(end)) = (start, end) {
        if end < start {
            return Err("window end precedes window start".into());
        }
    }
    Ok(Window::new(start, end))
}

/// Renders a minor-unit amount as a decimal string, e.g. `-123.45`.
pub(crate) fn format_amount(minor: i64) -> String {
    let sign = if minor < 0 { "-" } else { "" };
    let magnitude = minor.unsigned_abs();
    format!("{sign}{}.{:02}", magnitude / 100, magnitude % 100)
}

/// Renders an epoch-millisecond timestamp as UTC date and time.
pub(crate) fn format_timestamp(millis: u64) -> String {
    i64::try_from(millis)
        .ok()
        .and_then(DateTime::from_timestamp_millis)
        .map(|at| at.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| millis.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dates_parse_to_utc_day_bounds() {
        let start = parse_date("2026-01-15").unwrap();
        assert_eq!(start, 1_768_435_200_000);
        assert_eq!(start % 86_400_000, 0);

        let end = parse_date_end("2026-01-15").unwrap();
        assert_eq!(end - start, 86_399_999);
    }

    #[test]
    fn malformed_dates_are_rejected() {
        assert!(parse_date("15/01/2026").is_err());
        assert!(parse_date("2026-13-40").is_err());
        assert!(parse_date("").is_err());
    }

    #[test]
    fn window_rejects_inverted_bounds() {
        let window = window_from(Some("2026-01-01"), Some("2026-03-31")).unwrap();
        assert!(window.start.is_some());
        assert!(window.end.is_some());

        assert!(window_from(Some("2026-03-31"), Some("2026-01-01")).is_err());
        assert_eq!(window_from(None, None).unwrap(), Window::ALL);
    }

    #[test]
    fn amounts_render_with_sign_and_cents() {
        assert_eq!(format_amount(0), "0.00");
        assert_eq!(format_amount(12_345), "123.45");
        assert_eq!(format_amount(-5), "-0.05");
        assert_eq!(format_amount(-12_345), "-123.45");
    }

    #[test]
    fn timestamps_render_as_utc() {
        assert_eq!(format_timestamp(1_768_435_200_000), "2026-01-15 00:00:00");
    }
}
