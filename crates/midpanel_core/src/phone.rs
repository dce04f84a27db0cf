//! Contact phone normalization.
//!
//! Upstream middleware stores phone numbers exactly as operators typed them.
//! The mirror keeps one canonical international form so that search and
//! notification routing behave the same regardless of who entered the
//! number. Normalization is best-effort: input that does not look like a
//! phone number at all is kept verbatim rather than rejected, because the
//! mirror must never drop a subscriber over a cosmetic field.

/// Normalizes a contact phone number to international form.
///
/// Rules, applied in order:
///
/// 1. Visual separators (spaces, dashes, dots, parentheses) are removed.
/// 2. A `00` international prefix becomes `+`.
/// 3. A single leading `0` (national form) is replaced with the default
///    country code, when one is configured.
/// 4. Numbers already starting with `+` are kept.
/// 5. Anything that still contains non-digits is returned unchanged from
///    the original input.
///
/// `default_country` is the dialing code without a plus, e.g. `"971"`.
#[must_use]
pub fn normalize_phone(raw: &str, default_country: Option<&str>) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return String::new();
    }

    let (plus, body) = match trimmed.strip_prefix('+') {
        Some(rest) => (true, rest),
        None => (false, trimmed),
    };

    let digits: String = body
        .chars()
        .filter(|c| !matches!(c, ' ' | '-' | '.' | '(' | ')'))
        .collect();

    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return trimmed.to_string();
    }

    if plus {
        return format!("+{digits}");
    }

    if let Some(rest) = digits.strip_prefix("00") {
        if !rest.is_empty() {
            return format!("+{rest}");
        }
        return trimmed.to_string();
    }

    if let Some(rest) = digits.strip_prefix('0') {
        if let Some(cc) = default_country {
            if !rest.is_empty() {
                return format!("+{cc}{rest}");
            }
        }
        return digits;
    }

    digits
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_separators() {
        assert_eq!(
            normalize_phone("+971 (50) 123-45.67", None),
            "+971501234567"
        );
    }

    #[test]
    fn double_zero_becomes_plus() {
        assert_eq!(normalize_phone("0097150123456", None), "+97150123456");
    }

    #[test]
    fn national_prefix_uses_default_country() {
        assert_eq!(
            normalize_phone("0501234567", Some("971")),
            "+971501234567"
        );
    }

    #[test]
    fn national_prefix_without_default_is_kept_digits_only() {
        assert_eq!(normalize_phone("050 123 4567", None), "0501234567");
    }

    #[test]
    fn unparseable_input_is_returned_verbatim() {
        assert_eq!(normalize_phone("ask for Mr. Hayes", None), "ask for Mr. Hayes");
        assert_eq!(normalize_phone("ext. 12b", Some("971")), "ext. 12b");
    }

    #[test]
    fn empty_input_stays_empty() {
        assert_eq!(normalize_phone("   ", Some("971")), "");
    }

    #[test]
    fn plain_international_number_is_untouched() {
        assert_eq!(normalize_phone("97150123456", Some("971")), "97150123456");
    }

    mod props {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn normalization_is_idempotent(
                raw in ".{0,24}",
                cc in prop::option::of("[0-9]{1,3}"),
            ) {
                let once = normalize_phone(&raw, cc.as_deref());
                let twice = normalize_phone(&once, cc.as_deref());
                prop_assert_eq!(twice, once);
            }

            #[test]
            fn digit_input_yields_digits_with_optional_plus(
                digits in "[0-9]{4,14}",
                cc in prop::option::of("[1-9][0-9]{0,2}"),
            ) {
                let spaced: String = digits.chars().flat_map(|c| [c, ' ']).collect();
                let normalized = normalize_phone(&spaced, cc.as_deref());
                let body = normalized.strip_prefix('+').unwrap_or(&normalized);
                prop_assert!(!body.is_empty());
                prop_assert!(body.chars().all(|c| c.is_ascii_digit()));
            }
        }
    }
}
