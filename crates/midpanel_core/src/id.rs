//! Identifier newtypes shared across the workspace.

use crate::error::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Hardware identifier of a subscriber device (set-top box MAC address).
///
/// Stored canonically as six uppercase hex octets separated by colons,
/// e.g. `AA:1B:2C:3D:4E:5F`. The device identifier is the stable key of a
/// mirror row; it survives mirror rebuilds and is never reassigned.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceId(String);

impl DeviceId {
    /// Parses a MAC address, accepting `:`/`-` separators or bare hex.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidDeviceId`] if the input does not contain
    /// exactly twelve hex digits.
    pub fn parse(raw: &str) -> CoreResult<Self> {
        let hex: String = raw
            .chars()
            .filter(|c| *c != ':' && *c != '-' && !c.is_whitespace())
            .collect();

        if hex.len() != 12 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(CoreError::invalid_device_id(raw));
        }

        let upper = hex.to_ascii_uppercase();
        let mut canonical = String::with_capacity(17);
        for (i, chunk) in upper.as_bytes().chunks(2).enumerate() {
            if i > 0 {
                canonical.push(':');
            }
            // chunks of 2 over a 12-byte ASCII string are valid UTF-8
            canonical.push(chunk[0] as char);
            canonical.push(chunk[1] as char);
        }

        Ok(Self(canonical))
    }

    /// Returns the canonical string form.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Unique identifier for a reseller (panel-side owner of accounts).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct ResellerId(pub u64);

impl ResellerId {
    /// Creates a new reseller ID.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw ID value.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ResellerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "reseller:{}", self.0)
    }
}

/// Upstream tariff plan reference, opaque to the panel.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlanRef(pub String);

impl PlanRef {
    /// Wraps a tariff code as received from the middleware.
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    /// Returns the tariff code.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PlanRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier of a ledger event (journal sequence, monotonically increasing).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct EventId(pub u64);

impl EventId {
    /// Creates a new event ID.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw ID value.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "event:{}", self.0)
    }
}

/// Identifier of a payment record.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct PaymentId(pub u64);

impl PaymentId {
    /// Creates a new payment ID.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw ID value.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for PaymentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "payment:{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn device_id_canonicalizes_separators() {
        let a = DeviceId::parse("aa:1b:2c:3d:4e:5f").unwrap();
        let b = DeviceId::parse("AA-1B-2C-3D-4E-5F").unwrap();
        let c = DeviceId::parse("aa1b2c3d4e5f").unwrap();

        assert_eq!(a, b);
        assert_eq!(b, c);
        assert_eq!(a.as_str(), "AA:1B:2C:3D:4E:5F");
    }

    #[test]
    fn device_id_rejects_garbage() {
        assert!(DeviceId::parse("").is_err());
        assert!(DeviceId::parse("not-a-mac").is_err());
        assert!(DeviceId::parse("aa:1b:2c:3d:4e").is_err());
        assert!(DeviceId::parse("aa:1b:2c:3d:4e:5f:00").is_err());
        assert!(DeviceId::parse("gg:1b:2c:3d:4e:5f").is_err());
    }

    #[test]
    fn device_id_serde_is_transparent() {
        let id = DeviceId::parse("00:1A:79:12:34:56").unwrap();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"00:1A:79:12:34:56\"");
    }

    #[test]
    fn reseller_id_display() {
        assert_eq!(format!("{}", ResellerId::new(7)), "reseller:7");
    }

    #[test]
    fn event_id_ordering() {
        assert!(EventId::new(1) < EventId::new(2));
    }

    mod props {
        use super::*;
        use proptest::prelude::*;

        fn render(octets: &[u8; 6], separator: &str, upper: bool) -> String {
            let parts: Vec<String> = octets
                .iter()
                .map(|b| {
                    if upper {
                        format!("{b:02X}")
                    } else {
                        format!("{b:02x}")
                    }
                })
                .collect();
            parts.join(separator)
        }

        proptest! {
            #[test]
            fn any_rendering_parses_to_one_canonical_form(
                octets in any::<[u8; 6]>(),
                upper in any::<bool>(),
                separator in prop::sample::select(vec!["", ":", "-"]),
            ) {
                let rendered = render(&octets, separator, upper);
                let parsed = DeviceId::parse(&rendered).unwrap();

                let canonical = render(&octets, ":", true);
                prop_assert_eq!(parsed.as_str(), canonical.as_str());

                let again = DeviceId::parse(parsed.as_str()).unwrap();
                prop_assert_eq!(again, parsed);
            }

            #[test]
            fn non_hex_input_is_rejected(raw in "[g-z]{1,20}") {
                prop_assert!(DeviceId::parse(&raw).is_err());
            }
        }
    }
}
