//! Ledger row types: events, payments, orphan audit entries.

use midpanel_core::{Currency, DeviceId, EventId, PaymentId, PlanRef, ResellerId, Scope};
use serde::{Deserialize, Serialize};

/// What kind of financial fact an event records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventCategory {
    /// A plan sale or renewal charged to the reseller.
    Sale,
    /// A manual balance adjustment entered by an operator.
    Adjustment,
}

/// Lifecycle of a ledger event. Rows never leave the journal; status is
/// the only thing that moves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventStatus {
    /// Counts at face value.
    Active,
    /// Counts as `amount + correction.amount`.
    Corrected,
    /// Counts as zero.
    Voided,
}

/// Mutable annotation adjusting an event's net effect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Correction {
    /// Signed delta applied on top of the original amount, minor units.
    pub amount: i64,
    /// Why the correction was made. Never empty.
    pub note: String,
    /// Who made it.
    pub actor: String,
    /// When it was made, epoch milliseconds.
    pub at: u64,
}

/// Record of a void, kept for audit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoidMark {
    /// Why the event was voided.
    pub note: String,
    /// Who voided it.
    pub actor: String,
    /// When, epoch milliseconds.
    pub at: u64,
}

/// One append-only financial event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEvent {
    /// Journal sequence number.
    pub id: EventId,
    /// The reseller whose balance this affects.
    pub reseller: ResellerId,
    /// Signed amount in minor units. Sales are negative.
    pub amount: i64,
    /// Currency of the amount.
    pub currency: Currency,
    /// Sale or manual adjustment.
    pub category: EventCategory,
    /// Free-text description shown in statements.
    pub description: String,
    /// Plan the sale was for, if any.
    pub plan: Option<PlanRef>,
    /// Device the sale was for, if any.
    pub device: Option<DeviceId>,
    /// Creation time, epoch milliseconds.
    pub at: u64,
    /// Who recorded the event.
    pub actor: String,
    /// Correction overlay, if the event was corrected.
    pub correction: Option<Correction>,
    /// Void mark, if the event was voided.
    pub voided: Option<VoidMark>,
    /// Current status.
    pub status: EventStatus,
}

impl LedgerEvent {
    /// The amount this event contributes to balance arithmetic.
    ///
    /// Voided events contribute exactly zero regardless of any earlier
    /// correction; corrected events contribute the original amount plus
    /// the correction delta.
    #[must_use]
    pub fn net_effect(&self) -> i64 {
        match self.status {
            EventStatus::Voided => 0,
            EventStatus::Active | EventStatus::Corrected => match &self.correction {
                Some(correction) => self.amount + correction.amount,
                None => self.amount,
            },
        }
    }
}

/// Lifecycle of a payment record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentStatus {
    /// Counts toward the reseller's balance.
    Active,
    /// Neutralized; counts as zero.
    Cancelled,
}

/// Record of a payment cancellation, kept for audit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cancellation {
    /// Why the payment was cancelled. Never empty.
    pub reason: String,
    /// Who cancelled it.
    pub actor: String,
    /// When, epoch milliseconds.
    pub at: u64,
}

/// One payment received from a reseller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentRecord {
    /// Journal sequence number.
    pub id: PaymentId,
    /// The paying reseller.
    pub reseller: ResellerId,
    /// Positive amount in minor units.
    pub amount: i64,
    /// Currency of the amount.
    pub currency: Currency,
    /// Business date of the payment, epoch milliseconds.
    pub date: u64,
    /// Payment channel (bank, cash, transfer service).
    pub method: String,
    /// External reference such as a bank transaction id.
    pub reference: String,
    /// Who entered the payment.
    pub recorded_by: String,
    /// When it was entered, epoch milliseconds.
    pub recorded_at: u64,
    /// Cancellation record, if the payment was cancelled.
    pub cancellation: Option<Cancellation>,
    /// Current status.
    pub status: PaymentStatus,
}

impl PaymentRecord {
    /// The amount this payment contributes to balance arithmetic.
    #[must_use]
    pub fn net_effect(&self) -> i64 {
        match self.status {
            PaymentStatus::Active => self.amount,
            PaymentStatus::Cancelled => 0,
        }
    }
}

/// Audit entry for a device that disappeared from the upstream list.
///
/// Informational only: the mirror row is gone but every ledger event that
/// referenced the device stays untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrphanNote {
    /// When the reconciliation pass noticed the disappearance.
    pub detected_at: u64,
    /// The device that vanished.
    pub device_id: DeviceId,
    /// Its last known handle, if the mirror still had one.
    pub handle: String,
    /// The scope of the pass that detected it.
    pub scope: Scope,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(amount: i64) -> LedgerEvent {
        LedgerEvent {
            id: EventId::new(1),
            reseller: ResellerId::new(1),
            amount,
            currency: Currency::parse("EUR").unwrap(),
            category: EventCategory::Sale,
            description: "renewal".to_owned(),
            plan: None,
            device: None,
            at: 1_000,
            actor: "admin".to_owned(),
            correction: None,
            voided: None,
            status: EventStatus::Active,
        }
    }

    #[test]
    fn net_effect_face_value() {
        assert_eq!(event(-100).net_effect(), -100);
    }

    #[test]
    fn net_effect_with_correction() {
        let mut e = event(-100);
        e.correction = Some(Correction {
            amount: 20,
            note: "price fixed".to_owned(),
            actor: "admin".to_owned(),
            at: 2_000,
        });
        e.status = EventStatus::Corrected;
        assert_eq!(e.net_effect(), -80);
    }

    #[test]
    fn net_effect_voided_ignores_correction() {
        let mut e = event(-100);
        e.correction = Some(Correction {
            amount: 20,
            note: "price fixed".to_owned(),
            actor: "admin".to_owned(),
            at: 2_000,
        });
        e.voided = Some(VoidMark {
            note: "duplicate".to_owned(),
            actor: "admin".to_owned(),
            at: 3_000,
        });
        e.status = EventStatus::Voided;
        assert_eq!(e.net_effect(), 0);
    }

    #[test]
    fn cancelled_payment_is_neutral() {
        let mut p = PaymentRecord {
            id: PaymentId::new(1),
            reseller: ResellerId::new(1),
            amount: 500,
            currency: Currency::parse("EUR").unwrap(),
            date: 1_000,
            method: "bank".to_owned(),
            reference: "tx-1".to_owned(),
            recorded_by: "admin".to_owned(),
            recorded_at: 1_000,
            cancellation: None,
            status: PaymentStatus::Active,
        };
        assert_eq!(p.net_effect(), 500);

        p.cancellation = Some(Cancellation {
            reason: "bounced".to_owned(),
            actor: "admin".to_owned(),
            at: 2_000,
        });
        p.status = PaymentStatus::Cancelled;
        assert_eq!(p.net_effect(), 0);
    }
}
