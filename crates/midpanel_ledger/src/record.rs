//! Journal record types and serialization.

use crate::event::{Cancellation, Correction, LedgerEvent, OrphanNote, PaymentRecord, VoidMark};
use midpanel_core::{EventId, PaymentId};
use midpanel_store::codec;
use midpanel_store::{StoreError, StoreResult};
use serde::{Deserialize, Serialize};

/// Type of ledger journal record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum LedgerRecordKind {
    /// A new financial event.
    Event = 1,
    /// A correction overlay for an existing event.
    Correction = 2,
    /// A void mark for an existing event.
    Void = 3,
    /// A new payment.
    Payment = 4,
    /// A cancellation for an existing payment.
    PaymentCancelled = 5,
    /// An orphan audit entry from reconciliation.
    Orphan = 6,
}

impl LedgerRecordKind {
    /// Converts a byte to a record kind.
    #[must_use]
    pub fn from_byte(b: u8) -> Option<Self> {
        match b {
            1 => Some(Self::Event),
            2 => Some(Self::Correction),
            3 => Some(Self::Void),
            4 => Some(Self::Payment),
            5 => Some(Self::PaymentCancelled),
            6 => Some(Self::Orphan),
            _ => None,
        }
    }

    /// Converts the record kind to a byte.
    #[must_use]
    pub const fn as_byte(self) -> u8 {
        self as u8
    }
}

#[derive(Serialize, Deserialize)]
struct CorrectionBody {
    event: EventId,
    correction: Correction,
}

#[derive(Serialize, Deserialize)]
struct VoidBody {
    event: EventId,
    mark: VoidMark,
}

#[derive(Serialize, Deserialize)]
struct CancellationBody {
    payment: PaymentId,
    cancellation: Cancellation,
}

/// One append in the ledger journal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerRecord {
    /// A new financial event.
    Event(LedgerEvent),
    /// A correction overlay attached to an earlier event.
    Correction {
        /// The event being corrected.
        event: EventId,
        /// The overlay.
        correction: Correction,
    },
    /// A void mark attached to an earlier event.
    Void {
        /// The event being voided.
        event: EventId,
        /// The mark.
        mark: VoidMark,
    },
    /// A new payment.
    Payment(PaymentRecord),
    /// A cancellation attached to an earlier payment.
    PaymentCancelled {
        /// The payment being cancelled.
        payment: PaymentId,
        /// The cancellation.
        cancellation: Cancellation,
    },
    /// An orphan audit entry.
    Orphan(OrphanNote),
}

impl LedgerRecord {
    /// Returns the record kind.
    #[must_use]
    pub fn kind(&self) -> LedgerRecordKind {
        match self {
            Self::Event(_) => LedgerRecordKind::Event,
            Self::Correction { .. } => LedgerRecordKind::Correction,
            Self::Void { .. } => LedgerRecordKind::Void,
            Self::Payment(_) => LedgerRecordKind::Payment,
            Self::PaymentCancelled { .. } => LedgerRecordKind::PaymentCancelled,
            Self::Orphan(_) => LedgerRecordKind::Orphan,
        }
    }

    /// Serializes the record payload (without the journal envelope).
    ///
    /// # Errors
    ///
    /// Returns an error if CBOR encoding fails.
    pub fn encode_payload(&self) -> StoreResult<Vec<u8>> {
        match self {
            Self::Event(event) => codec::to_cbor(event),
            Self::Correction { event, correction } => codec::to_cbor(&CorrectionBody {
                event: *event,
                correction: correction.clone(),
            }),
            Self::Void { event, mark } => codec::to_cbor(&VoidBody {
                event: *event,
                mark: mark.clone(),
            }),
            Self::Payment(payment) => codec::to_cbor(payment),
            Self::PaymentCancelled {
                payment,
                cancellation,
            } => codec::to_cbor(&CancellationBody {
                payment: *payment,
                cancellation: cancellation.clone(),
            }),
            Self::Orphan(note) => codec::to_cbor(note),
        }
    }

    /// Deserializes a record from its frame kind byte and payload.
    ///
    /// # Errors
    ///
    /// Returns an error if the kind byte is unknown or the payload does
    /// not decode as that kind.
    pub fn decode_payload(kind: u8, payload: &[u8]) -> StoreResult<Self> {
        let kind = LedgerRecordKind::from_byte(kind)
            .ok_or_else(|| StoreError::corrupted(format!("unknown ledger record kind {kind}")))?;

        match kind {
            LedgerRecordKind::Event => Ok(Self::Event(codec::from_cbor(payload)?)),
            LedgerRecordKind::Correction => {
                let body: CorrectionBody = codec::from_cbor(payload)?;
                Ok(Self::Correction {
                    event: body.event,
                    correction: body.correction,
                })
            }
            LedgerRecordKind::Void => {
                let body: VoidBody = codec::from_cbor(payload)?;
                Ok(Self::Void {
                    event: body.event,
                    mark: body.mark,
                })
            }
            LedgerRecordKind::Payment => Ok(Self::Payment(codec::from_cbor(payload)?)),
            LedgerRecordKind::PaymentCancelled => {
                let body: CancellationBody = codec::from_cbor(payload)?;
                Ok(Self::PaymentCancelled {
                    payment: body.payment,
                    cancellation: body.cancellation,
                })
            }
            LedgerRecordKind::Orphan => Ok(Self::Orphan(codec::from_cbor(payload)?)),
        }
    }
}
