//! The ledger store: journal-backed state plus the operations on it.

use crate::balance::{BalanceReport, Window};
use crate::error::{LedgerError, LedgerResult};
use crate::event::{
    Cancellation, Correction, EventCategory, EventStatus, LedgerEvent, OrphanNote, PaymentRecord,
    PaymentStatus, VoidMark,
};
use crate::record::LedgerRecord;
use midpanel_core::{now_millis, Currency, DeviceId, EventId, PaymentId, PlanRef, ResellerId, Scope};
use midpanel_store::{Journal, PanelDir};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use tracing::{debug, warn};

#[derive(Debug)]
struct LedgerState {
    events: BTreeMap<EventId, LedgerEvent>,
    payments: BTreeMap<PaymentId, PaymentRecord>,
    orphans: Vec<OrphanNote>,
    next_event: u64,
    next_payment: u64,
}

impl LedgerState {
    fn new() -> Self {
        Self {
            events: BTreeMap::new(),
            payments: BTreeMap::new(),
            orphans: Vec::new(),
            next_event: 1,
            next_payment: 1,
        }
    }
}

/// Applies one journal record to in-memory state.
///
/// Used both for replay on open and for live appends, so a reopened store
/// always lands in the same state the writing process saw.
fn apply(state: &mut LedgerState, record: LedgerRecord) {
    match record {
        LedgerRecord::Event(event) => {
            state.next_event = state.next_event.max(event.id.as_u64() + 1);
            state.events.insert(event.id, event);
        }
        LedgerRecord::Correction { event, correction } => {
            if let Some(row) = state.events.get_mut(&event) {
                row.correction = Some(correction);
                if row.status != EventStatus::Voided {
                    row.status = EventStatus::Corrected;
                }
            } else {
                warn!(%event, "correction for unknown event, ignoring");
            }
        }
        LedgerRecord::Void { event, mark } => {
            if let Some(row) = state.events.get_mut(&event) {
                row.voided = Some(mark);
                row.status = EventStatus::Voided;
            } else {
                warn!(%event, "void for unknown event, ignoring");
            }
        }
        LedgerRecord::Payment(payment) => {
            state.next_payment = state.next_payment.max(payment.id.as_u64() + 1);
            state.payments.insert(payment.id, payment);
        }
        LedgerRecord::PaymentCancelled {
            payment,
            cancellation,
        } => {
            if let Some(row) = state.payments.get_mut(&payment) {
                row.cancellation = Some(cancellation);
                row.status = PaymentStatus::Cancelled;
            } else {
                warn!(%payment, "cancellation for unknown payment, ignoring");
            }
        }
        LedgerRecord::Orphan(note) => state.orphans.push(note),
    }
}

/// Append-only financial ledger with derived balances.
///
/// Every mutation is validated, appended to the journal, and only then
/// applied to in-memory state, so a failed append leaves the visible
/// ledger exactly as it was.
#[derive(Debug)]
pub struct LedgerStore {
    journal: Journal,
    state: RwLock<LedgerState>,
}

impl LedgerStore {
    /// Opens the ledger, replaying the journal in the panel directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the journal cannot be opened or holds a
    /// corrupted frame. A torn tail from a crashed append is discarded.
    pub fn open(dir: &PanelDir) -> LedgerResult<Self> {
        let journal = Journal::open_file(&dir.ledger_path(), true)?;

        let mut state = LedgerState::new();
        journal.for_each(|_, frame| {
            let record = LedgerRecord::decode_payload(frame.kind, &frame.payload)?;
            apply(&mut state, record);
            Ok(true)
        })?;

        debug!(
            events = state.events.len(),
            payments = state.payments.len(),
            orphans = state.orphans.len(),
            "ledger replayed"
        );

        Ok(Self {
            journal,
            state: RwLock::new(state),
        })
    }

    /// Records a sale against a reseller's balance.
    ///
    /// The amount is the signed deduction and must be zero or negative; the
    /// positive figure shows up in reports once negated.
    ///
    /// # Errors
    ///
    /// Returns a validation error for a positive amount, or a store error
    /// if the append fails.
    #[allow(clippy::too_many_arguments)]
    pub fn record_sale(
        &self,
        reseller: ResellerId,
        amount: i64,
        currency: Currency,
        description: impl Into<String>,
        plan: Option<PlanRef>,
        device: Option<DeviceId>,
        actor: impl Into<String>,
    ) -> LedgerResult<EventId> {
        if amount > 0 {
            return Err(LedgerError::validation(
                "sale amount must be zero or negative (sales are deductions)",
            ));
        }
        self.record_event(
            reseller,
            amount,
            currency,
            EventCategory::Sale,
            description.into(),
            plan,
            device,
            actor.into(),
        )
    }

    /// Records a manual balance adjustment. Either sign is allowed.
    ///
    /// # Errors
    ///
    /// Returns a store error if the append fails.
    pub fn record_adjustment(
        &self,
        reseller: ResellerId,
        amount: i64,
        currency: Currency,
        description: impl Into<String>,
        actor: impl Into<String>,
    ) -> LedgerResult<EventId> {
        self.record_event(
            reseller,
            amount,
            currency,
            EventCategory::Adjustment,
            description.into(),
            None,
            None,
            actor.into(),
        )
    }

    #[allow(clippy::too_many_arguments)]
    fn record_event(
        &self,
        reseller: ResellerId,
        amount: i64,
        currency: Currency,
        category: EventCategory,
        description: String,
        plan: Option<PlanRef>,
        device: Option<DeviceId>,
        actor: String,
    ) -> LedgerResult<EventId> {
        let mut state = self.state.write();
        let id = EventId::new(state.next_event);
        let record = LedgerRecord::Event(LedgerEvent {
            id,
            reseller,
            amount,
            currency,
            category,
            description,
            plan,
            device,
            at: now_millis(),
            actor,
            correction: None,
            voided: None,
            status: EventStatus::Active,
        });

        self.append_record(&record)?;
        apply(&mut state, record);
        Ok(id)
    }

    /// Attaches a correction overlay to an event.
    ///
    /// The event keeps its original amount; balance arithmetic sees
    /// `amount + correction` from now on. Correcting again replaces the
    /// overlay.
    ///
    /// # Errors
    ///
    /// Returns a validation error for an empty note (the event is left
    /// unchanged), a not-found error for an unknown event, or
    /// [`LedgerError::AlreadyVoided`] for a voided one.
    pub fn correct(
        &self,
        event: EventId,
        amount: i64,
        note: impl Into<String>,
        actor: impl Into<String>,
    ) -> LedgerResult<()> {
        let note = note.into();
        if note.trim().is_empty() {
            return Err(LedgerError::validation("correction note must not be empty"));
        }

        let mut state = self.state.write();
        {
            let row = state
                .events
                .get(&event)
                .ok_or_else(|| LedgerError::not_found(event.to_string()))?;
            if row.status == EventStatus::Voided {
                return Err(LedgerError::AlreadyVoided { id: event });
            }
        }

        let record = LedgerRecord::Correction {
            event,
            correction: Correction {
                amount,
                note,
                actor: actor.into(),
                at: now_millis(),
            },
        };
        self.append_record(&record)?;
        apply(&mut state, record);
        Ok(())
    }

    /// Voids an event. Its net contribution becomes exactly zero,
    /// regardless of any earlier correction.
    ///
    /// # Errors
    ///
    /// Returns a validation error for an empty note, a not-found error for
    /// an unknown event, or [`LedgerError::AlreadyVoided`] when voided
    /// twice.
    pub fn void(
        &self,
        event: EventId,
        note: impl Into<String>,
        actor: impl Into<String>,
    ) -> LedgerResult<()> {
        let note = note.into();
        if note.trim().is_empty() {
            return Err(LedgerError::validation("void note must not be empty"));
        }

        let mut state = self.state.write();
        {
            let row = state
                .events
                .get(&event)
                .ok_or_else(|| LedgerError::not_found(event.to_string()))?;
            if row.status == EventStatus::Voided {
                return Err(LedgerError::AlreadyVoided { id: event });
            }
        }

        let record = LedgerRecord::Void {
            event,
            mark: VoidMark {
                note,
                actor: actor.into(),
                at: now_millis(),
            },
        };
        self.append_record(&record)?;
        apply(&mut state, record);
        Ok(())
    }

    /// Records a payment received from a reseller.
    ///
    /// `date` is the business date of the payment, which is what windowed
    /// reports filter on.
    ///
    /// # Errors
    ///
    /// Returns a validation error for a non-positive amount, or a store
    /// error if the append fails.
    #[allow(clippy::too_many_arguments)]
    pub fn record_payment(
        &self,
        reseller: ResellerId,
        amount: i64,
        currency: Currency,
        date: u64,
        method: impl Into<String>,
        reference: impl Into<String>,
        actor: impl Into<String>,
    ) -> LedgerResult<PaymentId> {
        if amount <= 0 {
            return Err(LedgerError::validation("payment amount must be positive"));
        }

        let mut state = self.state.write();
        let id = PaymentId::new(state.next_payment);
        let record = LedgerRecord::Payment(PaymentRecord {
            id,
            reseller,
            amount,
            currency,
            date,
            method: method.into(),
            reference: reference.into(),
            recorded_by: actor.into(),
            recorded_at: now_millis(),
            cancellation: None,
            status: PaymentStatus::Active,
        });

        self.append_record(&record)?;
        apply(&mut state, record);
        Ok(id)
    }

    /// Cancels a payment. The row stays; its contribution becomes zero.
    ///
    /// # Errors
    ///
    /// Returns a validation error for an empty reason or an already
    /// cancelled payment, or a not-found error for an unknown one.
    pub fn cancel_payment(
        &self,
        payment: PaymentId,
        reason: impl Into<String>,
        actor: impl Into<String>,
    ) -> LedgerResult<()> {
        let reason = reason.into();
        if reason.trim().is_empty() {
            return Err(LedgerError::validation(
                "cancellation reason must not be empty",
            ));
        }

        let mut state = self.state.write();
        {
            let row = state
                .payments
                .get(&payment)
                .ok_or_else(|| LedgerError::not_found(payment.to_string()))?;
            if row.status == PaymentStatus::Cancelled {
                return Err(LedgerError::validation(format!(
                    "{payment} is already cancelled"
                )));
            }
        }

        let record = LedgerRecord::PaymentCancelled {
            payment,
            cancellation: Cancellation {
                reason,
                actor: actor.into(),
                at: now_millis(),
            },
        };
        self.append_record(&record)?;
        apply(&mut state, record);
        Ok(())
    }

    /// Appends an orphan audit entry.
    ///
    /// # Errors
    ///
    /// Returns a store error if the append fails.
    pub fn note_orphan(&self, note: OrphanNote) -> LedgerResult<()> {
        let mut state = self.state.write();
        let record = LedgerRecord::Orphan(note);
        self.append_record(&record)?;
        apply(&mut state, record);
        Ok(())
    }

    /// Looks up one event.
    #[must_use]
    pub fn event(&self, id: EventId) -> Option<LedgerEvent> {
        self.state.read().events.get(&id).cloned()
    }

    /// Looks up one payment.
    #[must_use]
    pub fn payment(&self, id: PaymentId) -> Option<PaymentRecord> {
        self.state.read().payments.get(&id).cloned()
    }

    /// Events for a reseller whose creation time falls in the window,
    /// in id order.
    #[must_use]
    pub fn events_for(&self, reseller: ResellerId, window: Window) -> Vec<LedgerEvent> {
        self.state
            .read()
            .events
            .values()
            .filter(|e| e.reseller == reseller && window.contains(e.at))
            .cloned()
            .collect()
    }

    /// Payments for a reseller dated inside the window, in id order.
    #[must_use]
    pub fn payments_for(&self, reseller: ResellerId, window: Window) -> Vec<PaymentRecord> {
        self.state
            .read()
            .payments
            .values()
            .filter(|p| p.reseller == reseller && window.contains(p.date))
            .cloned()
            .collect()
    }

    /// Orphan audit entries detected in the window.
    ///
    /// [`Scope::AllResellers`] returns every entry; a reseller scope
    /// returns only entries detected by passes over that reseller.
    #[must_use]
    pub fn orphans_for(&self, scope: Scope, window: Window) -> Vec<OrphanNote> {
        self.state
            .read()
            .orphans
            .iter()
            .filter(|n| window.contains(n.detected_at))
            .filter(|n| scope == Scope::AllResellers || n.scope == scope)
            .cloned()
            .collect()
    }

    /// Number of events in the ledger, voided ones included.
    #[must_use]
    pub fn event_count(&self) -> usize {
        self.state.read().events.len()
    }

    /// Number of payment rows, cancelled ones included.
    #[must_use]
    pub fn payment_count(&self) -> usize {
        self.state.read().payments.len()
    }

    /// Number of orphan audit entries.
    #[must_use]
    pub fn orphan_count(&self) -> usize {
        self.state.read().orphans.len()
    }

    /// Computes the balance report for a reseller over a window.
    ///
    /// One read guard is held for the whole computation, so the report is
    /// a consistent snapshot even while writers are queued. Nothing is
    /// cached: correcting a historical event changes every later report.
    #[must_use]
    pub fn balance(&self, reseller: ResellerId, window: Window) -> BalanceReport {
        let state = self.state.read();

        let mut opening: i64 = 0;
        let mut sales_net: i64 = 0;
        let mut total_payments: i64 = 0;

        for event in state.events.values().filter(|e| e.reseller == reseller) {
            if window.contains(event.at) {
                sales_net += event.net_effect();
            } else if window.precedes(event.at) {
                // Opening is the closing balance of everything earlier.
                opening += -event.net_effect();
            }
        }

        for payment in state.payments.values().filter(|p| p.reseller == reseller) {
            if window.contains(payment.date) {
                total_payments += payment.net_effect();
            } else if window.precedes(payment.date) {
                opening -= payment.net_effect();
            }
        }

        let total_sales = -sales_net;
        BalanceReport {
            reseller,
            window,
            opening_balance: opening,
            total_sales,
            total_payments,
            closing_balance: opening + total_sales - total_payments,
        }
    }

    fn append_record(&self, record: &LedgerRecord) -> LedgerResult<u64> {
        let payload = record.encode_payload()?;
        Ok(self.journal.append(record.kind().as_byte(), &payload)?)
    }
}
