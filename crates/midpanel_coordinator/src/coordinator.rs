//! The write coordinator.

use crate::charge::Charge;
use crate::config::CoordinatorConfig;
use crate::error::{CoordinatorError, CoordinatorResult};
use crate::intent::{IntentJournal, RecoveredIntent, RecoveryOutcome, WriteIntent};
use crate::notifier::{Delivery, LogNotifier, Notifier};
use crate::op::{ReplicaWarning, WriteOp, WriteOutcome};
use midpanel_core::{
    normalize_phone, now_millis, Account, AccountPatch, Actor, DeviceId, EventId, NewAccount,
    PlanRef, ResellerId,
};
use midpanel_ledger::{LedgerStore, Window};
use midpanel_store::{MirrorStore, ResellerDirectory};
use midpanel_upstream::{UpstreamClient, UpstreamError};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Applies account writes across the primary endpoint and the optional
/// secondary, bills attached charges, and keeps the local mirror current.
///
/// See the crate docs for the ordering rules each operation follows.
pub struct WriteCoordinator {
    primary: Arc<dyn UpstreamClient>,
    secondary: Option<Arc<dyn UpstreamClient>>,
    config: CoordinatorConfig,
    intents: IntentJournal,
    ledger: Arc<LedgerStore>,
    mirror: Arc<MirrorStore>,
    resellers: Arc<ResellerDirectory>,
    notifier: Box<dyn Notifier>,
}

impl WriteCoordinator {
    /// Builds a coordinator over a single primary endpoint.
    pub fn new(
        primary: Arc<dyn UpstreamClient>,
        mirror: Arc<MirrorStore>,
        resellers: Arc<ResellerDirectory>,
        ledger: Arc<LedgerStore>,
        intents: IntentJournal,
        config: CoordinatorConfig,
    ) -> Self {
        Self {
            primary,
            secondary: None,
            config,
            intents,
            ledger,
            mirror,
            resellers,
            notifier: Box::new(LogNotifier),
        }
    }

    /// Attaches a secondary endpoint. It is only written to while
    /// `dual_endpoint_enabled` is set.
    #[must_use]
    pub fn with_secondary(mut self, secondary: Arc<dyn UpstreamClient>) -> Self {
        self.secondary = Some(secondary);
        self
    }

    /// Replaces the default log notifier.
    #[must_use]
    pub fn with_notifier(mut self, notifier: Box<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    /// Applies one write on behalf of an actor.
    ///
    /// # Errors
    ///
    /// Returns [`CoordinatorError::Forbidden`] when the actor lacks the
    /// write capability or targets another reseller's account, a validation
    /// error for a bad charge or empty update, and the endpoint error
    /// taxonomy for upstream failures. Best-effort secondary failures do
    /// not error; they come back as warnings in the outcome.
    pub fn apply(&self, op: WriteOp, actor: &Actor) -> CoordinatorResult<WriteOutcome> {
        if !actor.capabilities.write_accounts {
            return Err(CoordinatorError::forbidden(format!(
                "{} may not write accounts",
                actor.label
            )));
        }
        debug!(op = op.kind(), actor = %actor.label, "applying write");

        match op {
            WriteOp::Create { account, charge } => self.create(account, charge, actor),
            WriteOp::Update {
                device,
                patch,
                charge,
            } => self.update(device, patch, charge, actor),
            WriteOp::SetStatus { device, active } => self.set_status(device, active, actor),
            WriteOp::Delete { handle } => self.delete(&handle, actor),
        }
    }

    /// Sweeps dangling write intents left by crashes or failed
    /// compensation, issuing the compensating delete each one still owes.
    ///
    /// Dangling intents predate any configuration change, so the sweep
    /// uses the configured secondary even while dual writes are disabled.
    ///
    /// # Errors
    ///
    /// Returns an error only when the intent journal itself cannot be
    /// written; an endpoint failure leaves the intent pending for the next
    /// sweep instead.
    pub fn recover(&self) -> CoordinatorResult<Vec<RecoveredIntent>> {
        let pending = self.intents.pending();
        if pending.is_empty() {
            return Ok(Vec::new());
        }
        info!(count = pending.len(), "sweeping dangling write intents");

        let mut report = Vec::with_capacity(pending.len());
        for intent in pending {
            let outcome = match self.secondary.as_deref() {
                None => {
                    warn!(
                        device = %intent.device,
                        "dangling intent but no secondary endpoint configured"
                    );
                    RecoveryOutcome::StillPending {
                        reason: "no secondary endpoint configured".to_owned(),
                    }
                }
                Some(replica) => match replica.delete_account(&intent.device) {
                    Ok(()) => {
                        self.intents.abandon(intent.id)?;
                        info!(device = %intent.device, "compensating delete applied");
                        RecoveryOutcome::Swept
                    }
                    // A rejection means the account is not there, so there
                    // is nothing left to compensate.
                    Err(UpstreamError::Rejected { .. }) => {
                        self.intents.abandon(intent.id)?;
                        RecoveryOutcome::Swept
                    }
                    Err(err) => {
                        warn!(
                            device = %intent.device,
                            error = %err,
                            "compensating delete failed; intent stays pending"
                        );
                        RecoveryOutcome::StillPending {
                            reason: err.to_string(),
                        }
                    }
                },
            };
            report.push(RecoveredIntent { intent, outcome });
        }
        Ok(report)
    }

    /// Intents opened but never closed, for operator inspection.
    pub fn pending_intents(&self) -> Vec<WriteIntent> {
        self.intents.pending()
    }

    fn create(
        &self,
        mut account: NewAccount,
        charge: Option<Charge>,
        actor: &Actor,
    ) -> CoordinatorResult<WriteOutcome> {
        account.owner = self.resolve_owner(account.owner, actor)?;
        let billed = match &charge {
            Some(charge) => Some(self.prepare_charge(charge, account.owner)?),
            None => None,
        };

        let mut intent_id = None;
        if let Some(replica) = self.replica() {
            let id = self.intents.begin(&account.device_id, &account.handle)?;
            intent_id = Some(id);
            if let Err(err) = replica.create_account(&account) {
                // Nothing was written anywhere; the intent has no work left.
                self.intents.abandon(id)?;
                return Err(CoordinatorError::secondary_rejected(replica.name(), err));
            }
            debug!(endpoint = replica.name(), device = %account.device_id, "secondary create ok");
        }

        if let Err(primary_err) = self.primary.create_account(&account) {
            if let Some(replica) = self.replica() {
                match replica.delete_account(&account.device_id) {
                    Ok(()) => {
                        if let Some(id) = intent_id {
                            self.intents.abandon(id)?;
                        }
                        warn!(
                            device = %account.device_id,
                            error = %primary_err,
                            "primary create failed; secondary compensated"
                        );
                        return Err(CoordinatorError::upstream(self.primary.name(), primary_err));
                    }
                    Err(comp_err) => {
                        // The intent stays pending so recover() can retry
                        // the delete later.
                        error!(
                            target: "midpanel::consistency",
                            device = %account.device_id,
                            primary_error = %primary_err,
                            compensation_error = %comp_err,
                            "create diverged across replicas"
                        );
                        return Err(CoordinatorError::ConsistencyViolation {
                            primary: primary_err,
                            compensation: comp_err,
                        });
                    }
                }
            }
            return Err(CoordinatorError::upstream(self.primary.name(), primary_err));
        }

        if let Some(id) = intent_id {
            self.intents.complete(id)?;
        }

        let mut outcome = WriteOutcome::clean(account.device_id.clone());
        if let (Some(charge), Some(owner)) = (&charge, billed) {
            outcome.ledger_event =
                Some(self.bill(charge, owner, account.plan.clone(), &account.device_id, actor)?);
        }

        let row = self.mirror_row(&account);
        let recipient = Self::recipient_for(&row);
        if let Err(err) = self.mirror.upsert(row) {
            warn!(
                device = %account.device_id,
                error = %err,
                "mirror update failed; next reconciliation repairs it"
            );
        }

        info!(
            device = %account.device_id,
            handle = %account.handle,
            actor = %actor.label,
            "account created"
        );
        self.notify(
            "account_created",
            &recipient,
            &[
                ("handle", account.handle.clone()),
                ("device", account.device_id.to_string()),
            ],
        );
        Ok(outcome)
    }

    fn update(
        &self,
        device: DeviceId,
        patch: AccountPatch,
        charge: Option<Charge>,
        actor: &Actor,
    ) -> CoordinatorResult<WriteOutcome> {
        if patch.is_empty() && charge.is_none() {
            return Err(CoordinatorError::validation(
                "update carries no changes and no charge",
            ));
        }
        let owner = self.owner_for_device(&device, actor)?;
        let billed = match &charge {
            Some(charge) => Some(self.prepare_charge(charge, owner)?),
            None => None,
        };

        let mut outcome = WriteOutcome::clean(device.clone());
        if let Some(replica) = self.replica() {
            if let Err(err) = replica.update_account(&device, &patch) {
                warn!(
                    endpoint = replica.name(),
                    device = %device,
                    error = %err,
                    "secondary update failed; continuing with primary"
                );
                outcome.warnings.push(ReplicaWarning {
                    endpoint: replica.name().to_owned(),
                    message: err.to_string(),
                });
            }
        }

        self.primary
            .update_account(&device, &patch)
            .map_err(|err| CoordinatorError::upstream(self.primary.name(), err))?;

        if let (Some(charge), Some(owner)) = (&charge, billed) {
            let plan = patch
                .plan
                .clone()
                .or_else(|| self.mirror.get(&device).and_then(|row| row.plan));
            outcome.ledger_event = Some(self.bill(charge, owner, plan, &device, actor)?);
        }

        let mut recipient = device.to_string();
        if let Some(mut row) = self.mirror.get(&device) {
            patch.apply_to(&mut row);
            row.phone = normalize_phone(&row.phone, self.config.default_country_code.as_deref());
            recipient = Self::recipient_for(&row);
            if let Err(err) = self.mirror.upsert(row) {
                warn!(
                    device = %device,
                    error = %err,
                    "mirror update failed; next reconciliation repairs it"
                );
            }
        }

        info!(device = %device, actor = %actor.label, "account updated");
        self.notify(
            "account_updated",
            &recipient,
            &[("device", device.to_string())],
        );
        Ok(outcome)
    }

    fn set_status(
        &self,
        device: DeviceId,
        active: bool,
        actor: &Actor,
    ) -> CoordinatorResult<WriteOutcome> {
        self.owner_for_device(&device, actor)?;

        let mut outcome = WriteOutcome::clean(device.clone());
        if let Some(replica) = self.replica() {
            if let Err(err) = replica.set_status(&device, active) {
                warn!(
                    endpoint = replica.name(),
                    device = %device,
                    error = %err,
                    "secondary status change failed; continuing with primary"
                );
                outcome.warnings.push(ReplicaWarning {
                    endpoint: replica.name().to_owned(),
                    message: err.to_string(),
                });
            }
        }

        self.primary
            .set_status(&device, active)
            .map_err(|err| CoordinatorError::upstream(self.primary.name(), err))?;

        let mut recipient = device.to_string();
        if let Some(mut row) = self.mirror.get(&device) {
            row.active = active;
            recipient = Self::recipient_for(&row);
            if let Err(err) = self.mirror.upsert(row) {
                warn!(
                    device = %device,
                    error = %err,
                    "mirror update failed; next reconciliation repairs it"
                );
            }
        }

        info!(device = %device, active, actor = %actor.label, "account status changed");
        self.notify(
            "account_status",
            &recipient,
            &[
                ("device", device.to_string()),
                ("active", active.to_string()),
            ],
        );
        Ok(outcome)
    }

    fn delete(&self, handle: &str, actor: &Actor) -> CoordinatorResult<WriteOutcome> {
        if !actor.capabilities.all_resellers {
            let own = actor
                .reseller
                .ok_or_else(|| CoordinatorError::forbidden("operator has no reseller scope"))?;
            let row = self.mirror.find_by_handle(handle).ok_or_else(|| {
                CoordinatorError::forbidden(format!("{handle} is not mirrored under {own}"))
            })?;
            if row.owner != Some(own) {
                return Err(CoordinatorError::forbidden(format!(
                    "{handle} does not belong to {own}"
                )));
            }
        }

        // Deletes are keyed by device, and the mirror may be stale. The
        // primary is the authority on which device a handle maps to.
        let upstream_row = self
            .primary
            .fetch_account(handle)
            .map_err(|err| CoordinatorError::upstream(self.primary.name(), err))?;
        let device = DeviceId::parse(&upstream_row.device_id).map_err(|_| {
            CoordinatorError::upstream(
                self.primary.name(),
                UpstreamError::protocol(format!(
                    "account {handle} carries unusable device identifier {:?}",
                    upstream_row.device_id
                )),
            )
        })?;

        self.primary
            .delete_account(&device)
            .map_err(|err| CoordinatorError::upstream(self.primary.name(), err))?;

        let mut outcome = WriteOutcome::clean(device.clone());
        if self.config.delete_on_secondary {
            if let Some(replica) = self.replica() {
                if let Err(err) = replica.delete_account(&device) {
                    warn!(
                        endpoint = replica.name(),
                        device = %device,
                        error = %err,
                        "secondary delete failed"
                    );
                    outcome.warnings.push(ReplicaWarning {
                        endpoint: replica.name().to_owned(),
                        message: err.to_string(),
                    });
                }
            }
        }

        // Ledger rows referencing this device are left alone; money history
        // outlives the subscriber.
        if let Err(err) = self.mirror.remove(&device) {
            warn!(
                device = %device,
                error = %err,
                "mirror removal failed; next reconciliation repairs it"
            );
        }

        info!(device = %device, handle, actor = %actor.label, "account deleted");
        self.notify("account_deleted", handle, &[("device", device.to_string())]);
        Ok(outcome)
    }

    fn replica(&self) -> Option<&dyn UpstreamClient> {
        if self.config.dual_endpoint_enabled {
            self.secondary.as_deref()
        } else {
            None
        }
    }

    fn resolve_owner(
        &self,
        requested: Option<ResellerId>,
        actor: &Actor,
    ) -> CoordinatorResult<Option<ResellerId>> {
        if actor.capabilities.all_resellers {
            return Ok(requested);
        }
        let own = actor
            .reseller
            .ok_or_else(|| CoordinatorError::forbidden("operator has no reseller scope"))?;
        match requested {
            Some(id) if id != own => Err(CoordinatorError::forbidden(format!(
                "{} may not create accounts for {id}",
                actor.label
            ))),
            _ => Ok(Some(own)),
        }
    }

    fn owner_for_device(
        &self,
        device: &DeviceId,
        actor: &Actor,
    ) -> CoordinatorResult<Option<ResellerId>> {
        let owner = self.mirror.get(device).and_then(|row| row.owner);
        if actor.capabilities.all_resellers {
            return Ok(owner);
        }
        let own = actor
            .reseller
            .ok_or_else(|| CoordinatorError::forbidden("operator has no reseller scope"))?;
        match owner {
            Some(id) if id == own => Ok(owner),
            Some(_) => Err(CoordinatorError::forbidden(format!(
                "{device} belongs to another reseller"
            ))),
            None => Err(CoordinatorError::forbidden(format!(
                "{device} is not attributed to {own}"
            ))),
        }
    }

    fn prepare_charge(
        &self,
        charge: &Charge,
        owner: Option<ResellerId>,
    ) -> CoordinatorResult<ResellerId> {
        let owner = owner
            .ok_or_else(|| CoordinatorError::validation("a charge needs an owning reseller"))?;
        let reseller = self
            .resellers
            .get(owner)
            .ok_or_else(|| CoordinatorError::validation(format!("unknown reseller {owner}")))?;
        charge.validate(&reseller)?;

        if let Some(limit) = reseller.credit_limit_minor {
            let owed = self.ledger.balance(owner, Window::ALL).closing_balance;
            if owed + charge.net_minor() > limit {
                return Err(CoordinatorError::validation(format!(
                    "credit limit reached for {}: owes {owed}, charge {} would pass limit {limit}",
                    reseller.name,
                    charge.net_minor()
                )));
            }
        }
        Ok(owner)
    }

    fn bill(
        &self,
        charge: &Charge,
        owner: ResellerId,
        plan: Option<PlanRef>,
        device: &DeviceId,
        actor: &Actor,
    ) -> CoordinatorResult<EventId> {
        let event = self.ledger.record_sale(
            owner,
            -charge.net_minor(),
            charge.currency.clone(),
            charge.description.clone(),
            plan,
            Some(device.clone()),
            actor.label.clone(),
        )?;
        debug!(%event, %owner, amount = -charge.net_minor(), "charge billed");
        Ok(event)
    }

    fn mirror_row(&self, account: &NewAccount) -> Account {
        Account {
            device_id: account.device_id.clone(),
            handle: account.handle.clone(),
            full_name: account.full_name.clone(),
            phone: normalize_phone(
                &account.phone,
                self.config.default_country_code.as_deref(),
            ),
            email: account.email.clone(),
            plan: account.plan.clone(),
            expires_at: None,
            active: true,
            owner: account.owner,
            synced_at: now_millis(),
        }
    }

    fn recipient_for(row: &Account) -> String {
        if row.email.is_empty() {
            row.handle.clone()
        } else {
            row.email.clone()
        }
    }

    fn notify(&self, channel: &str, recipient: &str, vars: &[(&str, String)]) {
        if self.notifier.notify(channel, recipient, vars) == Delivery::Failed {
            warn!(
                target: "midpanel::notify",
                channel,
                recipient,
                "notification delivery failed"
            );
        }
    }
}

impl std::fmt::Debug for WriteCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WriteCoordinator")
            .field("primary", &self.primary.name())
            .field("secondary", &self.secondary.as_ref().map(|s| s.name()))
            .field("dual_endpoint_enabled", &self.config.dual_endpoint_enabled)
            .finish_non_exhaustive()
    }
}
