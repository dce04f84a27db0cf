//! The reconciliation engine.

use crate::config::EngineConfig;
use crate::error::{ReconcileError, ReconcileResult};
use midpanel_core::{
    normalize_phone, now_millis, Account, Actor, DeviceId, PlanRef, ResellerId, Scope,
};
use midpanel_ledger::{LedgerStore, OrphanNote};
use midpanel_store::{AssignmentStore, MirrorStore, ScopeLocks};
use midpanel_upstream::UpstreamClient;
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Counters from one reconciliation pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Rows staged and swapped into the mirror.
    pub synced: usize,
    /// Upstream records dropped for missing a device identifier or handle.
    pub skipped: usize,
    /// Devices present in the mirror before the pass and absent upstream.
    pub orphans_detected: usize,
    /// Wall-clock time the pass took, lock wait included.
    pub duration: Duration,
}

/// Rebuilds the mirror from the upstream account list.
///
/// A pass holds the scope lock for its whole duration, so it cannot race a
/// ledger mutation or another pass over the same rows. See the crate docs
/// for the fetch-then-swap ordering.
pub struct ReconcileEngine {
    upstream: Arc<dyn UpstreamClient>,
    mirror: Arc<MirrorStore>,
    assignments: AssignmentStore,
    ledger: Arc<LedgerStore>,
    locks: Arc<ScopeLocks>,
    config: EngineConfig,
    cancel: AtomicBool,
}

impl ReconcileEngine {
    /// Builds an engine over already-opened stores.
    pub fn new(
        upstream: Arc<dyn UpstreamClient>,
        mirror: Arc<MirrorStore>,
        assignments: AssignmentStore,
        ledger: Arc<LedgerStore>,
        locks: Arc<ScopeLocks>,
        config: EngineConfig,
    ) -> Self {
        Self {
            upstream,
            mirror,
            assignments,
            ledger,
            locks,
            config,
            cancel: AtomicBool::new(false),
        }
    }

    /// Asks the running pass to stop at the next record boundary.
    ///
    /// The request is consumed by the pass that observes it; if no pass is
    /// running it stops the next one at its first record instead.
    pub fn request_cancel(&self) {
        self.cancel.store(true, Ordering::Relaxed);
    }

    /// Runs one reconciliation pass.
    ///
    /// `requested` narrows the pass to one reseller; `None` asks for the
    /// widest scope the actor may use. Non-admin actors are always pinned
    /// to their own reseller.
    ///
    /// # Errors
    ///
    /// Returns [`ReconcileError::Forbidden`] when the actor may not touch
    /// the requested scope, [`ReconcileError::Upstream`] when the fetch
    /// fails (mirror untouched), [`ReconcileError::Cancelled`] when a
    /// cancellation request is observed, and storage errors as
    /// [`ReconcileError::Store`].
    pub fn reconcile(
        &self,
        requested: Option<ResellerId>,
        actor: &Actor,
    ) -> ReconcileResult<ReconcileReport> {
        if !actor.capabilities.write_accounts {
            return Err(ReconcileError::forbidden(format!(
                "{} may not rebuild the mirror",
                actor.label
            )));
        }
        let scope = actor.resolve_scope(requested).ok_or_else(|| {
            ReconcileError::forbidden(format!(
                "{} may not reconcile the requested scope",
                actor.label
            ))
        })?;

        let started = Instant::now();
        let _guard = self.locks.lock(scope);
        info!(%scope, actor = %actor.label, "reconciliation started");

        // Ownership snapshot. Live mirror rows are the freshest source, so
        // they are persisted immediately (self-heal); an empty mirror falls
        // back to the last durable backup.
        let mapping = if self.mirror.is_empty() {
            self.assignments.load()?
        } else {
            let derived = self.mirror.derive_assignments();
            self.assignments.save(&derived)?;
            derived
        };

        let before_rows = self.mirror.accounts(scope);

        let upstream_rows = self
            .upstream
            .list_accounts()
            .map_err(|err| ReconcileError::upstream(self.upstream.name(), err))?;
        debug!(count = upstream_rows.len(), "upstream list fetched");

        let now = now_millis();
        let mut staged = Vec::with_capacity(upstream_rows.len());
        let mut skipped = 0usize;
        let mut upstream_devices = BTreeSet::new();

        for row in upstream_rows {
            if self.cancel.swap(false, Ordering::Relaxed) {
                info!(%scope, "reconciliation cancelled");
                return Err(ReconcileError::Cancelled);
            }

            let Ok(device) = DeviceId::parse(&row.device_id) else {
                warn!(raw = %row.device_id, "skipping record without usable device identifier");
                skipped += 1;
                continue;
            };
            // The device exists upstream even when the record is unusable,
            // so it must not be reported as an orphan.
            upstream_devices.insert(device.clone());

            let handle = row.handle.trim();
            if handle.is_empty() {
                warn!(%device, "skipping record without handle");
                skipped += 1;
                continue;
            }

            let owner = row
                .owner
                .map(ResellerId::new)
                .or_else(|| mapping.resolve(&device, handle));

            if let Scope::Reseller(id) = scope {
                if owner != Some(id) {
                    continue;
                }
            }

            let active = row.is_active();
            staged.push(Account {
                device_id: device,
                handle: handle.to_owned(),
                full_name: row.full_name,
                phone: normalize_phone(&row.phone, self.config.default_country_code.as_deref()),
                email: row.email,
                plan: row.plan.map(PlanRef::new),
                expires_at: row.expires_at,
                active,
                owner,
                synced_at: now,
            });
        }

        let synced = staged.len();
        self.mirror.replace(scope, staged)?;

        let mut orphans_detected = 0usize;
        for row in &before_rows {
            if upstream_devices.contains(&row.device_id) {
                continue;
            }
            orphans_detected += 1;
            info!(device = %row.device_id, handle = %row.handle, "orphan detected");

            let note = OrphanNote {
                detected_at: now,
                device_id: row.device_id.clone(),
                handle: row.handle.clone(),
                scope,
            };
            // The note is an audit convenience; losing it must not fail an
            // otherwise successful pass.
            if let Err(err) = self.ledger.note_orphan(note) {
                warn!(device = %row.device_id, error = %err, "orphan note not recorded");
            }
        }

        self.assignments.save(&self.mirror.derive_assignments())?;

        let report = ReconcileReport {
            synced,
            skipped,
            orphans_detected,
            duration: started.elapsed(),
        };
        info!(
            %scope,
            synced = report.synced,
            skipped = report.skipped,
            orphans = report.orphans_detected,
            elapsed_ms = report.duration.as_millis() as u64,
            "reconciliation finished"
        );
        Ok(report)
    }
}

impl std::fmt::Debug for ReconcileEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReconcileEngine")
            .field("upstream", &self.upstream.name())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use midpanel_core::{Currency, Role};
    use midpanel_ledger::Window;
    use midpanel_store::PanelDir;
    use midpanel_upstream::{MockUpstream, UpstreamAccount, UpstreamError};
    use tempfile::TempDir;

    struct Rig {
        _temp: TempDir,
        upstream: Arc<MockUpstream>,
        mirror: Arc<MirrorStore>,
        assignments: AssignmentStore,
        ledger: Arc<LedgerStore>,
        engine: ReconcileEngine,
    }

    fn rig() -> Rig {
        let temp = TempDir::new().unwrap();
        let dir = Arc::new(PanelDir::open(&temp.path().join("panel"), true).unwrap());
        let mirror = Arc::new(MirrorStore::open(Arc::clone(&dir)).unwrap());
        let ledger = Arc::new(LedgerStore::open(&dir).unwrap());
        let upstream = Arc::new(MockUpstream::new().with_name("primary"));

        let engine = ReconcileEngine::new(
            Arc::clone(&upstream) as Arc<dyn UpstreamClient>,
            Arc::clone(&mirror),
            AssignmentStore::new(Arc::clone(&dir)),
            Arc::clone(&ledger),
            Arc::new(ScopeLocks::default()),
            EngineConfig::new().with_default_country_code("971"),
        );

        Rig {
            _temp: temp,
            upstream,
            mirror,
            assignments: AssignmentStore::new(dir),
            ledger,
            engine,
        }
    }

    fn admin() -> Actor {
        Actor::new("root", None, Role::SuperAdmin)
    }

    fn mac(n: u8) -> String {
        format!("00:1A:79:00:00:{n:02X}")
    }

    fn device(n: u8) -> DeviceId {
        DeviceId::parse(&mac(n)).unwrap()
    }

    fn upstream_row(n: u8, handle: &str, owner: Option<u64>) -> UpstreamAccount {
        let mut row = UpstreamAccount::new(mac(n), handle);
        row.owner = owner;
        row
    }

    #[test]
    fn reconcile_is_idempotent() {
        let rig = rig();
        rig.upstream.seed_accounts(vec![
            upstream_row(1, "sub001", Some(1)),
            upstream_row(2, "sub002", Some(1)),
            upstream_row(3, "sub003", Some(2)),
        ]);

        let first = rig.engine.reconcile(None, &admin()).unwrap();
        let mirror_after_first = rig.mirror.accounts(Scope::AllResellers);
        let mapping_after_first = rig.assignments.load().unwrap();

        let second = rig.engine.reconcile(None, &admin()).unwrap();
        let mirror_after_second = rig.mirror.accounts(Scope::AllResellers);
        let mapping_after_second = rig.assignments.load().unwrap();

        fn owners(rows: &[Account]) -> Vec<(DeviceId, Option<ResellerId>)> {
            rows.iter()
                .map(|a| (a.device_id.clone(), a.owner))
                .collect()
        }

        assert_eq!(first.synced, 3);
        assert_eq!(second.synced, 3);
        assert_eq!(second.orphans_detected, 0);
        assert_eq!(mapping_after_first, mapping_after_second);
        assert_eq!(owners(&mirror_after_first), owners(&mirror_after_second));
    }

    #[test]
    fn positive_upstream_owner_field_wins_over_backup() {
        let rig = rig();
        let mut backup = midpanel_store::AssignmentMapping::new();
        backup.insert(device(1), "sub001", ResellerId::new(7));
        rig.assignments.save(&backup).unwrap();

        rig.upstream
            .seed_accounts(vec![upstream_row(1, "sub001", Some(4))]);
        rig.engine.reconcile(None, &admin()).unwrap();

        assert_eq!(
            rig.mirror.get(&device(1)).unwrap().owner,
            Some(ResellerId::new(4))
        );
    }

    #[test]
    fn absent_owner_without_backup_stays_unassigned() {
        let rig = rig();
        rig.upstream
            .seed_accounts(vec![upstream_row(1, "sub001", None)]);

        rig.engine.reconcile(None, &admin()).unwrap();

        assert_eq!(rig.mirror.get(&device(1)).unwrap().owner, None);
    }

    #[test]
    fn backup_resolves_owner_by_device_then_handle() {
        let rig = rig();
        let mut backup = midpanel_store::AssignmentMapping::new();
        backup.insert(device(1), "sub001", ResellerId::new(7));
        backup.by_handle.insert("sub002".to_owned(), ResellerId::new(9));
        rig.assignments.save(&backup).unwrap();

        rig.upstream.seed_accounts(vec![
            // Known device, renamed handle: device entry wins.
            upstream_row(1, "renamed", None),
            // Unknown device, known handle: handle entry applies.
            upstream_row(2, "sub002", None),
        ]);
        rig.engine.reconcile(None, &admin()).unwrap();

        assert_eq!(
            rig.mirror.get(&device(1)).unwrap().owner,
            Some(ResellerId::new(7))
        );
        assert_eq!(
            rig.mirror.get(&device(2)).unwrap().owner,
            Some(ResellerId::new(9))
        );
    }

    #[test]
    fn records_missing_identity_are_skipped() {
        let rig = rig();
        let no_mac = UpstreamAccount::new("", "ghost");
        let no_handle = upstream_row(2, "   ", Some(1));
        rig.upstream
            .seed_accounts(vec![no_mac, no_handle, upstream_row(3, "sub003", Some(1))]);

        let report = rig.engine.reconcile(None, &admin()).unwrap();

        assert_eq!(report.synced, 1);
        assert_eq!(report.skipped, 2);
        assert_eq!(rig.mirror.len(), 1);
    }

    #[test]
    fn fetch_failure_leaves_mirror_untouched() {
        let rig = rig();
        rig.upstream.seed_accounts(vec![
            upstream_row(1, "sub001", Some(1)),
            upstream_row(2, "sub002", Some(2)),
        ]);
        rig.engine.reconcile(None, &admin()).unwrap();
        let before = rig.mirror.accounts(Scope::AllResellers);

        rig.upstream
            .set_list_error(Some(UpstreamError::unavailable("connection refused")));
        let err = rig.engine.reconcile(None, &admin()).unwrap_err();

        assert!(matches!(err, ReconcileError::Upstream { .. }));
        assert_eq!(rig.mirror.accounts(Scope::AllResellers), before);
    }

    #[test]
    fn orphan_is_reported_once_and_ledger_rows_survive() {
        let rig = rig();
        rig.upstream.seed_accounts(vec![
            upstream_row(1, "sub001", Some(1)),
            upstream_row(2, "sub002", Some(1)),
        ]);
        rig.engine.reconcile(None, &admin()).unwrap();

        rig.ledger
            .record_sale(
                ResellerId::new(1),
                -5_000,
                Currency::parse("AED").unwrap(),
                "gold 1m",
                None,
                Some(device(1)),
                "root",
            )
            .unwrap();
        let events_before = rig.ledger.events_for(ResellerId::new(1), Window::ALL).len();

        // Device 1 disappears upstream.
        rig.upstream
            .seed_accounts(vec![upstream_row(2, "sub002", Some(1))]);
        let report = rig.engine.reconcile(None, &admin()).unwrap();

        assert_eq!(report.orphans_detected, 1);
        let notes = rig.ledger.orphans_for(Scope::AllResellers, Window::ALL);
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].device_id, device(1));
        assert_eq!(notes[0].handle, "sub001");
        assert_eq!(
            rig.ledger.events_for(ResellerId::new(1), Window::ALL).len(),
            events_before
        );

        // The device is already gone from the mirror, so a further pass
        // must not report it again.
        let again = rig.engine.reconcile(None, &admin()).unwrap();
        assert_eq!(again.orphans_detected, 0);
        assert_eq!(
            rig.ledger.orphans_for(Scope::AllResellers, Window::ALL).len(),
            1
        );
    }

    #[test]
    fn scoped_pass_replaces_only_that_reseller() {
        let rig = rig();
        rig.upstream.seed_accounts(vec![
            upstream_row(1, "sub001", Some(1)),
            upstream_row(2, "sub002", Some(2)),
        ]);
        rig.engine.reconcile(None, &admin()).unwrap();

        let mut renamed = upstream_row(1, "sub001-new", Some(1));
        renamed.full_name = "Renamed One".to_owned();
        let mut changed = upstream_row(2, "sub002", Some(2));
        changed.full_name = "Changed Two".to_owned();
        rig.upstream.seed_accounts(vec![renamed, changed]);

        let report = rig
            .engine
            .reconcile(Some(ResellerId::new(1)), &admin())
            .unwrap();

        assert_eq!(report.synced, 1);
        assert_eq!(rig.mirror.get(&device(1)).unwrap().handle, "sub001-new");
        // Reseller 2's row was out of scope and kept its old state.
        assert_eq!(rig.mirror.get(&device(2)).unwrap().full_name, "");
    }

    #[test]
    fn foreign_scope_and_observers_are_forbidden() {
        let rig = rig();
        let branch = Actor::new("branch", Some(ResellerId::new(1)), Role::ResellerAdmin);
        let err = rig
            .engine
            .reconcile(Some(ResellerId::new(2)), &branch)
            .unwrap_err();
        assert!(matches!(err, ReconcileError::Forbidden { .. }));

        let observer = Actor::new("viewer", Some(ResellerId::new(1)), Role::Observer);
        let err = rig.engine.reconcile(None, &observer).unwrap_err();
        assert!(matches!(err, ReconcileError::Forbidden { .. }));
    }

    #[test]
    fn assignments_heal_ownership_after_mirror_wipe() {
        let rig = rig();
        rig.upstream
            .seed_accounts(vec![upstream_row(1, "sub001", Some(3))]);
        rig.engine.reconcile(None, &admin()).unwrap();

        // Simulate losing the mirror while upstream stops sending the
        // owner field.
        rig.mirror.replace(Scope::AllResellers, Vec::new()).unwrap();
        rig.upstream
            .seed_accounts(vec![upstream_row(1, "sub001", None)]);

        rig.engine.reconcile(None, &admin()).unwrap();
        assert_eq!(
            rig.mirror.get(&device(1)).unwrap().owner,
            Some(ResellerId::new(3))
        );
    }

    #[test]
    fn pending_cancellation_stops_the_next_pass() {
        let rig = rig();
        rig.upstream.seed_accounts(vec![
            upstream_row(1, "sub001", Some(1)),
            upstream_row(2, "sub002", Some(1)),
        ]);
        rig.engine.reconcile(None, &admin()).unwrap();
        let before = rig.mirror.accounts(Scope::AllResellers);

        rig.engine.request_cancel();
        let err = rig.engine.reconcile(None, &admin()).unwrap_err();
        assert!(matches!(err, ReconcileError::Cancelled));
        assert_eq!(rig.mirror.accounts(Scope::AllResellers), before);

        // The cancellation was consumed; the next pass completes.
        let report = rig.engine.reconcile(None, &admin()).unwrap();
        assert_eq!(report.synced, 2);
    }
}
