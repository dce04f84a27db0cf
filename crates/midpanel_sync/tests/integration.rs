//! Integration tests for the reconciliation engine and write coordinator.

use midpanel_coordinator::{
    Charge, CoordinatorConfig, CoordinatorError, IntentJournal, RecoveryOutcome, WriteCoordinator,
    WriteOp,
};
use midpanel_core::{
    AccountPatch, Actor, Currency, DeviceId, NewAccount, Reseller, ResellerId, Role, Scope,
};
use midpanel_ledger::{LedgerStore, Window};
use midpanel_store::{AssignmentStore, MirrorStore, PanelDir, ResellerDirectory, ScopeLocks};
use midpanel_sync::{EngineConfig, ReconcileEngine};
use midpanel_upstream::{MockUpstream, UpstreamClient, UpstreamError};
use std::sync::Arc;
use tempfile::TempDir;

/// A full panel wired over one temporary directory: the coordinator writes
/// through the primary mock, and the engine rebuilds the mirror from it.
struct Panel {
    _temp: TempDir,
    dir: Arc<PanelDir>,
    primary: Arc<MockUpstream>,
    secondary: Arc<MockUpstream>,
    mirror: Arc<MirrorStore>,
    resellers: Arc<ResellerDirectory>,
    ledger: Arc<LedgerStore>,
    coordinator: WriteCoordinator,
    engine: ReconcileEngine,
}

fn panel_with(config: CoordinatorConfig) -> Panel {
    let temp = TempDir::new().unwrap();
    let dir = Arc::new(PanelDir::open(&temp.path().join("panel"), true).unwrap());
    let mirror = Arc::new(MirrorStore::open(Arc::clone(&dir)).unwrap());
    let resellers = Arc::new(ResellerDirectory::open(Arc::clone(&dir)).unwrap());
    let ledger = Arc::new(LedgerStore::open(&dir).unwrap());
    let primary = Arc::new(MockUpstream::new().with_name("primary"));
    let secondary = Arc::new(MockUpstream::new().with_name("backup"));

    let coordinator = WriteCoordinator::new(
        Arc::clone(&primary) as Arc<dyn UpstreamClient>,
        Arc::clone(&mirror),
        Arc::clone(&resellers),
        Arc::clone(&ledger),
        IntentJournal::open(&dir).unwrap(),
        config,
    )
    .with_secondary(Arc::clone(&secondary) as Arc<dyn UpstreamClient>);

    let engine = ReconcileEngine::new(
        Arc::clone(&primary) as Arc<dyn UpstreamClient>,
        Arc::clone(&mirror),
        AssignmentStore::new(Arc::clone(&dir)),
        Arc::clone(&ledger),
        Arc::new(ScopeLocks::default()),
        EngineConfig::new().with_default_country_code("971"),
    );

    Panel {
        _temp: temp,
        dir,
        primary,
        secondary,
        mirror,
        resellers,
        ledger,
        coordinator,
        engine,
    }
}

fn panel() -> Panel {
    panel_with(CoordinatorConfig::new().with_default_country_code("971"))
}

fn admin() -> Actor {
    Actor::new("root", None, Role::SuperAdmin)
}

fn aed() -> Currency {
    Currency::parse("AED").unwrap()
}

fn device(n: u8) -> DeviceId {
    DeviceId::parse(&format!("00:1A:79:00:00:{n:02X}")).unwrap()
}

fn new_account(n: u8, handle: &str, owner: u64) -> NewAccount {
    NewAccount {
        device_id: device(n),
        handle: handle.to_owned(),
        full_name: "Test Subscriber".to_owned(),
        phone: "0501234567".to_owned(),
        email: String::new(),
        plan: None,
        owner: Some(ResellerId::new(owner)),
    }
}

fn month(price_minor: i64) -> Charge {
    Charge::new(price_minor, aed(), "gold 1m")
}

fn seed_reseller(panel: &Panel, id: u64) {
    panel
        .resellers
        .upsert(Reseller::new(ResellerId::new(id), format!("Branch {id}"), aed()))
        .unwrap();
}

#[test]
fn coordinated_writes_survive_a_reconcile_pass() {
    let p = panel();
    seed_reseller(&p, 1);

    // Two accounts sold through the coordinator.
    p.coordinator
        .apply(
            WriteOp::Create {
                account: new_account(1, "sub001", 1),
                charge: Some(month(10_000)),
            },
            &admin(),
        )
        .unwrap();
    p.coordinator
        .apply(
            WriteOp::Create {
                account: new_account(2, "sub002", 1),
                charge: Some(month(10_000)),
            },
            &admin(),
        )
        .unwrap();

    let before = p.ledger.balance(ResellerId::new(1), Window::ALL);
    assert_eq!(before.closing_balance, 20_000);

    // A full rebuild from the same endpoint finds exactly those accounts.
    let report = p.engine.reconcile(None, &admin()).unwrap();
    assert_eq!(report.synced, 2);
    assert_eq!(report.orphans_detected, 0);

    // Ownership and phone normalization agree between the two write paths.
    let row = p.mirror.get(&device(1)).unwrap();
    assert_eq!(row.owner, Some(ResellerId::new(1)));
    assert_eq!(row.phone, "+971501234567");

    // Rebuilding the mirror never touches money.
    let after = p.ledger.balance(ResellerId::new(1), Window::ALL);
    assert_eq!(after.closing_balance, before.closing_balance);
}

#[test]
fn renewals_reconcile_into_the_mirror() {
    let p = panel();
    seed_reseller(&p, 1);
    p.coordinator
        .apply(
            WriteOp::Create {
                account: new_account(1, "sub001", 1),
                charge: Some(month(10_000)),
            },
            &admin(),
        )
        .unwrap();

    // Renew for another month: new expiry upstream, second sale billed.
    let patch = AccountPatch {
        expires_at: Some(1_790_000_000_000),
        ..AccountPatch::default()
    };
    p.coordinator
        .apply(
            WriteOp::Update {
                device: device(1),
                patch,
                charge: Some(month(10_000)),
            },
            &admin(),
        )
        .unwrap();

    let report = p.engine.reconcile(None, &admin()).unwrap();
    assert_eq!(report.synced, 1);

    let row = p.mirror.get(&device(1)).unwrap();
    assert_eq!(row.expires_at, Some(1_790_000_000_000));
    assert_eq!(row.owner, Some(ResellerId::new(1)));

    let balance = p.ledger.balance(ResellerId::new(1), Window::ALL);
    assert_eq!(balance.total_sales, 20_000);
    assert_eq!(balance.closing_balance, 20_000);
}

#[test]
fn recovery_sweep_closes_the_gap_left_by_a_failed_dual_create() {
    let p = panel_with(
        CoordinatorConfig::new()
            .with_dual_endpoint(true)
            .with_default_country_code("971"),
    );
    seed_reseller(&p, 1);

    // The secondary takes the create, the primary refuses it, and the
    // compensating delete fails as well: the replicas now disagree.
    p.primary
        .set_create_error(Some(UpstreamError::unavailable("maintenance window")));
    p.secondary
        .set_delete_error(Some(UpstreamError::unavailable("maintenance window")));
    let err = p
        .coordinator
        .apply(
            WriteOp::Create {
                account: new_account(1, "sub001", 1),
                charge: None,
            },
            &admin(),
        )
        .unwrap_err();
    assert!(matches!(err, CoordinatorError::ConsistencyViolation { .. }));
    assert_eq!(p.coordinator.pending_intents().len(), 1);
    assert_eq!(p.secondary.current_accounts().len(), 1);

    // Once the secondary answers again, the sweep owes it one delete.
    p.secondary.set_delete_error(None);
    let swept = p.coordinator.recover().unwrap();
    assert_eq!(swept.len(), 1);
    assert!(matches!(swept[0].outcome, RecoveryOutcome::Swept));
    assert!(p.coordinator.pending_intents().is_empty());
    assert!(p.secondary.current_accounts().is_empty());

    // A rebuild from the secondary shows no trace of the failed create.
    let engine = ReconcileEngine::new(
        Arc::clone(&p.secondary) as Arc<dyn UpstreamClient>,
        Arc::clone(&p.mirror),
        AssignmentStore::new(Arc::clone(&p.dir)),
        Arc::clone(&p.ledger),
        Arc::new(ScopeLocks::default()),
        EngineConfig::new(),
    );
    let report = engine.reconcile(None, &admin()).unwrap();
    assert_eq!(report.synced, 0);
    assert!(p.mirror.is_empty());
}

#[test]
fn coordinator_deletes_keep_mirror_and_endpoint_agreed() {
    let p = panel();
    seed_reseller(&p, 1);
    p.coordinator
        .apply(
            WriteOp::Create {
                account: new_account(1, "sub001", 1),
                charge: None,
            },
            &admin(),
        )
        .unwrap();
    p.coordinator
        .apply(
            WriteOp::Create {
                account: new_account(2, "sub002", 1),
                charge: None,
            },
            &admin(),
        )
        .unwrap();
    assert_eq!(p.engine.reconcile(None, &admin()).unwrap().synced, 2);

    p.coordinator
        .apply(
            WriteOp::Delete {
                handle: "sub001".to_owned(),
            },
            &admin(),
        )
        .unwrap();

    // The coordinator already dropped the mirror row, so the next pass has
    // nothing to report as an orphan.
    let report = p.engine.reconcile(None, &admin()).unwrap();
    assert_eq!(report.synced, 1);
    assert_eq!(report.orphans_detected, 0);
    assert!(p.ledger.orphans_for(Scope::AllResellers, Window::ALL).is_empty());
    assert!(p.mirror.get(&device(1)).is_none());
    assert_eq!(p.mirror.len(), 1);
}
