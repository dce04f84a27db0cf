//! Shared wiring for command implementations.

use crate::config::PanelConfig;
use midpanel_coordinator::{CoordinatorConfig, IntentJournal, WriteCoordinator};
use midpanel_core::Actor;
use midpanel_ledger::LedgerStore;
use midpanel_store::{AssignmentStore, MirrorStore, PanelDir, ResellerDirectory, ScopeLocks};
use midpanel_sync::{EngineConfig, ReconcileEngine};
use midpanel_upstream::{HttpUpstream, UpstreamClient};
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// Everything a command needs, opened once per invocation.
///
/// The stores open eagerly; upstream clients and the assemblies built on
/// them are constructed on demand so store-only commands never touch the
/// network stack.
pub struct PanelContext {
    config: PanelConfig,
    dir: Arc<PanelDir>,
    /// Local mirror of upstream subscriber rows.
    pub mirror: Arc<MirrorStore>,
    /// Reseller directory.
    pub resellers: Arc<ResellerDirectory>,
    /// Financial journal and balance calculator.
    pub ledger: Arc<LedgerStore>,
    /// Per-scope serialization between reconciliation and ledger writes.
    pub locks: Arc<ScopeLocks>,
}

impl PanelContext {
    /// Opens the panel directory and every store in it.
    pub fn open(config: PanelConfig) -> Result<Self, Box<dyn std::error::Error>> {
        let dir = Arc::new(PanelDir::open(&config.data_dir, true)?);
        let mirror = Arc::new(MirrorStore::open(Arc::clone(&dir))?);
        let resellers = Arc::new(ResellerDirectory::open(Arc::clone(&dir))?);
        let ledger = Arc::new(LedgerStore::open(&dir)?);
        debug!(
            path = %config.data_dir.display(),
            accounts = mirror.len(),
            "panel directory opened"
        );

        Ok(Self {
            config,
            dir,
            mirror,
            resellers,
            ledger,
            locks: Arc::new(ScopeLocks::default()),
        })
    }

    /// The panel directory path, for reporting.
    pub fn data_dir(&self) -> &Path {
        &self.config.data_dir
    }

    /// The operator this invocation acts as.
    pub fn actor(&self) -> Actor {
        self.config.actor()
    }

    /// Builds the primary middleware client.
    pub fn primary(&self) -> Result<Arc<dyn UpstreamClient>, Box<dyn std::error::Error>> {
        Ok(Arc::new(HttpUpstream::new(self.config.primary_endpoint())?))
    }

    /// Builds the write coordinator over the configured endpoints.
    ///
    /// The secondary client is attached whenever one is configured, not
    /// only when dual writes are enabled: the recovery sweep needs it to
    /// compensate intents opened before the flag was last flipped.
    pub fn coordinator(&self) -> Result<WriteCoordinator, Box<dyn std::error::Error>> {
        let intents = IntentJournal::open(&self.dir)?;
        let mut config = CoordinatorConfig::new()
            .with_dual_endpoint(self.config.dual_endpoint_enabled)
            .with_delete_on_secondary(self.config.delete_on_secondary);
        if let Some(code) = &self.config.default_country_code {
            config = config.with_default_country_code(code.clone());
        }

        let mut coordinator = WriteCoordinator::new(
            self.primary()?,
            Arc::clone(&self.mirror),
            Arc::clone(&self.resellers),
            Arc::clone(&self.ledger),
            intents,
            config,
        );
        if let Some(endpoint) = self.config.secondary_endpoint() {
            coordinator = coordinator.with_secondary(Arc::new(HttpUpstream::new(endpoint)?));
        }
        Ok(coordinator)
    }

    /// Builds the reconciliation engine over the primary endpoint.
    pub fn engine(&self) -> Result<ReconcileEngine, Box<dyn std::error::Error>> {
        let mut config = EngineConfig::new();
        if let Some(code) = &self.config.default_country_code {
            config = config.with_default_country_code(code.clone());
        }

        Ok(ReconcileEngine::new(
            self.primary()?,
            Arc::clone(&self.mirror),
            AssignmentStore::new(Arc::clone(&self.dir)),
            Arc::clone(&self.ledger),
            Arc::clone(&self.locks),
            config,
        ))
    }

    /// Number of write intents awaiting the recovery sweep.
    pub fn pending_intents(&self) -> Result<usize, Box<dyn std::error::Error>> {
        Ok(IntentJournal::open(&self.dir)?.pending_len())
    }
}
