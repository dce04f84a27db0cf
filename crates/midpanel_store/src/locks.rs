//! Scope-level mutual exclusion.
//!
//! Reconciliation and coordinated writes must not interleave on the same
//! rows. A global run takes the whole panel; a per-reseller run takes only
//! that reseller's slot but still excludes global runs. Modeled as a
//! readers-writer lock over the panel plus one mutex per reseller: global
//! runs hold the writer side, scoped runs hold the reader side and their
//! own slot.

use midpanel_core::{ResellerId, Scope};
use parking_lot::lock_api::ArcMutexGuard;
use parking_lot::{Mutex, RawMutex, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Registry of scope locks for one panel.
#[derive(Debug, Default)]
pub struct ScopeLocks {
    global: RwLock<()>,
    resellers: Mutex<HashMap<ResellerId, Arc<Mutex<()>>>>,
}

/// Held lock for one scope. Releases on drop.
pub struct ScopeGuard<'a> {
    scope: Scope,
    _shared: Option<RwLockReadGuard<'a, ()>>,
    _exclusive: Option<RwLockWriteGuard<'a, ()>>,
    _slot: Option<ArcMutexGuard<RawMutex, ()>>,
}

impl ScopeLocks {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquires the lock for `scope`, blocking until it is free.
    pub fn lock(&self, scope: Scope) -> ScopeGuard<'_> {
        match scope {
            Scope::AllResellers => ScopeGuard {
                scope,
                _shared: None,
                _exclusive: Some(self.global.write()),
                _slot: None,
            },
            Scope::Reseller(id) => {
                let shared = self.global.read();
                let slot = self.slot(id);
                ScopeGuard {
                    scope,
                    _shared: Some(shared),
                    _exclusive: None,
                    _slot: Some(slot.lock_arc()),
                }
            }
        }
    }

    /// Acquires the lock for `scope` without blocking.
    ///
    /// Returns `None` when a conflicting run already holds it.
    #[must_use]
    pub fn try_lock(&self, scope: Scope) -> Option<ScopeGuard<'_>> {
        match scope {
            Scope::AllResellers => self.global.try_write().map(|exclusive| ScopeGuard {
                scope,
                _shared: None,
                _exclusive: Some(exclusive),
                _slot: None,
            }),
            Scope::Reseller(id) => {
                let shared = self.global.try_read()?;
                let slot = self.slot(id);
                let held = slot.try_lock_arc()?;
                Some(ScopeGuard {
                    scope,
                    _shared: Some(shared),
                    _exclusive: None,
                    _slot: Some(held),
                })
            }
        }
    }

    fn slot(&self, id: ResellerId) -> Arc<Mutex<()>> {
        let mut slots = self.resellers.lock();
        Arc::clone(slots.entry(id).or_default())
    }
}

impl ScopeGuard<'_> {
    /// The scope this guard holds.
    #[must_use]
    pub fn scope(&self) -> Scope {
        self.scope
    }
}

impl fmt::Debug for ScopeGuard<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScopeGuard")
            .field("scope", &self.scope)
            .finish_non_exhaustive()
    }
}
