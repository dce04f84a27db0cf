//! Durable reseller directory.
//!
//! Resellers are panel-local records: the upstream middleware only knows
//! them as opaque owner numbers on accounts. The directory maps those
//! numbers to names, currencies and credit terms, and is the lookup point
//! for everything that validates charges or renders balances.

use crate::codec;
use crate::dir::{PanelDir, RESELLERS_FILE};
use crate::error::{StoreError, StoreResult};
use midpanel_core::{now_millis, Reseller, ResellerId};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

const DOC_VERSION: u16 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct ResellerDocument {
    version: u16,
    saved_at: u64,
    resellers: Vec<Reseller>,
}

/// Persisted map of reseller id to reseller record.
#[derive(Debug)]
pub struct ResellerDirectory {
    dir: Arc<PanelDir>,
    resellers: RwLock<BTreeMap<ResellerId, Reseller>>,
}

impl ResellerDirectory {
    /// Opens the directory, loading the persisted document if present.
    ///
    /// # Errors
    ///
    /// Returns an error if the document exists but cannot be decoded.
    pub fn open(dir: Arc<PanelDir>) -> StoreResult<Self> {
        let mut resellers = BTreeMap::new();

        if let Some(bytes) = dir.load_document(RESELLERS_FILE)? {
            let doc: ResellerDocument = codec::from_cbor(&bytes)?;
            if doc.version > DOC_VERSION {
                return Err(StoreError::invalid_document(format!(
                    "reseller document version {} is newer than supported {}",
                    doc.version, DOC_VERSION
                )));
            }
            for reseller in doc.resellers {
                resellers.insert(reseller.id, reseller);
            }
        }

        Ok(Self {
            dir,
            resellers: RwLock::new(resellers),
        })
    }

    /// Returns the number of known resellers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.resellers.read().len()
    }

    /// Returns true if no reseller has been registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.resellers.read().is_empty()
    }

    /// Looks up a reseller by id.
    #[must_use]
    pub fn get(&self, id: ResellerId) -> Option<Reseller> {
        self.resellers.read().get(&id).cloned()
    }

    /// Returns all resellers ordered by id.
    #[must_use]
    pub fn list(&self) -> Vec<Reseller> {
        self.resellers.read().values().cloned().collect()
    }

    /// Inserts or replaces a reseller record and persists the document.
    ///
    /// # Errors
    ///
    /// Returns an error if persisting fails.
    pub fn upsert(&self, reseller: Reseller) -> StoreResult<()> {
        let mut resellers = self.resellers.write();
        resellers.insert(reseller.id, reseller);
        self.persist(&resellers)
    }

    /// Removes a reseller record, returning it, and persists the document.
    ///
    /// # Errors
    ///
    /// Returns an error if persisting fails.
    pub fn remove(&self, id: ResellerId) -> StoreResult<Option<Reseller>> {
        let mut resellers = self.resellers.write();
        let removed = resellers.remove(&id);
        if removed.is_some() {
            self.persist(&resellers)?;
        }
        Ok(removed)
    }

    fn persist(&self, resellers: &BTreeMap<ResellerId, Reseller>) -> StoreResult<()> {
        let doc = ResellerDocument {
            version: DOC_VERSION,
            saved_at: now_millis(),
            resellers: resellers.values().cloned().collect(),
        };
        let bytes = codec::to_cbor(&doc)?;
        self.dir.save_document(RESELLERS_FILE, &bytes)
    }
}
