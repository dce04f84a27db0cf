//! Durable device and handle ownership mapping.
//!
//! The assignment mapping is what lets a mirror rebuild preserve reseller
//! ownership: it is persisted independently of the mirror, so it is still
//! readable after the mirror has been wiped or lost. Device entries always
//! win over handle entries, because handles can be renamed upstream while
//! the hardware identifier cannot.

use crate::codec;
use crate::dir::{PanelDir, ASSIGNMENTS_FILE};
use crate::error::{StoreError, StoreResult};
use midpanel_core::{now_millis, DeviceId, ResellerId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Version of the persisted assignment document.
const DOC_VERSION: u16 = 1;

/// Ownership lookup tables, keyed by device and by handle.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignmentMapping {
    /// Device identifier to owning reseller.
    pub by_device: BTreeMap<DeviceId, ResellerId>,
    /// Display handle to owning reseller.
    pub by_handle: BTreeMap<String, ResellerId>,
}

impl AssignmentMapping {
    /// Creates an empty mapping.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if neither table has entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_device.is_empty() && self.by_handle.is_empty()
    }

    /// Records an ownership fact in both tables.
    pub fn insert(&mut self, device: DeviceId, handle: &str, reseller: ResellerId) {
        self.by_device.insert(device, reseller);
        if !handle.is_empty() {
            self.by_handle.insert(handle.to_string(), reseller);
        }
    }

    /// Resolves an owner for a device/handle pair. The device table wins.
    #[must_use]
    pub fn resolve(&self, device: &DeviceId, handle: &str) -> Option<ResellerId> {
        if let Some(owner) = self.by_device.get(device) {
            return Some(*owner);
        }
        self.by_handle.get(handle).copied()
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct AssignmentDocument {
    version: u16,
    saved_at: u64,
    mapping: AssignmentMapping,
}

/// Persists the assignment mapping as an atomically replaced document.
#[derive(Debug)]
pub struct AssignmentStore {
    dir: Arc<PanelDir>,
}

impl AssignmentStore {
    /// Creates a store over an open panel directory.
    pub fn new(dir: Arc<PanelDir>) -> Self {
        Self { dir }
    }

    /// Saves the mapping, replacing any previous document.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding or the atomic write fails.
    pub fn save(&self, mapping: &AssignmentMapping) -> StoreResult<()> {
        let doc = AssignmentDocument {
            version: DOC_VERSION,
            saved_at: now_millis(),
            mapping: mapping.clone(),
        };
        let bytes = codec::to_cbor(&doc)?;
        self.dir.save_document(ASSIGNMENTS_FILE, &bytes)
    }

    /// Loads the last fully saved mapping; empty if none was ever saved.
    ///
    /// # Errors
    ///
    /// Returns an error if the document exists but cannot be decoded, or
    /// carries a newer format version than this build understands.
    pub fn load(&self) -> StoreResult<AssignmentMapping> {
        let Some(bytes) = self.dir.load_document(ASSIGNMENTS_FILE)? else {
            return Ok(AssignmentMapping::new());
        };

        let doc: AssignmentDocument = codec::from_cbor(&bytes)?;
        if doc.version > DOC_VERSION {
            return Err(StoreError::invalid_document(format!(
                "assignment document version {} is newer than supported {}",
                doc.version, DOC_VERSION
            )));
        }

        Ok(doc.mapping)
    }
}
