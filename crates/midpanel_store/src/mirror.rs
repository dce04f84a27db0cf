//! The local account mirror.
//!
//! Read-optimized copy of the upstream subscriber list. The mirror is
//! disposable: reconciliation replaces its rows wholesale from the
//! upstream source of truth, so nothing here is ever the authority on
//! an account's attributes. The persisted snapshot exists so reads work
//! between process restarts without an upstream round trip.

use crate::assignment::AssignmentMapping;
use crate::codec;
use crate::dir::{PanelDir, MIRROR_FILE};
use crate::error::{StoreError, StoreResult};
use midpanel_core::{now_millis, Account, DeviceId, Scope};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

const DOC_VERSION: u16 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct MirrorDocument {
    version: u16,
    saved_at: u64,
    accounts: Vec<Account>,
}

/// In-memory account mirror with a persisted snapshot.
#[derive(Debug)]
pub struct MirrorStore {
    dir: Arc<PanelDir>,
    accounts: RwLock<BTreeMap<DeviceId, Account>>,
}

impl MirrorStore {
    /// Opens the mirror, loading the persisted snapshot if one exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the snapshot exists but cannot be decoded.
    pub fn open(dir: Arc<PanelDir>) -> StoreResult<Self> {
        let mut accounts = BTreeMap::new();

        if let Some(bytes) = dir.load_document(MIRROR_FILE)? {
            let doc: MirrorDocument = codec::from_cbor(&bytes)?;
            if doc.version > DOC_VERSION {
                return Err(StoreError::invalid_document(format!(
                    "mirror document version {} is newer than supported {}",
                    doc.version, DOC_VERSION
                )));
            }
            for account in doc.accounts {
                accounts.insert(account.device_id.clone(), account);
            }
        }

        Ok(Self {
            dir,
            accounts: RwLock::new(accounts),
        })
    }

    /// Returns the number of mirrored accounts.
    #[must_use]
    pub fn len(&self) -> usize {
        self.accounts.read().len()
    }

    /// Returns true if the mirror holds no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.accounts.read().is_empty()
    }

    /// Looks up an account by device identifier.
    #[must_use]
    pub fn get(&self, device: &DeviceId) -> Option<Account> {
        self.accounts.read().get(device).cloned()
    }

    /// Looks up an account by display handle (linear scan).
    #[must_use]
    pub fn find_by_handle(&self, handle: &str) -> Option<Account> {
        self.accounts
            .read()
            .values()
            .find(|a| a.handle == handle)
            .cloned()
    }

    /// Returns all accounts visible in `scope`, ordered by device id.
    #[must_use]
    pub fn accounts(&self, scope: Scope) -> Vec<Account> {
        self.accounts
            .read()
            .values()
            .filter(|a| in_scope(a, scope))
            .cloned()
            .collect()
    }

    /// Returns the set of device identifiers visible in `scope`.
    #[must_use]
    pub fn device_ids(&self, scope: Scope) -> BTreeSet<DeviceId> {
        self.accounts
            .read()
            .values()
            .filter(|a| in_scope(a, scope))
            .map(|a| a.device_id.clone())
            .collect()
    }

    /// Derives the ownership mapping from live rows.
    ///
    /// Only rows with a resolved owner contribute; rows without one carry
    /// no ownership fact worth persisting.
    #[must_use]
    pub fn derive_assignments(&self) -> AssignmentMapping {
        let mut mapping = AssignmentMapping::new();
        for account in self.accounts.read().values() {
            if let Some(owner) = account.owner {
                mapping.insert(account.device_id.clone(), &account.handle, owner);
            }
        }
        mapping
    }

    /// Replaces the rows in `scope` with `rows` and persists the snapshot.
    ///
    /// For [`Scope::AllResellers`] every row is swapped out. For a single
    /// reseller only that reseller's rows are dropped first; rows owned by
    /// others, and unowned rows, are left alone.
    ///
    /// # Errors
    ///
    /// Returns an error if persisting the snapshot fails.
    pub fn replace(&self, scope: Scope, rows: Vec<Account>) -> StoreResult<()> {
        let mut accounts = self.accounts.write();

        match scope {
            Scope::AllResellers => accounts.clear(),
            Scope::Reseller(id) => {
                accounts.retain(|_, a| a.owner != Some(id));
            }
        }

        for account in rows {
            accounts.insert(account.device_id.clone(), account);
        }

        self.persist(&accounts)
    }

    /// Inserts or updates one row and persists the snapshot.
    ///
    /// # Errors
    ///
    /// Returns an error if persisting the snapshot fails.
    pub fn upsert(&self, account: Account) -> StoreResult<()> {
        let mut accounts = self.accounts.write();
        accounts.insert(account.device_id.clone(), account);
        self.persist(&accounts)
    }

    /// Removes one row, returning it, and persists the snapshot.
    ///
    /// # Errors
    ///
    /// Returns an error if persisting the snapshot fails.
    pub fn remove(&self, device: &DeviceId) -> StoreResult<Option<Account>> {
        let mut accounts = self.accounts.write();
        let removed = accounts.remove(device);
        if removed.is_some() {
            self.persist(&accounts)?;
        }
        Ok(removed)
    }

    fn persist(&self, accounts: &BTreeMap<DeviceId, Account>) -> StoreResult<()> {
        let doc = MirrorDocument {
            version: DOC_VERSION,
            saved_at: now_millis(),
            accounts: accounts.values().cloned().collect(),
        };
        let bytes = codec::to_cbor(&doc)?;
        self.dir.save_document(MIRROR_FILE, &bytes)
    }
}

fn in_scope(account: &Account, scope: Scope) -> bool {
    match scope {
        Scope::AllResellers => true,
        Scope::Reseller(id) => account.owner == Some(id),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use midpanel_core::ResellerId;
    use tempfile::tempdir;

    fn device(n: u8) -> DeviceId {
        DeviceId::parse(&format!("00:1A:79:00:00:{n:02X}")).unwrap()
    }

    fn account(n: u8, owner: Option<u64>) -> Account {
        Account {
            device_id: device(n),
            handle: format!("sub{n:03}"),
            full_name: format!("Subscriber {n}"),
            phone: String::new(),
            email: String::new(),
            plan: None,
            expires_at: None,
            active: true,
            owner: owner.map(ResellerId::new),
            synced_at: 0,
        }
    }

    fn open_mirror(path: &std::path::Path) -> MirrorStore {
        let dir = Arc::new(PanelDir::open(path, true).unwrap());
        MirrorStore::open(dir).unwrap()
    }

    #[test]
    fn starts_empty() {
        let temp = tempdir().unwrap();
        let mirror = open_mirror(&temp.path().join("m"));
        assert!(mirror.is_empty());
        assert_eq!(mirror.len(), 0);
    }

    #[test]
    fn replace_all_swaps_every_row() {
        let temp = tempdir().unwrap();
        let mirror = open_mirror(&temp.path().join("m"));

        mirror
            .replace(Scope::AllResellers, vec![account(1, Some(1)), account(2, Some(2))])
            .unwrap();
        assert_eq!(mirror.len(), 2);

        mirror
            .replace(Scope::AllResellers, vec![account(3, Some(1))])
            .unwrap();
        assert_eq!(mirror.len(), 1);
        assert!(mirror.get(&device(1)).is_none());
        assert!(mirror.get(&device(3)).is_some());
    }

    #[test]
    fn scoped_replace_leaves_other_owners_alone() {
        let temp = tempdir().unwrap();
        let mirror = open_mirror(&temp.path().join("m"));

        mirror
            .replace(
                Scope::AllResellers,
                vec![account(1, Some(1)), account(2, Some(2)), account(3, None)],
            )
            .unwrap();

        // Rebuild reseller 1 with a different device.
        mirror
            .replace(Scope::Reseller(ResellerId::new(1)), vec![account(4, Some(1))])
            .unwrap();

        assert!(mirror.get(&device(1)).is_none());
        assert!(mirror.get(&device(2)).is_some());
        assert!(mirror.get(&device(3)).is_some());
        assert!(mirror.get(&device(4)).is_some());
    }

    #[test]
    fn scope_filters_reads() {
        let temp = tempdir().unwrap();
        let mirror = open_mirror(&temp.path().join("m"));

        mirror
            .replace(
                Scope::AllResellers,
                vec![account(1, Some(1)), account(2, Some(2)), account(3, None)],
            )
            .unwrap();

        assert_eq!(mirror.accounts(Scope::AllResellers).len(), 3);
        let owned = mirror.accounts(Scope::Reseller(ResellerId::new(1)));
        assert_eq!(owned.len(), 1);
        assert_eq!(owned[0].device_id, device(1));

        let ids = mirror.device_ids(Scope::Reseller(ResellerId::new(2)));
        assert!(ids.contains(&device(2)));
        assert_eq!(ids.len(), 1);
    }

    #[test]
    fn derive_assignments_skips_unowned_rows() {
        let temp = tempdir().unwrap();
        let mirror = open_mirror(&temp.path().join("m"));

        mirror
            .replace(
                Scope::AllResellers,
                vec![account(1, Some(7)), account(2, None)],
            )
            .unwrap();

        let mapping = mirror.derive_assignments();
        assert_eq!(mapping.by_device.len(), 1);
        assert_eq!(
            mapping.resolve(&device(1), "sub001"),
            Some(ResellerId::new(7))
        );
        assert_eq!(mapping.resolve(&device(2), "sub002"), None);
    }

    #[test]
    fn snapshot_survives_reopen() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("m");

        {
            let mirror = open_mirror(&path);
            mirror
                .replace(Scope::AllResellers, vec![account(1, Some(1))])
                .unwrap();
        }

        let mirror = open_mirror(&path);
        assert_eq!(mirror.len(), 1);
        assert_eq!(mirror.get(&device(1)).unwrap().handle, "sub001");
    }

    #[test]
    fn find_by_handle_and_remove() {
        let temp = tempdir().unwrap();
        let mirror = open_mirror(&temp.path().join("m"));

        mirror.upsert(account(5, Some(1))).unwrap();
        assert!(mirror.find_by_handle("sub005").is_some());
        assert!(mirror.find_by_handle("missing").is_none());

        let removed = mirror.remove(&device(5)).unwrap();
        assert!(removed.is_some());
        assert!(mirror.remove(&device(5)).unwrap().is_none());
        assert!(mirror.is_empty());
    }
}
