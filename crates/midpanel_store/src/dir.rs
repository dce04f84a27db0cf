//! Panel data directory management.
//!
//! The LOCK file ensures only one panel process writes to a data directory
//! at a time. Documents (ASSIGNMENTS, MIRROR, RESELLERS) are replaced
//! atomically with a write-temp-then-rename; journals are opened by path
//! and append in place.

use crate::error::{StoreError, StoreResult};
use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

const LOCK_FILE: &str = "LOCK";
const LEDGER_FILE: &str = "ledger.log";
const INTENTS_FILE: &str = "intents.log";
/// Suffix for in-flight document writes.
const TEMP_SUFFIX: &str = ".tmp";

/// Document file name for the assignment mapping.
pub const ASSIGNMENTS_FILE: &str = "ASSIGNMENTS";
/// Document file name for the account mirror.
pub const MIRROR_FILE: &str = "MIRROR";
/// Document file name for the reseller directory.
pub const RESELLERS_FILE: &str = "RESELLERS";

/// Manages the panel directory structure and its advisory lock.
///
/// Only one `PanelDir` instance can exist per directory at a time; the
/// exclusive lock is held until the value is dropped.
#[derive(Debug)]
pub struct PanelDir {
    path: PathBuf,
    // Advisory lock; fs2 releases it when the handle closes on drop.
    _lock_file: File,
}

impl PanelDir {
    /// Opens or creates a panel data directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory is missing and `create_if_missing`
    /// is false, if another process holds the lock (`Locked`), or on I/O
    /// failure.
    pub fn open(path: &Path, create_if_missing: bool) -> StoreResult<Self> {
        if !path.exists() {
            if create_if_missing {
                fs::create_dir_all(path)?;
            } else {
                return Err(StoreError::invalid_document(format!(
                    "panel directory does not exist: {}",
                    path.display()
                )));
            }
        }

        if !path.is_dir() {
            return Err(StoreError::invalid_document(format!(
                "path is not a directory: {}",
                path.display()
            )));
        }

        let lock_path = path.join(LOCK_FILE);
        let lock_file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&lock_path)?;

        if lock_file.try_lock_exclusive().is_err() {
            return Err(StoreError::Locked);
        }

        Ok(Self {
            path: path.to_path_buf(),
            _lock_file: lock_file,
        })
    }

    /// Returns the panel directory path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the path to the financial journal.
    #[must_use]
    pub fn ledger_path(&self) -> PathBuf {
        self.path.join(LEDGER_FILE)
    }

    /// Returns the path to the write-intent journal.
    #[must_use]
    pub fn intents_path(&self) -> PathBuf {
        self.path.join(INTENTS_FILE)
    }

    /// Loads a document by file name.
    ///
    /// Returns `None` if the document does not exist yet.
    ///
    /// # Errors
    ///
    /// Returns an error on I/O failure.
    pub fn load_document(&self, name: &str) -> StoreResult<Option<Vec<u8>>> {
        let doc_path = self.path.join(name);

        if !doc_path.exists() {
            return Ok(None);
        }

        let mut file = File::open(&doc_path)?;
        let mut data = Vec::new();
        file.read_to_end(&mut data)?;

        if data.is_empty() {
            return Ok(None);
        }

        Ok(Some(data))
    }

    /// Saves a document atomically.
    ///
    /// Write-then-rename for crash safety:
    /// 1. Write to `<name>.tmp`
    /// 2. Sync the temp file
    /// 3. Rename over `<name>`
    /// 4. Fsync the directory so the rename is durable
    ///
    /// # Errors
    ///
    /// Returns an error on I/O failure.
    pub fn save_document(&self, name: &str, data: &[u8]) -> StoreResult<()> {
        let doc_path = self.path.join(name);
        let temp_path = self.path.join(format!("{name}{TEMP_SUFFIX}"));

        let mut file = File::create(&temp_path)?;
        file.write_all(data)?;
        file.sync_all()?;
        drop(file);

        fs::rename(&temp_path, &doc_path)?;
        self.sync_directory()?;

        Ok(())
    }

    /// Fsyncs the panel directory so renames and creations are durable.
    #[cfg(unix)]
    fn sync_directory(&self) -> StoreResult<()> {
        let dir = File::open(&self.path)?;
        dir.sync_all()?;
        Ok(())
    }

    #[cfg(not(unix))]
    fn sync_directory(&self) -> StoreResult<()> {
        // NTFS journaling covers metadata durability; no directory fsync.
        Ok(())
    }

    /// Returns true if nothing has been persisted here yet.
    #[must_use]
    pub fn is_new_panel(&self) -> bool {
        !self.path.join(MIRROR_FILE).exists()
            && !self.path.join(ASSIGNMENTS_FILE).exists()
            && !self.ledger_path().exists()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn open_creates_directory() {
        let temp = tempdir().unwrap();
        let panel_path = temp.path().join("panel");

        assert!(!panel_path.exists());
        let dir = PanelDir::open(&panel_path, true).unwrap();
        assert!(panel_path.is_dir());
        assert!(dir.is_new_panel());
    }

    #[test]
    fn open_fails_if_missing_and_no_create() {
        let temp = tempdir().unwrap();
        let result = PanelDir::open(&temp.path().join("nope"), false);
        assert!(result.is_err());
    }

    #[test]
    fn lock_prevents_second_open() {
        let temp = tempdir().unwrap();
        let panel_path = temp.path().join("locked");

        let _dir1 = PanelDir::open(&panel_path, true).unwrap();
        let result = PanelDir::open(&panel_path, true);
        assert!(matches!(result, Err(StoreError::Locked)));
    }

    #[test]
    fn lock_released_on_drop() {
        let temp = tempdir().unwrap();
        let panel_path = temp.path().join("reopen");

        {
            let _dir = PanelDir::open(&panel_path, true).unwrap();
        }
        let _dir2 = PanelDir::open(&panel_path, true).unwrap();
    }

    #[test]
    fn document_round_trip() {
        let temp = tempdir().unwrap();
        let dir = PanelDir::open(&temp.path().join("docs"), true).unwrap();

        assert!(dir.load_document(ASSIGNMENTS_FILE).unwrap().is_none());

        dir.save_document(ASSIGNMENTS_FILE, b"mapping-bytes").unwrap();
        let loaded = dir.load_document(ASSIGNMENTS_FILE).unwrap().unwrap();
        assert_eq!(loaded, b"mapping-bytes");

        // Overwrite replaces wholesale.
        dir.save_document(ASSIGNMENTS_FILE, b"v2").unwrap();
        assert_eq!(dir.load_document(ASSIGNMENTS_FILE).unwrap().unwrap(), b"v2");
    }

    #[test]
    fn paths_are_under_the_panel_dir() {
        let temp = tempdir().unwrap();
        let panel_path = temp.path().join("paths");
        let dir = PanelDir::open(&panel_path, true).unwrap();

        assert_eq!(dir.ledger_path(), panel_path.join("ledger.log"));
        assert_eq!(dir.intents_path(), panel_path.join("intents.log"));
    }
}
