//! # midpanel store
//!
//! Local persistence for the panel: the data directory, the framed
//! append-only journal, and the document stores built on top of them.
//!
//! ## Layout on disk
//!
//! ```text
//! <panel_dir>/
//! ├─ LOCK              # Advisory lock, single panel process
//! ├─ ASSIGNMENTS       # Versioned CBOR document, device/handle ownership
//! ├─ MIRROR            # Versioned CBOR document, upstream account mirror
//! ├─ RESELLERS         # Versioned CBOR document, reseller directory
//! ├─ ledger.log        # Append-only financial journal
//! └─ intents.log       # Append-only write-intent journal
//! ```
//!
//! Documents are replaced atomically (write temp, fsync, rename, fsync
//! directory). Journals are append-only with a per-frame CRC; a torn tail
//! from a crash mid-append is discarded on replay, while a failed checksum
//! on an earlier frame refuses to open the store.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod assignment;
mod backend;
pub mod codec;
mod dir;
mod error;
mod file;
mod journal;
mod locks;
mod memory;
mod mirror;
mod resellers;

pub use assignment::{AssignmentMapping, AssignmentStore};
pub use backend::StorageBackend;
pub use dir::PanelDir;
pub use error::{StoreError, StoreResult};
pub use file::FileBackend;
pub use journal::{Journal, JournalFrame, JournalIter};
pub use locks::{ScopeGuard, ScopeLocks};
pub use memory::MemoryBackend;
pub use mirror::MirrorStore;
pub use resellers::ResellerDirectory;
