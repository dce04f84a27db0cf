//! Durable write intents.
//!
//! Before the coordinator writes a create to the secondary it journals an
//! intent: "this device is about to exist on the secondary". If the process
//! dies between the secondary create and the primary create, the intent is
//! the only evidence that the replicas disagree. [`IntentJournal::pending`]
//! lists such dangling intents after a restart, and the coordinator's
//! recovery sweep issues the compensating deletes they still owe.
//!
//! Records share the framing of the ledger journal: one CBOR payload per
//! frame, tagged with a kind byte.

use midpanel_core::{now_millis, DeviceId};
use midpanel_store::{codec, Journal, PanelDir, StoreError, StoreResult};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;
use uuid::Uuid;

/// Kind byte for each intent record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
enum IntentRecordKind {
    Opened = 1,
    Completed = 2,
    Abandoned = 3,
}

impl IntentRecordKind {
    fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            1 => Some(IntentRecordKind::Opened),
            2 => Some(IntentRecordKind::Completed),
            3 => Some(IntentRecordKind::Abandoned),
            _ => None,
        }
    }

    fn as_byte(self) -> u8 {
        self as u8
    }
}

/// One still-open write intent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteIntent {
    /// Journal-unique identifier.
    pub id: Uuid,
    /// Device the create targets; also the key a compensating delete uses.
    pub device: DeviceId,
    /// Handle the create targets, for operator-facing listings.
    pub handle: String,
    /// When the intent was opened, epoch milliseconds.
    pub opened_at: u64,
}

#[derive(Debug, Serialize, Deserialize)]
struct Closure {
    id: Uuid,
    at: u64,
}

#[derive(Debug)]
enum IntentRecord {
    Opened(WriteIntent),
    Completed(Closure),
    Abandoned(Closure),
}

impl IntentRecord {
    fn kind(&self) -> IntentRecordKind {
        match self {
            IntentRecord::Opened(_) => IntentRecordKind::Opened,
            IntentRecord::Completed(_) => IntentRecordKind::Completed,
            IntentRecord::Abandoned(_) => IntentRecordKind::Abandoned,
        }
    }

    fn encode_payload(&self) -> StoreResult<Vec<u8>> {
        match self {
            IntentRecord::Opened(intent) => codec::to_cbor(intent),
            IntentRecord::Completed(closure) | IntentRecord::Abandoned(closure) => {
                codec::to_cbor(closure)
            }
        }
    }

    fn decode_payload(kind: u8, payload: &[u8]) -> StoreResult<Self> {
        let kind = IntentRecordKind::from_byte(kind)
            .ok_or_else(|| StoreError::corrupted(format!("unknown intent record kind {kind}")))?;
        Ok(match kind {
            IntentRecordKind::Opened => IntentRecord::Opened(codec::from_cbor(payload)?),
            IntentRecordKind::Completed => IntentRecord::Completed(codec::from_cbor(payload)?),
            IntentRecordKind::Abandoned => IntentRecord::Abandoned(codec::from_cbor(payload)?),
        })
    }
}

/// Append-only journal of write intents with an in-memory pending set.
pub struct IntentJournal {
    journal: Journal,
    pending: RwLock<BTreeMap<Uuid, WriteIntent>>,
}

impl IntentJournal {
    /// Opens the intent journal inside a panel directory, replaying it to
    /// rebuild the pending set.
    ///
    /// # Errors
    ///
    /// Returns an error if the journal cannot be opened or a frame is
    /// corrupt.
    pub fn open(dir: &PanelDir) -> StoreResult<Self> {
        let journal = Journal::open_file(&dir.intents_path(), true)?;

        let mut pending = BTreeMap::new();
        journal.for_each(|_, frame| {
            match IntentRecord::decode_payload(frame.kind, &frame.payload)? {
                IntentRecord::Opened(intent) => {
                    pending.insert(intent.id, intent);
                }
                IntentRecord::Completed(closure) | IntentRecord::Abandoned(closure) => {
                    pending.remove(&closure.id);
                }
            }
            Ok(true)
        })?;

        debug!(pending = pending.len(), "intent journal replayed");

        Ok(Self {
            journal,
            pending: RwLock::new(pending),
        })
    }

    /// Journals a new intent and returns its identifier.
    ///
    /// # Errors
    ///
    /// Returns an error if the append fails; nothing is pending in that
    /// case.
    pub fn begin(&self, device: &DeviceId, handle: &str) -> StoreResult<Uuid> {
        let intent = WriteIntent {
            id: Uuid::new_v4(),
            device: device.clone(),
            handle: handle.to_owned(),
            opened_at: now_millis(),
        };
        let id = intent.id;

        self.append(&IntentRecord::Opened(intent.clone()))?;
        self.pending.write().insert(id, intent);
        Ok(id)
    }

    /// Marks an intent complete: the create landed on every endpoint.
    ///
    /// # Errors
    ///
    /// Returns an error if the append fails.
    pub fn complete(&self, id: Uuid) -> StoreResult<()> {
        self.close(id, false)
    }

    /// Marks an intent abandoned: the write never happened, or its
    /// compensation succeeded, so there is nothing left to sweep.
    ///
    /// # Errors
    ///
    /// Returns an error if the append fails.
    pub fn abandon(&self, id: Uuid) -> StoreResult<()> {
        self.close(id, true)
    }

    fn close(&self, id: Uuid, abandoned: bool) -> StoreResult<()> {
        let closure = Closure {
            id,
            at: now_millis(),
        };
        let record = if abandoned {
            IntentRecord::Abandoned(closure)
        } else {
            IntentRecord::Completed(closure)
        };
        self.append(&record)?;
        self.pending.write().remove(&id);
        Ok(())
    }

    /// Intents that were opened but never closed, ordered by identifier.
    pub fn pending(&self) -> Vec<WriteIntent> {
        self.pending.read().values().cloned().collect()
    }

    /// Number of still-open intents.
    pub fn pending_len(&self) -> usize {
        self.pending.read().len()
    }

    fn append(&self, record: &IntentRecord) -> StoreResult<()> {
        let payload = record.encode_payload()?;
        self.journal.append(record.kind().as_byte(), &payload)?;
        Ok(())
    }
}

impl std::fmt::Debug for IntentJournal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IntentJournal")
            .field("pending", &self.pending.read().len())
            .finish_non_exhaustive()
    }
}

/// One intent examined by the recovery sweep.
#[derive(Debug, Clone)]
pub struct RecoveredIntent {
    /// The dangling intent.
    pub intent: WriteIntent,
    /// What the sweep did about it.
    pub outcome: RecoveryOutcome,
}

/// Result of sweeping one dangling intent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecoveryOutcome {
    /// The compensating delete went through (or nothing was left to
    /// delete); the intent is closed.
    Swept,
    /// The intent is still open and will be retried on the next sweep.
    StillPending {
        /// Why the sweep could not close it.
        reason: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn device() -> DeviceId {
        DeviceId::parse("00:1A:79:00:00:01").unwrap()
    }

    #[test]
    fn begin_then_complete_leaves_nothing_pending() {
        let temp = TempDir::new().unwrap();
        let dir = PanelDir::open(&temp.path().join("p"), true).unwrap();
        let journal = IntentJournal::open(&dir).unwrap();

        let id = journal.begin(&device(), "sub001").unwrap();
        assert_eq!(journal.pending_len(), 1);

        journal.complete(id).unwrap();
        assert_eq!(journal.pending_len(), 0);
    }

    #[test]
    fn unclosed_intent_survives_reopen() {
        let temp = TempDir::new().unwrap();
        let dir = PanelDir::open(&temp.path().join("p"), true).unwrap();

        let id = {
            let journal = IntentJournal::open(&dir).unwrap();
            journal.begin(&device(), "sub001").unwrap()
        };

        let journal = IntentJournal::open(&dir).unwrap();
        let pending = journal.pending();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, id);
        assert_eq!(pending[0].device, device());
        assert_eq!(pending[0].handle, "sub001");
    }

    #[test]
    fn closed_intents_stay_closed_after_reopen() {
        let temp = TempDir::new().unwrap();
        let dir = PanelDir::open(&temp.path().join("p"), true).unwrap();

        {
            let journal = IntentJournal::open(&dir).unwrap();
            let completed = journal.begin(&device(), "sub001").unwrap();
            journal.complete(completed).unwrap();
            let abandoned = journal.begin(&device(), "sub002").unwrap();
            journal.abandon(abandoned).unwrap();
        }

        let journal = IntentJournal::open(&dir).unwrap();
        assert_eq!(journal.pending_len(), 0);
    }

    #[test]
    fn unknown_record_kind_is_corruption() {
        let err = IntentRecord::decode_payload(99, &[]).unwrap_err();
        assert!(err.to_string().contains("unknown intent record kind"));
    }
}
