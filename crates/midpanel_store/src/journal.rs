//! Framed append-only journal.
//!
//! Frame format:
//!
//! ```text
//! | magic (4) | version (2) | kind (1) | length (4) | payload (N) | crc32 (4) |
//! ```
//!
//! The journal does not interpret payloads; callers tag each frame with a
//! kind byte and decode the payload themselves. Replay tolerates a torn
//! tail (a crash mid-append before the flush completed) by treating it as
//! the end of the log, but a checksum failure or bad magic on an earlier
//! frame is real corruption and aborts the replay.

use crate::backend::StorageBackend;
use crate::error::{StoreError, StoreResult};
use parking_lot::{Mutex, MutexGuard};
use std::path::Path;

/// Magic bytes identifying a journal frame.
pub const JOURNAL_MAGIC: [u8; 4] = *b"MPJL";

/// Current journal format version.
pub const JOURNAL_VERSION: u16 = 1;

/// Header size: magic (4) + version (2) + kind (1) + length (4).
const HEADER_SIZE: usize = 11;

/// CRC size.
const CRC_SIZE: usize = 4;

/// Largest payload a frame can carry (the length field is 4 bytes).
pub const MAX_PAYLOAD_SIZE: usize = u32::MAX as usize;

/// Computes the CRC32 checksum (IEEE polynomial) of `data`.
pub fn compute_crc32(data: &[u8]) -> u32 {
    const CRC32_TABLE: [u32; 256] = {
        let mut table = [0u32; 256];
        let mut i = 0;
        while i < 256 {
            let mut crc = i as u32;
            let mut j = 0;
            while j < 8 {
                if crc & 1 != 0 {
                    crc = (crc >> 1) ^ 0xEDB8_8320;
                } else {
                    crc >>= 1;
                }
                j += 1;
            }
            table[i] = crc;
            i += 1;
        }
        table
    };

    let mut crc = 0xFFFF_FFFF_u32;
    for &byte in data {
        let index = ((crc ^ u32::from(byte)) & 0xFF) as usize;
        crc = (crc >> 8) ^ CRC32_TABLE[index];
    }
    !crc
}

/// One decoded journal frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JournalFrame {
    /// Caller-defined kind byte.
    pub kind: u8,
    /// Opaque payload bytes.
    pub payload: Vec<u8>,
}

/// An append-only framed log over a storage backend.
pub struct Journal {
    backend: Mutex<Box<dyn StorageBackend>>,
    sync_on_write: bool,
}

impl Journal {
    /// Creates a journal over an existing backend.
    pub fn new(backend: Box<dyn StorageBackend>, sync_on_write: bool) -> Self {
        Self {
            backend: Mutex::new(backend),
            sync_on_write,
        }
    }

    /// Opens a file-backed journal at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened.
    pub fn open_file(path: &Path, sync_on_write: bool) -> StoreResult<Self> {
        let backend = crate::file::FileBackend::open(path)?;
        Ok(Self::new(Box::new(backend), sync_on_write))
    }

    /// Appends one frame, returning the offset it was written at.
    ///
    /// # Errors
    ///
    /// Returns an error if the payload exceeds [`MAX_PAYLOAD_SIZE`] or the
    /// write fails.
    pub fn append(&self, kind: u8, payload: &[u8]) -> StoreResult<u64> {
        let len = u32::try_from(payload.len())
            .map_err(|_| StoreError::corrupted("journal payload too large"))?;

        let mut data = Vec::with_capacity(HEADER_SIZE + payload.len() + CRC_SIZE);
        data.extend_from_slice(&JOURNAL_MAGIC);
        data.extend_from_slice(&JOURNAL_VERSION.to_le_bytes());
        data.push(kind);
        data.extend_from_slice(&len.to_le_bytes());
        data.extend_from_slice(payload);

        let crc = compute_crc32(&data);
        data.extend_from_slice(&crc.to_le_bytes());

        let mut backend = self.backend.lock();
        let offset = backend.append(&data)?;

        if self.sync_on_write {
            backend.flush()?;
        }

        Ok(offset)
    }

    /// Flushes pending writes.
    ///
    /// # Errors
    ///
    /// Returns an error if the flush fails.
    pub fn flush(&self) -> StoreResult<()> {
        self.backend.lock().flush()
    }

    /// Returns the current journal size in bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the size cannot be determined.
    pub fn size(&self) -> StoreResult<u64> {
        self.backend.lock().size()
    }

    /// Returns a streaming iterator over frames from the start of the log.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend size cannot be determined.
    pub fn iter(&self) -> StoreResult<JournalIter<'_>> {
        let backend = self.backend.lock();
        JournalIter::new(backend)
    }

    /// Replays every frame through `callback`. The callback returns
    /// `Ok(true)` to continue or `Ok(false)` to stop early.
    ///
    /// # Errors
    ///
    /// Returns an error if reading fails or the callback errors.
    pub fn for_each<F>(&self, mut callback: F) -> StoreResult<()>
    where
        F: FnMut(u64, JournalFrame) -> StoreResult<bool>,
    {
        for result in self.iter()? {
            let (offset, frame) = result?;
            if !callback(offset, frame)? {
                break;
            }
        }
        Ok(())
    }
}

impl std::fmt::Debug for Journal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Journal")
            .field("sync_on_write", &self.sync_on_write)
            .finish_non_exhaustive()
    }
}

/// Streaming iterator over journal frames.
///
/// Holds the journal's backend lock for its lifetime, so no frame can be
/// appended while a replay is in progress.
pub struct JournalIter<'a> {
    backend: MutexGuard<'a, Box<dyn StorageBackend>>,
    total_size: u64,
    offset: u64,
    finished: bool,
}

impl<'a> JournalIter<'a> {
    fn new(backend: MutexGuard<'a, Box<dyn StorageBackend>>) -> StoreResult<Self> {
        let total_size = backend.size()?;
        Ok(Self {
            backend,
            total_size,
            offset: 0,
            finished: false,
        })
    }

    fn read_next(&mut self) -> StoreResult<Option<(u64, JournalFrame)>> {
        if self.finished {
            return Ok(None);
        }

        let frame_start = self.offset;

        // Truncated header is a torn tail, not corruption.
        if frame_start + HEADER_SIZE as u64 > self.total_size {
            self.finished = true;
            return Ok(None);
        }

        let header = self.backend.read_at(frame_start, HEADER_SIZE)?;

        if header[0..4] != JOURNAL_MAGIC {
            self.finished = true;
            return Err(StoreError::corrupted(format!(
                "invalid magic at offset {frame_start}"
            )));
        }

        let version = u16::from_le_bytes([header[4], header[5]]);
        if version > JOURNAL_VERSION {
            self.finished = true;
            return Err(StoreError::corrupted(format!(
                "unsupported version {version} at offset {frame_start}"
            )));
        }

        let kind = header[6];
        let payload_len = u32::from_le_bytes([header[7], header[8], header[9], header[10]]) as u64;
        let total_len = HEADER_SIZE as u64 + payload_len + CRC_SIZE as u64;

        // Truncated payload is likewise a torn tail.
        if frame_start + total_len > self.total_size {
            self.finished = true;
            return Ok(None);
        }

        let frame_bytes = self.backend.read_at(frame_start, total_len as usize)?;
        let crc_start = (HEADER_SIZE as u64 + payload_len) as usize;

        let stored = u32::from_le_bytes([
            frame_bytes[crc_start],
            frame_bytes[crc_start + 1],
            frame_bytes[crc_start + 2],
            frame_bytes[crc_start + 3],
        ]);
        let computed = compute_crc32(&frame_bytes[..crc_start]);

        if stored != computed {
            self.finished = true;
            return Err(StoreError::ChecksumMismatch { stored, computed });
        }

        let payload = frame_bytes[HEADER_SIZE..crc_start].to_vec();
        self.offset += total_len;

        Ok(Some((frame_start, JournalFrame { kind, payload })))
    }
}

impl Iterator for JournalIter<'_> {
    type Item = StoreResult<(u64, JournalFrame)>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        match self.read_next() {
            Ok(Some(item)) => Some(Ok(item)),
            Ok(None) => None,
            Err(e) => {
                self.finished = true;
                Some(Err(e))
            }
        }
    }
}
