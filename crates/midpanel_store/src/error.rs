//! Error types for store operations.

use std::io;
use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur in the local persistence layer.
///
/// Store errors are fatal to the operation that hit them; nothing in this
/// workspace retries local I/O.
#[derive(Debug, Error)]
pub enum StoreError {
    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Another process holds the panel directory lock.
    #[error("panel directory is locked by another process")]
    Locked,

    /// Attempted to read beyond the end of a backend.
    #[error("read beyond end of storage: offset {offset}, len {len}, size {size}")]
    ReadPastEnd {
        /// The requested read offset.
        offset: u64,
        /// The requested read length.
        len: usize,
        /// The current storage size.
        size: u64,
    },

    /// A journal frame failed structural validation.
    #[error("journal corrupted: {context}")]
    Corrupted {
        /// What was being parsed when the corruption was found.
        context: String,
    },

    /// A journal frame's checksum did not match its contents.
    #[error("checksum mismatch: stored {stored:#010x}, computed {computed:#010x}")]
    ChecksumMismatch {
        /// CRC stored in the frame.
        stored: u32,
        /// CRC computed over the frame.
        computed: u32,
    },

    /// A persisted document could not be encoded or decoded.
    #[error("invalid document: {0}")]
    InvalidDocument(String),
}

impl StoreError {
    /// Creates a `Corrupted` error.
    pub fn corrupted(context: impl Into<String>) -> Self {
        Self::Corrupted {
            context: context.into(),
        }
    }

    /// Creates an `InvalidDocument` error.
    pub fn invalid_document(message: impl Into<String>) -> Self {
        Self::InvalidDocument(message.into())
    }
}
