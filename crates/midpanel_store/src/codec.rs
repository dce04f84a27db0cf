//! CBOR encoding for documents and journal payloads.
//!
//! Everything the panel persists, document files and journal frame
//! payloads alike, goes through these two functions so the on-disk
//! representation stays uniform.

use crate::error::{StoreError, StoreResult};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Encodes a value to CBOR bytes.
///
/// # Errors
///
/// Returns [`StoreError::InvalidDocument`] if the value cannot be encoded.
pub fn to_cbor<T: Serialize>(value: &T) -> StoreResult<Vec<u8>> {
    let mut buf = Vec::new();
    ciborium::into_writer(value, &mut buf)
        .map_err(|e| StoreError::invalid_document(e.to_string()))?;
    Ok(buf)
}

/// Decodes a value from CBOR bytes.
///
/// # Errors
///
/// Returns [`StoreError::InvalidDocument`] if the bytes do not decode to `T`.
pub fn from_cbor<T: DeserializeOwned>(bytes: &[u8]) -> StoreResult<T> {
    ciborium::from_reader(bytes).map_err(|e| StoreError::invalid_document(e.to_string()))
}
