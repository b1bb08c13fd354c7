//! JSON codec for cached record collections.
//!
//! A collection is stored as a JSON array of objects. Encoding happens
//! entirely in memory before any write, so a cache entry is either a full
//! document or absent. Decoding is strict: truncated documents and
//! type-mismatched fields are rejected instead of yielding a partial list.

use crate::error::CodecError;
use crate::record::{CacheableRecord, RecordCollection};

/// Encoder/decoder for the cached text representation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JsonCodec;

impl JsonCodec {
    pub fn new() -> Self {
        Self
    }

    /// Encode a collection into a single JSON document.
    pub fn encode<T: CacheableRecord>(&self, records: &[T]) -> Result<String, CodecError> {
        serde_json::to_string(records).map_err(|e| CodecError::Encode {
            reason: e.to_string(),
        })
    }

    /// Decode a JSON document read from `key`.
    ///
    /// `key` only feeds the error message.
    pub fn decode<T: CacheableRecord>(
        &self,
        key: &str,
        encoded: &str,
    ) -> Result<RecordCollection<T>, CodecError> {
        serde_json::from_str(encoded).map_err(|e| CodecError::Decode {
            key: key.to_string(),
            reason: e.to_string(),
        })
    }
}
