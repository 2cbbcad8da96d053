//! MessagePack encoding for record payloads.
//!
//! All payloads are encoded as maps keyed by field name (`to_vec_named`)
//! rather than positional tuples. A reader that does not know a field skips
//! it, and optional fields can be omitted entirely, which is what keeps the
//! schema stable across versions.

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

/// Errors produced while encoding or decoding a record payload.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("failed to encode record: {0}")]
    Encode(String),

    #[error("failed to decode record: {0}")]
    Decode(String),
}

/// Encode a record payload as a named-field MessagePack map.
pub fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, CodecError> {
    rmp_serde::to_vec_named(value).map_err(|e| CodecError::Encode(e.to_string()))
}

/// Decode a record payload from MessagePack bytes.
pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, CodecError> {
    rmp_serde::from_slice(bytes).map_err(|e| CodecError::Decode(e.to_string()))
}
