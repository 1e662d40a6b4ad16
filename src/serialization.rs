//! Value encoding for cache storage.
//!
//! Values are stored as the raw output of a [`CacheSerializer`], with no
//! envelope or version header. Changing an entity's schema therefore calls
//! for a new cache prefix.
//!
//! - [`JsonSerializer`] (default): UTF-8 JSON via `serde_json`, readable with
//!   `redis-cli GET`.
//! - [`PostcardSerializer`]: compact binary via `postcard`.

use crate::error::{Error, Result};
use serde::{de::DeserializeOwned, Serialize};

/// Symmetric encoder/decoder for cached values.
///
/// `decode(encode(v))` must equal `v` under the entity's equality.
pub trait CacheSerializer: Send + Sync + 'static {
    /// Encode a value into bytes for storage.
    ///
    /// # Errors
    ///
    /// Returns `Error::EncodeError` if the value cannot be represented.
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>>;

    /// Decode stored bytes back into a value.
    ///
    /// # Errors
    ///
    /// Returns `Error::DecodeError` if the bytes are corrupt or do not match
    /// the target type.
    fn decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T>;
}

/// JSON serializer.
#[derive(Clone, Copy, Debug, Default)]
pub struct JsonSerializer;

impl CacheSerializer for JsonSerializer {
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>> {
        serde_json::to_vec(value).map_err(|e| Error::EncodeError(e.to_string()))
    }

    fn decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T> {
        serde_json::from_slice(bytes).map_err(|e| Error::DecodeError(e.to_string()))
    }
}

/// Postcard serializer.
///
/// Not self-describing: field order and types are the schema, so entities
/// using `#[serde(skip_serializing_if)]` or `#[serde(flatten)]` should stay
/// on JSON.
#[derive(Clone, Copy, Debug, Default)]
pub struct PostcardSerializer;

impl CacheSerializer for PostcardSerializer {
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>> {
        postcard::to_allocvec(value).map_err(|e| Error::EncodeError(e.to_string()))
    }

    fn decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T> {
        postcard::from_bytes(bytes).map_err(|e| Error::DecodeError(e.to_string()))
    }
}
