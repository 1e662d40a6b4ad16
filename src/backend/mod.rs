//! Storage backends for cached values.
//!
//! A backend is a plain byte store with server-side expiry. The read-through
//! logic lives in [`crate::cache::ReadThroughCache`]; backends only move
//! bytes and classify their own failures as connectivity or application
//! errors (see [`crate::error::StoreErrorKind`]).

use crate::error::Result;
use std::future::Future;
use std::time::Duration;

#[cfg(feature = "inmemory")]
mod inmemory;
#[cfg(feature = "redis")]
mod redis;

#[cfg(feature = "inmemory")]
pub use inmemory::InMemoryBackend;
#[cfg(feature = "redis")]
pub use self::redis::{RedisBackend, RedisConfig};

/// Key-value store used by the cache.
///
/// Implementations must be safe for concurrent use; the cache shares one
/// backend across all callers.
pub trait CacheBackend: Send + Sync + 'static {
    /// Fetch the bytes stored under `key`.
    ///
    /// Returns `Ok(None)` on a true miss.
    fn get(&self, key: &str) -> impl Future<Output = Result<Option<Vec<u8>>>> + Send;

    /// Store `value` under `key`, expiring after `ttl`.
    fn set(&self, key: &str, value: Vec<u8>, ttl: Duration)
        -> impl Future<Output = Result<()>> + Send;

    /// Remove `key`. Removing a missing key succeeds.
    fn delete(&self, key: &str) -> impl Future<Output = Result<()>> + Send;

    /// Round-trip to the store to prove it is reachable.
    fn ping(&self) -> impl Future<Output = Result<()>> + Send;

    /// Release the underlying connections.
    fn close(&self) -> impl Future<Output = Result<()>> + Send;

    /// Human-readable address of the store, for logs.
    fn address(&self) -> String;
}
