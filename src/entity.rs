//! Core entity trait that all cached entities must implement.

use serde::{de::DeserializeOwned, Serialize};
use std::fmt::Display;

/// Trait that all entities stored in cache must implement.
///
/// # Example
///
/// ```
/// use serde::{Deserialize, Serialize};
/// use readthrough_cache::CacheEntity;
///
/// #[derive(Clone, Serialize, Deserialize)]
/// pub struct Employment {
///     pub id: String,
///     pub employer_name: String,
/// }
///
/// impl CacheEntity for Employment {
///     type Key = String;
///
///     fn cache_key(&self) -> Self::Key {
///         self.id.clone()
///     }
///
///     fn cache_prefix() -> &'static str {
///         "employment"
///     }
/// }
/// ```
pub trait CacheEntity: Send + Sync + Serialize + DeserializeOwned + 'static {
    /// Type of the entity's key/ID (typically String or an integer).
    type Key: Display;

    /// Return the entity's unique cache key within its namespace.
    ///
    /// Must be non-empty and stable across serialization.
    /// Example: `Employment.id` → `"emp_12345"`
    fn cache_key(&self) -> Self::Key;

    /// Return the cache prefix for this entity type.
    ///
    /// Used to namespace cache keys and captured once when a cache is built.
    /// Must not contain `':'`. Final cache key format: `"{prefix}:{key}"`
    fn cache_prefix() -> &'static str;
}
