//! Cache key construction.
//!
//! Stored keys follow the Redis key-space convention `"{prefix}:{key}"`.
//! Keys are never escaped; the separator is reserved for the namespace
//! boundary and must not appear in a prefix.

use crate::error::{Error, Result};

/// Separator between the namespace prefix and the entity key.
pub const KEY_SEPARATOR: char = ':';

/// Builds and inspects stored cache keys.
pub struct CacheKeyBuilder;

impl CacheKeyBuilder {
    /// Build a stored key: `"{prefix}:{key}"`.
    ///
    /// # Example
    ///
    /// ```
    /// use readthrough_cache::key::CacheKeyBuilder;
    ///
    /// assert_eq!(CacheKeyBuilder::build("prefix", "1_James"), "prefix:1_James");
    /// ```
    pub fn build(prefix: &str, key: &str) -> String {
        let mut out = String::with_capacity(prefix.len() + key.len() + 1);
        out.push_str(prefix);
        out.push(KEY_SEPARATOR);
        out.push_str(key);
        out
    }

    /// Glob pattern matching every key in a namespace, for `SCAN MATCH`.
    pub fn pattern(prefix: &str) -> String {
        Self::build(prefix, "*")
    }

    /// Split a stored key into `(prefix, key)` at the first separator.
    ///
    /// Since prefixes never contain the separator, the remainder is the
    /// caller's key verbatim even if it contains `:` itself.
    pub fn split(stored_key: &str) -> Option<(&str, &str)> {
        stored_key.split_once(KEY_SEPARATOR)
    }

    /// Check that a prefix can delimit a namespace unambiguously.
    ///
    /// # Errors
    ///
    /// Returns `Error::ConfigError` for an empty prefix or one containing
    /// the separator.
    pub fn validate_prefix(prefix: &str) -> Result<()> {
        if prefix.is_empty() {
            return Err(Error::ConfigError("cache prefix must not be empty".to_string()));
        }
        if prefix.contains(KEY_SEPARATOR) {
            return Err(Error::ConfigError(format!(
                "cache prefix {:?} must not contain the key separator '{}'",
                prefix, KEY_SEPARATOR
            )));
        }
        Ok(())
    }
}
