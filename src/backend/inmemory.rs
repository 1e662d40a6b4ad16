//! In-process backend for tests and local development.

use super::CacheBackend;
use crate::error::{Error, Result};
use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

struct Entry {
    value: Vec<u8>,
    expires_at: Instant,
}

/// DashMap-backed store that honours TTLs on read.
///
/// Stands in for the Redis server; it is not a memory tier in front of one.
/// Clones share the same map, so a test can keep a handle for inspection
/// while the cache owns another.
///
/// # Example
///
/// ```
/// # use readthrough_cache::backend::{CacheBackend, InMemoryBackend};
/// # use std::time::Duration;
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> readthrough_cache::Result<()> {
/// let backend = InMemoryBackend::new();
/// backend.set("user:1", b"{}".to_vec(), Duration::from_secs(60)).await?;
/// assert!(backend.get("user:1").await?.is_some());
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Default)]
pub struct InMemoryBackend {
    store: Arc<DashMap<String, Entry>>,
    closed: Arc<AtomicBool>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live (unexpired) entries.
    pub async fn len(&self) -> usize {
        let now = Instant::now();
        self.store.iter().filter(|e| e.expires_at > now).count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Stored keys, unordered. Expired entries are skipped.
    pub fn keys(&self) -> Vec<String> {
        let now = Instant::now();
        self.store
            .iter()
            .filter(|e| e.expires_at > now)
            .map(|e| e.key().clone())
            .collect()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    fn ensure_open(&self) -> Result<()> {
        if self.is_closed() {
            return Err(Error::connectivity("in-memory backend is closed"));
        }
        Ok(())
    }
}

/// Far enough out to never expire in practice.
const FAR_FUTURE: Duration = Duration::from_secs(100 * 365 * 24 * 60 * 60);

/// `now + ttl`, saturating for TTLs too large to represent.
fn expiry_after(ttl: Duration) -> Instant {
    let now = Instant::now();
    now.checked_add(ttl)
        .or_else(|| now.checked_add(FAR_FUTURE))
        .unwrap_or(now)
}

impl CacheBackend for InMemoryBackend {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        self.ensure_open()?;

        let now = Instant::now();
        let value = match self.store.get(key) {
            Some(entry) if entry.expires_at > now => Some(entry.value.clone()),
            _ => None,
        };

        if value.is_none() {
            // Lazily drop the expired entry, if any.
            self.store.remove_if(key, |_, entry| entry.expires_at <= now);
            debug!("InMemory GET {} -> MISS", key);
        } else {
            debug!("InMemory GET {} -> HIT", key);
        }

        Ok(value)
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<()> {
        self.ensure_open()?;

        let entry = Entry {
            value,
            expires_at: expiry_after(ttl),
        };
        self.store.insert(key.to_string(), entry);

        debug!("✓ InMemory SET {} (TTL: {:?})", key, ttl);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.ensure_open()?;

        self.store.remove(key);
        debug!("✓ InMemory DELETE {}", key);
        Ok(())
    }

    async fn ping(&self) -> Result<()> {
        self.ensure_open()
    }

    async fn close(&self) -> Result<()> {
        self.closed.store(true, Ordering::Release);
        self.store.clear();
        Ok(())
    }

    fn address(&self) -> String {
        "memory".to_string()
    }
}
