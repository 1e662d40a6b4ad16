//! Read-through cache - main entry point for cache operations.
//!
//! # Failure policy
//!
//! | Step | Error | Outcome |
//! |------|-------|---------|
//! | `get` read | any store error, including an unreachable store | treated as a miss, loader runs |
//! | `get` decode | stored bytes do not decode | `Error::DecodeError`, loader is **not** run |
//! | `get` loader | any | returned unchanged, nothing written |
//! | `get` write-back | connectivity-class store error | swallowed, loaded value returned |
//! | `get` write-back | encode error or application-class store error | returned |
//! | `set` | any | returned |
//! | `delete` | per-key errors | every key attempted, failures joined |
//!
//! So when the store is down `get` degrades to a pass-through to the loader
//! while `set` fails loudly, and a corrupt entry fails loudly instead of
//! being silently refilled.

use crate::backend::CacheBackend;
use crate::builder::CacheBuilder;
use crate::context::Context;
use crate::entity::CacheEntity;
use crate::error::{Error, Result};
use crate::key::CacheKeyBuilder;
use crate::loader::CacheLoader;
use crate::observability::CacheMetrics;
use crate::serialization::{CacheSerializer, JsonSerializer};
use futures::future::join_all;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// How the internal write path treats store failures.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum WritePolicy {
    /// Caller asked to persist: every error is returned.
    Strict,
    /// Miss-fill write-back: connectivity errors are swallowed.
    Lenient,
}

/// Typed read-through cache over a [`CacheBackend`].
///
/// Keys are stored as `"{prefix}:{key}"`, with the prefix taken from
/// [`CacheEntity::cache_prefix`] once at construction. Every value is written
/// with the same TTL. The cache is immutable after construction and cheap to
/// clone; clones share the backend, loader and metrics.
///
/// There is no single-flight: concurrent misses on one key each run the
/// loader and each write back, and the last write wins.
///
/// # Example
///
/// ```
/// use readthrough_cache::{backend::InMemoryBackend, CacheEntity, Context, ReadThroughCache, Result};
/// use serde::{Deserialize, Serialize};
/// use std::time::Duration;
///
/// #[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
/// struct User {
///     id: String,
///     name: String,
/// }
///
/// impl CacheEntity for User {
///     type Key = String;
///     fn cache_key(&self) -> Self::Key { self.id.clone() }
///     fn cache_prefix() -> &'static str { "user" }
/// }
///
/// async fn load_user(_ctx: Context, id: String) -> Result<User> {
///     Ok(User { id, name: "from-db".to_string() })
/// }
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<()> {
/// let cache = ReadThroughCache::new(InMemoryBackend::new(), Duration::from_secs(60), load_user)?;
/// let ctx = Context::background();
///
/// let user = cache.get(&ctx, "u1").await?;
/// assert_eq!(user.name, "from-db");
/// assert_eq!(cache.stored_key("u1"), "user:u1");
/// # Ok(())
/// # }
/// ```
pub struct ReadThroughCache<T, B, L, S = JsonSerializer> {
    backend: Arc<B>,
    loader: Arc<L>,
    serializer: Arc<S>,
    metrics: Arc<dyn CacheMetrics>,
    prefix: Arc<str>,
    ttl: Duration,
    _entity: PhantomData<fn() -> T>,
}

impl<T, B, L, S> Clone for ReadThroughCache<T, B, L, S> {
    fn clone(&self) -> Self {
        ReadThroughCache {
            backend: Arc::clone(&self.backend),
            loader: Arc::clone(&self.loader),
            serializer: Arc::clone(&self.serializer),
            metrics: Arc::clone(&self.metrics),
            prefix: Arc::clone(&self.prefix),
            ttl: self.ttl,
            _entity: PhantomData,
        }
    }
}

impl<T, B, L> ReadThroughCache<T, B, L, JsonSerializer>
where
    T: CacheEntity,
    B: CacheBackend,
    L: CacheLoader<T>,
{
    /// Create a JSON-encoded cache without touching the store.
    ///
    /// # Errors
    ///
    /// Returns `Error::ConfigError` if `ttl` is zero or the entity prefix is
    /// empty or contains `':'`.
    pub fn new(backend: B, ttl: Duration, loader: L) -> Result<Self> {
        CacheBuilder::new(backend, loader).ttl(ttl).build()
    }

    /// Create a JSON-encoded cache and verify the store answers a ping.
    ///
    /// The ping is bounded by [`crate::builder::DEFAULT_PROBE_TIMEOUT`]. On
    /// success the returned [`Teardown`] releases the backend.
    ///
    /// # Errors
    ///
    /// Returns `Error::ConfigError` for invalid configuration or when the
    /// ping fails or times out; the backend is closed before returning.
    pub async fn connect(backend: B, ttl: Duration, loader: L) -> Result<(Self, Teardown<B>)> {
        CacheBuilder::new(backend, loader).ttl(ttl).connect().await
    }

    /// Start a builder for custom serializer, metrics or probe timeout.
    pub fn builder(backend: B, loader: L) -> CacheBuilder<T, B, L> {
        CacheBuilder::new(backend, loader)
    }
}

impl<T, B, L, S> ReadThroughCache<T, B, L, S>
where
    T: CacheEntity,
    B: CacheBackend,
    L: CacheLoader<T>,
    S: CacheSerializer,
{
    /// Assemble a cache, capturing and validating the entity prefix.
    pub(crate) fn from_parts(
        backend: B,
        loader: L,
        serializer: S,
        metrics: Arc<dyn CacheMetrics>,
        ttl: Duration,
    ) -> Result<Self> {
        validate_config::<T>(ttl)?;
        let prefix = T::cache_prefix();

        debug!(
            "Read-through cache for '{}' on {} (TTL: {:?})",
            prefix,
            backend.address(),
            ttl
        );

        Ok(ReadThroughCache {
            backend: Arc::new(backend),
            loader: Arc::new(loader),
            serializer: Arc::new(serializer),
            metrics,
            prefix: Arc::from(prefix),
            ttl,
            _entity: PhantomData,
        })
    }

    /// Fetch the entity stored under `key`, loading and caching it on a miss.
    ///
    /// `key` is the caller's key without prefix; the loader receives it
    /// unchanged. A loaded value is written back under `"{prefix}:{key}"`,
    /// so the next `get` with the same key is a hit.
    ///
    /// # Errors
    ///
    /// - `Error::DecodeError`: a stored entry exists but does not decode
    /// - any error returned by the loader, unchanged
    /// - `Error::EncodeError` or an application-class `Error::Store` from the
    ///   write-back
    /// - `Error::Cancelled` / `Error::DeadlineExceeded` from `ctx`
    pub async fn get(&self, ctx: &Context, key: &str) -> Result<T> {
        ctx.run(self.read_through(ctx, key)).await
    }

    /// Write `entity` under its own key with the cache TTL.
    ///
    /// # Errors
    ///
    /// Every failure is returned, connectivity errors included.
    pub async fn set(&self, ctx: &Context, entity: &T) -> Result<()> {
        let stored_key = self.stored_key(&entity.cache_key().to_string());
        ctx.run(self.write(&stored_key, entity, WritePolicy::Strict))
            .await
    }

    /// Remove the entries for `keys`.
    ///
    /// Every key is attempted even if some fail; deleting a key that is not
    /// cached succeeds.
    ///
    /// # Errors
    ///
    /// The per-key failures, joined with [`Error::join`]. Deletes that
    /// succeeded stay applied.
    pub async fn delete<I, K>(&self, ctx: &Context, keys: I) -> Result<()>
    where
        I: IntoIterator<Item = K>,
        K: AsRef<str>,
    {
        let stored_keys: Vec<String> = keys
            .into_iter()
            .map(|k| self.stored_key(k.as_ref()))
            .collect();

        ctx.run(self.delete_all(stored_keys)).await
    }

    /// Stored key for a caller key: `"{prefix}:{key}"`.
    pub fn stored_key(&self, key: &str) -> String {
        CacheKeyBuilder::build(&self.prefix, key)
    }

    /// Namespace prefix captured at construction.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Get backend reference (for advanced use).
    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub(crate) fn backend_handle(&self) -> Arc<B> {
        Arc::clone(&self.backend)
    }

    async fn read_through(&self, ctx: &Context, key: &str) -> Result<T> {
        let timer = Instant::now();
        let stored_key = self.stored_key(key);

        match self.backend.get(&stored_key).await {
            Ok(Some(bytes)) => {
                let entity = self.serializer.decode::<T>(&bytes).map_err(|e| {
                    let err = match e {
                        Error::DecodeError(msg) => {
                            Error::DecodeError(format!("entry {}: {}", stored_key, msg))
                        }
                        other => other,
                    };
                    self.metrics.record_error(&stored_key, &err.to_string());
                    err
                })?;

                debug!("✓ Cache hit for {}", stored_key);
                self.metrics.record_hit(&stored_key, timer.elapsed());
                return Ok(entity);
            }
            Ok(None) => {
                debug!("✗ Cache miss for {}, invoking loader", stored_key);
            }
            Err(e) => {
                warn!(
                    "Cache read for {} failed, falling back to loader: {}",
                    stored_key, e
                );
            }
        }

        self.metrics.record_miss(&stored_key, timer.elapsed());

        let entity = self.loader.load(ctx, key).await.map_err(|e| {
            self.metrics.record_error(&stored_key, &e.to_string());
            e
        })?;

        self.write(&stored_key, &entity, WritePolicy::Lenient).await?;

        debug!("✓ Miss-fill for {} completed in {:?}", stored_key, timer.elapsed());
        Ok(entity)
    }

    async fn write(&self, stored_key: &str, entity: &T, policy: WritePolicy) -> Result<()> {
        let bytes = self.serializer.encode(entity).map_err(|e| {
            self.metrics.record_error(stored_key, &e.to_string());
            e
        })?;

        match self.backend.set(stored_key, bytes, self.ttl).await {
            Ok(()) => Ok(()),
            Err(e) if policy == WritePolicy::Lenient && e.is_connectivity() => {
                warn!("Write-back for {} skipped, store unreachable: {}", stored_key, e);
                self.metrics.record_suppressed_write(stored_key, &e.to_string());
                Ok(())
            }
            Err(e) => {
                self.metrics.record_error(stored_key, &e.to_string());
                Err(e)
            }
        }
    }

    async fn delete_all(&self, stored_keys: Vec<String>) -> Result<()> {
        let deletes = stored_keys
            .iter()
            .map(|stored_key| self.backend.delete(stored_key));

        let mut errors = Vec::new();
        for (stored_key, result) in stored_keys.iter().zip(join_all(deletes).await) {
            if let Err(e) = result {
                self.metrics.record_error(stored_key, &e.to_string());
                errors.push(e);
            }
        }

        match Error::join(errors) {
            Some(err) => {
                warn!("Delete failed for some of {} keys: {}", stored_keys.len(), err);
                Err(err)
            }
            None => {
                debug!("✓ Deleted {} keys", stored_keys.len());
                Ok(())
            }
        }
    }
}

/// Reject a zero TTL and a prefix that cannot delimit a namespace.
pub(crate) fn validate_config<T: CacheEntity>(ttl: Duration) -> Result<()> {
    if ttl.is_zero() {
        return Err(Error::ConfigError("cache TTL must be positive".to_string()));
    }
    CacheKeyBuilder::validate_prefix(T::cache_prefix())
}

/// Releases the backend of a cache created with `connect`.
///
/// `close` consumes the handle, so the backend is released at most once.
/// Clones of the cache that outlive the teardown see a closed backend.
#[must_use = "call `close` to release the store connections"]
pub struct Teardown<B: CacheBackend> {
    backend: Arc<B>,
}

impl<B: CacheBackend> Teardown<B> {
    pub(crate) fn new(backend: Arc<B>) -> Self {
        Teardown { backend }
    }

    /// Close the backend.
    ///
    /// # Errors
    ///
    /// Whatever the backend reports while closing.
    pub async fn close(self) -> Result<()> {
        info!("Closing cache backend {}", self.backend.address());
        self.backend.close().await
    }
}
