//! Builder pattern for cache construction.

use crate::backend::CacheBackend;
use crate::cache::{validate_config, ReadThroughCache, Teardown};
use crate::entity::CacheEntity;
use crate::error::{Error, Result};
use crate::loader::CacheLoader;
use crate::observability::{CacheMetrics, NoOpMetrics};
use crate::serialization::{CacheSerializer, JsonSerializer};
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

/// Bound on the startup ping performed by `connect`.
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Fluent builder for a [`ReadThroughCache`].
///
/// Provides chainable methods to configure the TTL, value serializer,
/// metrics sink and startup probe.
///
/// # Example
///
/// ```ignore
/// use readthrough_cache::{serialization::PostcardSerializer, ReadThroughCache};
/// use std::time::Duration;
///
/// // backend is a CacheBackend, loader a CacheLoader<User>
/// let (cache, teardown) = ReadThroughCache::builder(backend, loader)
///     .ttl(Duration::from_secs(300))
///     .serializer(PostcardSerializer)
///     .probe_timeout(Duration::from_secs(2))
///     .connect()
///     .await?;
/// ```
pub struct CacheBuilder<T, B, L, S = JsonSerializer> {
    backend: B,
    loader: L,
    serializer: S,
    metrics: Arc<dyn CacheMetrics>,
    ttl: Option<Duration>,
    probe_timeout: Duration,
    _entity: PhantomData<fn() -> T>,
}

impl<T, B, L> CacheBuilder<T, B, L, JsonSerializer>
where
    T: CacheEntity,
    B: CacheBackend,
    L: CacheLoader<T>,
{
    /// Create a new builder with default settings.
    pub fn new(backend: B, loader: L) -> Self {
        Self {
            backend,
            loader,
            serializer: JsonSerializer,
            metrics: Arc::new(NoOpMetrics),
            ttl: None,
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
            _entity: PhantomData,
        }
    }
}

impl<T, B, L, S> CacheBuilder<T, B, L, S>
where
    T: CacheEntity,
    B: CacheBackend,
    L: CacheLoader<T>,
    S: CacheSerializer,
{
    /// Set the time-to-live applied to every write. Required.
    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    /// Replace the value serializer (JSON by default).
    pub fn serializer<S2: CacheSerializer>(self, serializer: S2) -> CacheBuilder<T, B, L, S2> {
        CacheBuilder {
            backend: self.backend,
            loader: self.loader,
            serializer,
            metrics: self.metrics,
            ttl: self.ttl,
            probe_timeout: self.probe_timeout,
            _entity: PhantomData,
        }
    }

    /// Set custom metrics handler.
    pub fn metrics<M: CacheMetrics + 'static>(mut self, metrics: M) -> Self {
        self.metrics = Arc::new(metrics);
        self
    }

    /// Bound the startup ping used by [`CacheBuilder::connect`].
    pub fn probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = timeout;
        self
    }

    /// Build the cache without touching the store.
    ///
    /// # Errors
    ///
    /// Returns `Error::ConfigError` if no TTL was set, the TTL is zero, or
    /// the entity prefix is empty or contains `':'`.
    pub fn build(self) -> Result<ReadThroughCache<T, B, L, S>> {
        let ttl = self
            .ttl
            .ok_or_else(|| Error::ConfigError("cache TTL is required".to_string()))?;

        ReadThroughCache::from_parts(self.backend, self.loader, self.serializer, self.metrics, ttl)
    }

    /// Build the cache and fail fast if the store does not answer a ping.
    ///
    /// # Errors
    ///
    /// Returns `Error::ConfigError` for invalid configuration, or when the
    /// ping fails or exceeds the probe timeout. The backend is closed before
    /// any error is returned.
    pub async fn connect(self) -> Result<(ReadThroughCache<T, B, L, S>, Teardown<B>)> {
        let probe_timeout = self.probe_timeout;
        let checked = match self.ttl {
            Some(ttl) => validate_config::<T>(ttl),
            None => Err(Error::ConfigError("cache TTL is required".to_string())),
        };
        if let Err(e) = checked {
            if let Err(close_err) = self.backend.close().await {
                warn!(
                    "Failed to close backend {} after invalid configuration: {}",
                    self.backend.address(),
                    close_err
                );
            }
            return Err(e);
        }

        let cache = self.build()?;
        let backend = cache.backend_handle();
        let address = backend.address();

        let probe = match tokio::time::timeout(probe_timeout, backend.ping()).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(Error::ConfigError(format!(
                "Startup ping to {} failed: {}",
                address, e
            ))),
            Err(_) => Err(Error::ConfigError(format!(
                "Startup ping to {} timed out after {:?}",
                address, probe_timeout
            ))),
        };

        if let Err(e) = probe {
            if let Err(close_err) = backend.close().await {
                warn!("Failed to close backend {} after probe: {}", address, close_err);
            }
            return Err(e);
        }

        info!(
            "✓ Cache '{}' connected to {} (TTL: {:?})",
            cache.prefix(),
            address,
            cache.ttl()
        );

        Ok((cache, Teardown::new(backend)))
    }
}
