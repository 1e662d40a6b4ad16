//! Redis cache backend implementation.

use super::CacheBackend;
use crate::error::{Error, Result, NO_SUCH_HOST};
use deadpool_redis::redis::{cmd, AsyncCommands, RedisError};
use deadpool_redis::{Config, Connection, Pool, PoolConfig, PoolError, Runtime};
use std::time::Duration;
use url::Url;

/// Default Redis connection pool size.
/// Formula: (CPU cores × 2) + 1
/// For 8-core systems: 16 connections is optimal
/// Override with REDIS_POOL_SIZE environment variable
const DEFAULT_POOL_SIZE: usize = 16;

const DEFAULT_URL: &str = "redis://127.0.0.1:6379";

/// Configuration for the Redis backend.
#[derive(Clone, Debug)]
pub struct RedisConfig {
    /// `redis[s]://[user[:pass]@]host[:port][/db]`
    pub url: String,
    pub pool_size: usize,
    /// Bound on acquiring, creating and recycling a pooled connection.
    pub connection_timeout: Duration,
}

impl Default for RedisConfig {
    fn default() -> Self {
        RedisConfig {
            url: DEFAULT_URL.to_string(),
            pool_size: DEFAULT_POOL_SIZE,
            connection_timeout: Duration::from_secs(5),
        }
    }
}

impl RedisConfig {
    /// Validate a Redis URL or bare `host:port` address.
    ///
    /// Accepts `redis[s]://[user[:pass]@]host[:port][/db]`; a bare address
    /// such as `localhost:6379` is treated as `redis://localhost:6379`.
    ///
    /// # Errors
    ///
    /// Returns `Error::ConfigError` for empty input, an unknown scheme, a
    /// missing host or a non-numeric database index.
    ///
    /// # Example
    ///
    /// ```
    /// use readthrough_cache::backend::RedisConfig;
    ///
    /// let config = RedisConfig::from_url("redis://:secret@cache.internal:6380/2").unwrap();
    /// assert_eq!(config.address(), "cache.internal:6380");
    /// assert_eq!(config.database(), 2);
    /// assert!(RedisConfig::from_url("").is_err());
    /// ```
    pub fn from_url(input: &str) -> Result<Self> {
        let url = parse_url(input)?;
        Ok(RedisConfig {
            url: url.into(),
            ..Default::default()
        })
    }

    /// Build configuration from the environment.
    ///
    /// - `REDIS_URL` (required)
    /// - `REDIS_POOL_SIZE` (optional, defaults to 16)
    ///
    /// # Errors
    ///
    /// Returns `Error::ConfigError` if `REDIS_URL` is unset or invalid.
    pub fn from_env() -> Result<Self> {
        let url = std::env::var("REDIS_URL")
            .map_err(|_| Error::ConfigError("REDIS_URL is not set".to_string()))?;
        let mut config = Self::from_url(&url)?;
        config.pool_size = pool_size_from_env();
        Ok(config)
    }

    /// `host:port` of the server, without credentials.
    pub fn address(&self) -> String {
        match Url::parse(&self.url) {
            Ok(url) => format!(
                "{}:{}",
                url.host_str().unwrap_or_default(),
                url.port().unwrap_or(6379)
            ),
            Err(_) => self.url.clone(),
        }
    }

    /// Logical database index selected by the URL path, `0` if absent.
    pub fn database(&self) -> u32 {
        Url::parse(&self.url)
            .ok()
            .and_then(|url| url.path().trim_start_matches('/').parse().ok())
            .unwrap_or(0)
    }
}

fn pool_size_from_env() -> usize {
    std::env::var("REDIS_POOL_SIZE")
        .ok()
        .and_then(|s| s.parse::<usize>().ok())
        .filter(|n| *n > 0)
        .unwrap_or(DEFAULT_POOL_SIZE)
}

fn parse_url(input: &str) -> Result<Url> {
    let input = input.trim();
    if input.is_empty() {
        return Err(Error::ConfigError("Redis URL must not be empty".to_string()));
    }

    let candidate = if input.contains("://") {
        input.to_string()
    } else {
        format!("redis://{}", input)
    };

    // Error messages never echo the input: it may carry a password.
    let url = Url::parse(&candidate)
        .map_err(|e| Error::ConfigError(format!("Invalid Redis URL: {}", e)))?;

    match url.scheme() {
        "redis" | "rediss" => {}
        other => {
            return Err(Error::ConfigError(format!(
                "Unsupported Redis URL scheme '{}' (expected redis or rediss)",
                other
            )))
        }
    }

    if url.host_str().map_or(true, str::is_empty) {
        return Err(Error::ConfigError("Redis URL has no host".to_string()));
    }

    let db = url.path().trim_start_matches('/');
    if !db.is_empty() && db.parse::<u32>().is_err() {
        return Err(Error::ConfigError(format!(
            "Invalid Redis database index '{}'",
            db
        )));
    }

    Ok(url)
}

/// Redis backend with connection pooling and async operations.
///
/// Values are written with `SET key value PX <ttl-ms>`, so expiry is
/// enforced by the server.
///
/// # Example
///
/// ```no_run
/// # use readthrough_cache::backend::{RedisBackend, RedisConfig, CacheBackend};
/// # use readthrough_cache::error::Result;
/// # use std::time::Duration;
/// # async fn example() -> Result<()> {
/// let config = RedisConfig::from_url("redis://localhost:6379")?;
///
/// let backend = RedisBackend::new(config).await?;
/// backend.set("key", b"value".to_vec(), Duration::from_secs(60)).await?;
/// let value = backend.get("key").await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct RedisBackend {
    pool: Pool,
    address: String,
}

impl RedisBackend {
    /// Create new Redis backend from configuration.
    ///
    /// No connection is opened here; use [`CacheBackend::ping`] (or
    /// `ReadThroughCache::connect`) to verify the server is reachable.
    ///
    /// # Errors
    /// Returns `Err` if the URL is invalid or pool creation fails
    pub async fn new(config: RedisConfig) -> Result<Self> {
        let url = parse_url(&config.url)?;
        let address = config.address();

        let mut pool_config = PoolConfig::new(config.pool_size.max(1));
        pool_config.timeouts.wait = Some(config.connection_timeout);
        pool_config.timeouts.create = Some(config.connection_timeout);
        pool_config.timeouts.recycle = Some(config.connection_timeout);

        let mut cfg = Config::from_url(String::from(url));
        cfg.pool = Some(pool_config);

        let pool = cfg
            .create_pool(Some(Runtime::Tokio1))
            .map_err(|e| Error::ConfigError(format!("Failed to create connection pool: {}", e)))?;

        info!(
            "✓ Redis backend initialized with server: {} (pool size: {})",
            address, config.pool_size
        );

        Ok(RedisBackend { pool, address })
    }

    /// Create from a Redis URL directly.
    ///
    /// Pool size is determined by:
    /// 1. `REDIS_POOL_SIZE` environment variable (if set)
    /// 2. `DEFAULT_POOL_SIZE` constant (16)
    ///
    /// # Errors
    /// Returns `Err` if the URL is invalid or pool creation fails
    pub async fn from_url(url: &str) -> Result<Self> {
        let mut config = RedisConfig::from_url(url)?;
        config.pool_size = pool_size_from_env();
        Self::new(config).await
    }

    async fn connection(&self) -> Result<Connection> {
        self.pool.get().await.map_err(classify_pool_error)
    }
}

/// Map a pool failure onto the connectivity/application split.
fn classify_pool_error(err: PoolError) -> Error {
    match err {
        PoolError::Backend(e) => classify_redis_error("Failed to connect to Redis", &e),
        PoolError::Timeout(kind) => {
            Error::connectivity(format!("Timed out acquiring Redis connection ({:?})", kind))
        }
        PoolError::Closed => Error::connectivity("Redis connection pool is closed"),
        other => Error::application(format!("Failed to get Redis connection: {}", other)),
    }
}

fn classify_redis_error(context: &str, err: &RedisError) -> Error {
    let message = format!("{}: {}", context, err);
    if is_connectivity_error(err) {
        Error::connectivity(message)
    } else {
        Error::application(message)
    }
}

/// Transport failures: DNS, refused, dropped, timed out, other socket IO.
/// Server replies such as WRONGTYPE, NOAUTH or OOM are not.
fn is_connectivity_error(err: &RedisError) -> bool {
    err.is_io_error()
        || err.is_connection_refusal()
        || err.is_connection_dropped()
        || err.is_timeout()
        || err.to_string().contains(NO_SUCH_HOST)
}

impl CacheBackend for RedisBackend {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let mut conn = self.connection().await?;

        let value: Option<Vec<u8>> = conn.get(key).await.map_err(|e| {
            classify_redis_error(&format!("Redis GET failed for key {}", key), &e)
        })?;

        match &value {
            Some(_) => debug!("✓ Redis GET {} -> HIT", key),
            None => debug!("✓ Redis GET {} -> MISS", key),
        }

        Ok(value)
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<()> {
        let mut conn = self.connection().await?;

        let millis = px_millis(ttl);

        let _: () = cmd("SET")
            .arg(key)
            .arg(value)
            .arg("PX")
            .arg(millis)
            .query_async(&mut conn)
            .await
            .map_err(|e| classify_redis_error(&format!("Redis SET failed for key {}", key), &e))?;

        debug!("✓ Redis SET {} (TTL: {:?})", key, ttl);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let mut conn = self.connection().await?;

        let removed: i64 = conn.del(key).await.map_err(|e| {
            classify_redis_error(&format!("Redis DEL failed for key {}", key), &e)
        })?;

        debug!("✓ Redis DEL {} ({} removed)", key, removed);
        Ok(())
    }

    async fn ping(&self) -> Result<()> {
        let mut conn = self.connection().await?;

        let pong: String = cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(|e| classify_redis_error("Redis PING failed", &e))?;

        debug!("✓ Redis PING {} -> {}", self.address, pong);
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.pool.close();
        info!("Redis backend {} closed", self.address);
        Ok(())
    }

    fn address(&self) -> String {
        self.address.clone()
    }
}

/// `PX` argument for a TTL: whole milliseconds, at least 1, at most the
/// server's signed 64-bit limit.
fn px_millis(ttl: Duration) -> u64 {
    const MAX_PX: u64 = i64::MAX as u64;
    u64::try_from(ttl.as_millis())
        .unwrap_or(MAX_PX)
        .clamp(1, MAX_PX)
}
