//! # readthrough-cache
//!
//! A typed read-through cache over Redis.
//!
//! ## Features
//!
//! - **Typed:** Cache any `T` that implements [`CacheEntity`]; keys are
//!   namespaced as `"{prefix}:{key}"`
//! - **Read-through:** On a miss a [`CacheLoader`] produces the value, which is
//!   written back with a fixed TTL and returned
//! - **Degrades gracefully:** An unreachable store turns `get` into a
//!   pass-through to the loader, while `set` still fails loudly
//! - **Loud on corruption:** An entry that does not decode is an error, never
//!   a silent refill
//! - **Cancellable:** Every operation takes a [`Context`] with an optional
//!   deadline and cancellation token
//!
//! ## Quick Start
//!
//! ```ignore
//! use readthrough_cache::{
//!     backend::RedisBackend, CacheEntity, Context, ReadThroughCache, Result,
//! };
//! use serde::{Deserialize, Serialize};
//! use std::time::Duration;
//!
//! // 1. Define your entity
//! #[derive(Clone, Serialize, Deserialize)]
//! struct User {
//!     id: String,
//!     name: String,
//! }
//!
//! // 2. Implement CacheEntity
//! impl CacheEntity for User {
//!     type Key = String;
//!     fn cache_key(&self) -> Self::Key { self.id.clone() }
//!     fn cache_prefix() -> &'static str { "user" }
//! }
//!
//! // 3. Write a loader for misses
//! async fn load_user(ctx: Context, id: String) -> Result<User> {
//!     repository.fetch(&ctx, &id).await
//! }
//!
//! // 4. Connect (pings the server, fails fast on misconfiguration)
//! let backend = RedisBackend::from_url("redis://localhost:6379").await?;
//! let (cache, teardown) =
//!     ReadThroughCache::connect(backend, Duration::from_secs(60), load_user).await?;
//!
//! // 5. Use it - ReadThroughCache is Clone for sharing across tasks
//! let ctx = Context::background().with_timeout(Duration::from_millis(200));
//! let user = cache.get(&ctx, "user_1").await?;
//!
//! teardown.close().await?;
//! ```

#[macro_use]
extern crate log;

pub mod backend;
pub mod builder;
pub mod cache;
pub mod context;
pub mod entity;
pub mod error;
pub mod key;
pub mod loader;
pub mod observability;
pub mod serialization;

// Re-exports for convenience
pub use backend::CacheBackend;
pub use builder::CacheBuilder;
pub use cache::{ReadThroughCache, Teardown};
pub use context::Context;
pub use entity::CacheEntity;
pub use error::{Error, Result, StoreErrorKind};
pub use loader::CacheLoader;
pub use serialization::{CacheSerializer, JsonSerializer, PostcardSerializer};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
