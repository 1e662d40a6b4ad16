//! Miss loaders: the source of truth consulted on a cache miss.

use crate::context::Context;
use crate::error::Result;
use std::future::Future;

/// Loads the canonical value for a key that is not in the cache.
///
/// The cache calls `load` at most once per `get`, only on a miss, with the
/// caller's unprefixed key. Errors are returned to the caller unchanged and
/// nothing is written to the store.
///
/// Async functions and closures of the shape
/// `Fn(Context, String) -> impl Future<Output = Result<T>>` implement this
/// trait directly.
///
/// # Example
///
/// ```
/// use readthrough_cache::{CacheLoader, Context, Result};
/// # #[derive(Clone, serde::Serialize, serde::Deserialize)]
/// # struct User { id: String }
///
/// struct UserRepository;
///
/// impl CacheLoader<User> for UserRepository {
///     async fn load(&self, _ctx: &Context, key: &str) -> Result<User> {
///         Ok(User { id: key.to_string() })
///     }
/// }
/// ```
pub trait CacheLoader<T>: Send + Sync + 'static {
    /// Fetch the entity identified by `key`.
    fn load(&self, ctx: &Context, key: &str) -> impl Future<Output = Result<T>> + Send;
}

impl<T, F, Fut> CacheLoader<T> for F
where
    F: Fn(Context, String) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T>> + Send,
{
    fn load(&self, ctx: &Context, key: &str) -> impl Future<Output = Result<T>> + Send {
        (self)(ctx.clone(), key.to_string())
    }
}
