//! Redis backend behaviour.
//!
//! The unreachable-store tests need no server. Tests marked `#[ignore]` talk
//! to a live Redis at `REDIS_URL` (default `redis://127.0.0.1:6379`):
//!
//! ```text
//! REDIS_URL=redis://localhost:6379 cargo test --test redis_backend -- --ignored
//! ```

use readthrough_cache::backend::{CacheBackend, RedisBackend, RedisConfig};
use readthrough_cache::{CacheEntity, CacheLoader, Context, Error, ReadThroughCache, Result};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
struct TestStruct {
    #[serde(rename = "ID")]
    id: u32,
    #[serde(rename = "Name")]
    name: String,
}

impl TestStruct {
    fn new(id: u32, name: &str) -> Self {
        TestStruct {
            id,
            name: name.to_string(),
        }
    }
}

impl CacheEntity for TestStruct {
    type Key = String;

    fn cache_key(&self) -> Self::Key {
        format!("{}_{}", self.id, self.name)
    }

    fn cache_prefix() -> &'static str {
        "prefix"
    }
}

#[derive(Clone)]
struct CountingLoader {
    calls: Arc<AtomicUsize>,
    entity: TestStruct,
}

impl CountingLoader {
    fn new(entity: TestStruct) -> Self {
        CountingLoader {
            calls: Arc::new(AtomicUsize::new(0)),
            entity,
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl CacheLoader<TestStruct> for CountingLoader {
    async fn load(&self, _ctx: &Context, _key: &str) -> Result<TestStruct> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.entity.clone())
    }
}

const TTL: Duration = Duration::from_secs(60);

/// Nothing listens on port 1, so every connect is refused.
async fn unreachable_backend() -> RedisBackend {
    let mut config = RedisConfig::from_url("redis://127.0.0.1:1").expect("valid url");
    config.connection_timeout = Duration::from_secs(2);
    RedisBackend::new(config).await.expect("pool builds lazily")
}

async fn live_backend() -> RedisBackend {
    let url = std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string());
    RedisBackend::from_url(&url).await.expect("valid REDIS_URL")
}

#[tokio::test]
async fn unreachable_store_errors_are_connectivity_class() {
    let backend = unreachable_backend().await;

    let err = backend.get("prefix:1_James").await.expect_err("refused");
    assert!(err.is_connectivity(), "unexpected classification: {}", err);

    let err = backend
        .set("prefix:1_James", b"{}".to_vec(), TTL)
        .await
        .expect_err("refused");
    assert!(err.is_connectivity(), "unexpected classification: {}", err);
}

#[tokio::test]
async fn unreachable_store_get_passes_through_and_set_fails() {
    let _ = env_logger::builder().is_test(true).try_init();
    let loader = CountingLoader::new(TestStruct::new(9, "X"));
    let cache = ReadThroughCache::new(unreachable_backend().await, TTL, loader.clone())
        .expect("build without probe");
    let ctx = Context::background();

    let value = cache.get(&ctx, "anything").await.expect("loader value");
    assert_eq!(value, TestStruct::new(9, "X"));
    assert_eq!(loader.calls(), 1);

    let err = cache
        .set(&ctx, &TestStruct::new(9, "X"))
        .await
        .expect_err("set must fail loudly");
    assert!(err.is_connectivity());
}

#[tokio::test]
async fn connect_fails_fast_when_store_is_unreachable() {
    let loader = CountingLoader::new(TestStruct::new(9, "X"));
    let result = ReadThroughCache::connect(unreachable_backend().await, TTL, loader).await;

    match result {
        Err(Error::ConfigError(msg)) => assert!(msg.contains("127.0.0.1:1"), "{}", msg),
        Err(other) => panic!("expected ConfigError, got {:?}", other),
        Ok(_) => panic!("connect should fail"),
    }
}

#[tokio::test]
#[ignore = "requires a running Redis server"]
async fn live_round_trip_uses_prefixed_json_key() {
    let backend = live_backend().await;
    let loader = CountingLoader::new(TestStruct::new(0, "unused"));
    let (cache, teardown) = ReadThroughCache::connect(backend.clone(), TTL, loader.clone())
        .await
        .expect("connect");
    let ctx = Context::background();

    let james = TestStruct::new(1, "James");
    cache.set(&ctx, &james).await.expect("set");

    let raw = backend
        .get("prefix:1_James")
        .await
        .expect("raw get")
        .expect("value stored under prefix:1_James");
    assert_eq!(raw, br#"{"ID":1,"Name":"James"}"#.to_vec());

    assert_eq!(cache.get(&ctx, "1_James").await.expect("get"), james);
    assert_eq!(loader.calls(), 0);

    cache.delete(&ctx, ["1_James"]).await.expect("delete");
    teardown.close().await.expect("close");
}

#[tokio::test]
#[ignore = "requires a running Redis server"]
async fn live_miss_fill_and_delete() {
    let loader = CountingLoader::new(TestStruct::new(2, "Ryan"));
    let (cache, teardown) = ReadThroughCache::connect(live_backend().await, TTL, loader.clone())
        .await
        .expect("connect");
    let ctx = Context::background();

    cache.delete(&ctx, ["nothing_here"]).await.expect("clean slate");

    assert_eq!(
        cache.get(&ctx, "nothing_here").await.expect("miss"),
        TestStruct::new(2, "Ryan")
    );
    assert_eq!(
        cache.get(&ctx, "nothing_here").await.expect("hit"),
        TestStruct::new(2, "Ryan")
    );
    assert_eq!(loader.calls(), 1);

    cache.delete(&ctx, ["nothing_here"]).await.expect("delete");
    cache.get(&ctx, "nothing_here").await.expect("reload");
    assert_eq!(loader.calls(), 2);

    cache.delete(&ctx, ["nothing_here"]).await.expect("cleanup");
    teardown.close().await.expect("close");
}

#[tokio::test]
#[ignore = "requires a running Redis server"]
async fn live_wrong_type_is_application_class() {
    let backend = live_backend().await;
    let ctx = Context::background();

    // A hash under the key makes GET fail with WRONGTYPE.
    backend.delete("prefix:wrongtype").await.expect("clean slate");
    let loader = CountingLoader::new(TestStruct::new(5, "Wrong"));
    let cache = ReadThroughCache::new(backend.clone(), TTL, loader.clone()).expect("build");

    seed_hash(&backend, "prefix:wrongtype").await;

    let err = backend.get("prefix:wrongtype").await.expect_err("WRONGTYPE");
    assert!(!err.is_connectivity(), "unexpected classification: {}", err);

    // Read errors fall through to the loader; the write-back then
    // overwrites the hash with a plain SET.
    let value = cache.get(&ctx, "wrongtype").await.expect("loader value");
    assert_eq!(value, TestStruct::new(5, "Wrong"));
    assert_eq!(loader.calls(), 1);

    backend.delete("prefix:wrongtype").await.expect("cleanup");
}

async fn seed_hash(backend: &RedisBackend, key: &str) {
    use deadpool_redis::redis::cmd;
    use deadpool_redis::{Config, Runtime};

    let url = std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string());
    let pool = Config::from_url(url)
        .create_pool(Some(Runtime::Tokio1))
        .expect("pool");
    let mut conn = pool.get().await.expect("connection");

    let added: i64 = cmd("HSET")
        .arg(key)
        .arg("field")
        .arg("value")
        .query_async(&mut conn)
        .await
        .expect("HSET");
    assert_eq!(added, 1, "seeded hash on {}", backend.address());
}
