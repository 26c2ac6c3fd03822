//! Conformance test suite shared by cache backends, plus a failing store
//! double for degradation tests.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::CacheError;
use crate::store::CacheStore;

/// A store whose every operation fails with a connection error.
///
/// Used to verify graceful degradation: rate limiting fails open, include
/// resolution returns no includes.
#[derive(Debug, Default)]
pub struct FailingStore;

impl FailingStore {
    fn refuse<T>() -> Result<T, CacheError> {
        Err(CacheError::Connection("connection refused".into()))
    }
}

#[async_trait]
impl CacheStore for FailingStore {
    async fn get(&self, _key: &str) -> Result<Option<String>, CacheError> {
        Self::refuse()
    }

    async fn set(
        &self,
        _key: &str,
        _value: &str,
        _ttl: Option<Duration>,
    ) -> Result<(), CacheError> {
        Self::refuse()
    }

    async fn delete(&self, _key: &str) -> Result<bool, CacheError> {
        Self::refuse()
    }

    async fn increment(
        &self,
        _key: &str,
        _delta: i64,
        _ttl_if_new: Option<Duration>,
    ) -> Result<i64, CacheError> {
        Self::refuse()
    }

    async fn ttl(&self, _key: &str) -> Result<Option<Duration>, CacheError> {
        Self::refuse()
    }

    async fn ping(&self) -> Result<(), CacheError> {
        Self::refuse()
    }
}

/// Run the full cache store conformance test suite.
///
/// Call this from a backend's test module with a fresh store instance.
///
/// # Errors
///
/// Returns an error if any conformance test fails.
pub async fn run_store_conformance_tests(store: &dyn CacheStore) -> Result<(), CacheError> {
    test_get_missing(store).await?;
    test_set_and_get(store).await?;
    test_delete(store).await?;
    test_increment(store).await?;
    test_increment_ttl_only_on_create(store).await?;
    test_ttl_reporting(store).await?;
    test_ping(store).await?;
    Ok(())
}

async fn test_get_missing(store: &dyn CacheStore) -> Result<(), CacheError> {
    let val = store.get("conformance:missing").await?;
    assert!(val.is_none(), "get on missing key should return None");
    Ok(())
}

async fn test_set_and_get(store: &dyn CacheStore) -> Result<(), CacheError> {
    store.set("conformance:set-get", "hello", None).await?;
    let val = store.get("conformance:set-get").await?;
    assert_eq!(val.as_deref(), Some("hello"));
    Ok(())
}

async fn test_delete(store: &dyn CacheStore) -> Result<(), CacheError> {
    store.set("conformance:to-delete", "bye", None).await?;
    let existed = store.delete("conformance:to-delete").await?;
    assert!(existed, "delete should return true for existing key");
    let val = store.get("conformance:to-delete").await?;
    assert!(val.is_none(), "get after delete should return None");

    let existed = store.delete("conformance:to-delete").await?;
    assert!(!existed, "delete on missing key should return false");
    Ok(())
}

async fn test_increment(store: &dyn CacheStore) -> Result<(), CacheError> {
    let val = store.increment("conformance:counter", 1, None).await?;
    assert_eq!(val, 1, "first increment from zero should yield 1");

    let val = store.increment("conformance:counter", 5, None).await?;
    assert_eq!(val, 6, "second increment should accumulate");
    Ok(())
}

async fn test_increment_ttl_only_on_create(store: &dyn CacheStore) -> Result<(), CacheError> {
    let window = Duration::from_secs(60);

    store
        .increment("conformance:windowed", 1, Some(window))
        .await?;
    let first_ttl = store.ttl("conformance:windowed").await?;
    assert!(
        first_ttl.is_some_and(|t| t <= window),
        "creating increment should start the window"
    );

    store
        .increment("conformance:windowed", 1, Some(Duration::from_secs(3600)))
        .await?;
    let second_ttl = store.ttl("conformance:windowed").await?;
    assert!(
        second_ttl.is_some_and(|t| t <= window),
        "later increments must not extend the window"
    );
    Ok(())
}

async fn test_ttl_reporting(store: &dyn CacheStore) -> Result<(), CacheError> {
    store
        .set("conformance:ttl", "v", Some(Duration::from_secs(30)))
        .await?;
    let ttl = store.ttl("conformance:ttl").await?;
    assert!(
        ttl.is_some_and(|t| t <= Duration::from_secs(30) && t > Duration::ZERO),
        "ttl should report remaining time"
    );

    store.set("conformance:no-ttl", "v", None).await?;
    assert!(
        store.ttl("conformance:no-ttl").await?.is_none(),
        "key without expiry should report no ttl"
    );

    assert!(
        store.ttl("conformance:ttl-missing").await?.is_none(),
        "missing key should report no ttl"
    );
    Ok(())
}

async fn test_ping(store: &dyn CacheStore) -> Result<(), CacheError> {
    store.ping().await
}
