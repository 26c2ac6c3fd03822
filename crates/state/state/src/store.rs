use std::time::Duration;

use async_trait::async_trait;

use crate::error::CacheError;

/// Trait over the shared key/value cache.
///
/// Implementations must be `Send + Sync` and safe for concurrent access.
/// Every operation is expected to enforce its own deadline; a slow backend
/// surfaces as [`CacheError::Timeout`] rather than an unbounded await.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Get the value for a key. Returns `None` if not found or expired.
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    /// Set a value with an optional TTL, overwriting any previous value.
    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>)
    -> Result<(), CacheError>;

    /// Delete a key. Returns `true` if the key existed.
    async fn delete(&self, key: &str) -> Result<bool, CacheError>;

    /// Atomically increment a counter by `delta` and return the new value.
    ///
    /// When the increment creates the counter, `ttl_if_new` is applied as
    /// its expiry; an existing counter keeps its remaining TTL. This is the
    /// fixed-window rate-limit primitive: the first request in a window
    /// starts the clock, later ones only count.
    async fn increment(
        &self,
        key: &str,
        delta: i64,
        ttl_if_new: Option<Duration>,
    ) -> Result<i64, CacheError>;

    /// Remaining time to live for a key. `None` when the key is missing or
    /// has no expiry.
    async fn ttl(&self, key: &str) -> Result<Option<Duration>, CacheError>;

    /// Liveness probe for health reporting.
    async fn ping(&self) -> Result<(), CacheError>;
}
