use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use deadpool_redis::{Config, Pool, Runtime};
use redis::AsyncCommands;

use portico_state::error::CacheError;
use portico_state::store::CacheStore;

/// Redis-backed implementation of [`CacheStore`].
///
/// Uses a `deadpool-redis` connection pool. Counters are plain Redis strings
/// manipulated with `INCRBY`; the window TTL is applied with `PEXPIRE` only
/// when the increment created the key. Every operation runs under the
/// configured read deadline so a slow Redis degrades rather than stalls the
/// request path.
pub struct RedisCacheStore {
    pool: Pool,
    prefix: String,
    read_timeout: Duration,
}

impl RedisCacheStore {
    /// Create a new `RedisCacheStore` from the provided configuration.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::Connection`] if the pool cannot be created.
    pub fn new(config: &crate::RedisConfig) -> Result<Self, CacheError> {
        let cfg = Config::from_url(&config.url);
        let pool = cfg
            .builder()
            .map(|b| {
                b.max_size(config.pool_size)
                    .wait_timeout(Some(config.connect_timeout))
                    .runtime(Runtime::Tokio1)
                    .build()
            })
            .map_err(|e| CacheError::Connection(e.to_string()))?
            .map_err(|e| CacheError::Connection(e.to_string()))?;

        Ok(Self {
            pool,
            prefix: config.prefix.clone(),
            read_timeout: config.read_timeout,
        })
    }

    fn full_key(&self, key: &str) -> String {
        format!("{}:{}", self.prefix, key)
    }

    /// Obtain a connection from the pool.
    async fn conn(&self) -> Result<deadpool_redis::Connection, CacheError> {
        self.pool
            .get()
            .await
            .map_err(|e| CacheError::Connection(e.to_string()))
    }

    /// Run an operation under the configured read deadline.
    async fn deadline<T>(
        &self,
        op: impl Future<Output = Result<T, CacheError>> + Send,
    ) -> Result<T, CacheError> {
        tokio::time::timeout(self.read_timeout, op)
            .await
            .map_err(|_| CacheError::Timeout(self.read_timeout))?
    }
}

#[async_trait]
impl CacheStore for RedisCacheStore {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let redis_key = self.full_key(key);
        self.deadline(async {
            let mut conn = self.conn().await?;
            conn.get(&redis_key)
                .await
                .map_err(|e| CacheError::Backend(e.to_string()))
        })
        .await
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), CacheError> {
        let redis_key = self.full_key(key);
        self.deadline(async {
            let mut conn = self.conn().await?;
            match ttl {
                Some(d) => {
                    let ms = u64::try_from(d.as_millis()).unwrap_or(u64::MAX);
                    let () = conn
                        .pset_ex(&redis_key, value, ms)
                        .await
                        .map_err(|e| CacheError::Backend(e.to_string()))?;
                }
                None => {
                    let () = conn
                        .set(&redis_key, value)
                        .await
                        .map_err(|e| CacheError::Backend(e.to_string()))?;
                }
            }
            Ok(())
        })
        .await
    }

    async fn delete(&self, key: &str) -> Result<bool, CacheError> {
        let redis_key = self.full_key(key);
        self.deadline(async {
            let mut conn = self.conn().await?;
            let deleted: i64 = conn
                .del(&redis_key)
                .await
                .map_err(|e| CacheError::Backend(e.to_string()))?;
            Ok(deleted > 0)
        })
        .await
    }

    async fn increment(
        &self,
        key: &str,
        delta: i64,
        ttl_if_new: Option<Duration>,
    ) -> Result<i64, CacheError> {
        let redis_key = self.full_key(key);
        self.deadline(async {
            let mut conn = self.conn().await?;
            let new_val: i64 = conn
                .incr(&redis_key, delta)
                .await
                .map_err(|e| CacheError::Backend(e.to_string()))?;

            // The increment created the key; start the window clock.
            if new_val == delta
                && let Some(d) = ttl_if_new
            {
                let ms = i64::try_from(d.as_millis()).unwrap_or(i64::MAX);
                let () = conn
                    .pexpire(&redis_key, ms)
                    .await
                    .map_err(|e| CacheError::Backend(e.to_string()))?;
            }

            Ok(new_val)
        })
        .await
    }

    async fn ttl(&self, key: &str) -> Result<Option<Duration>, CacheError> {
        let redis_key = self.full_key(key);
        self.deadline(async {
            let mut conn = self.conn().await?;
            let pttl: i64 = redis::cmd("PTTL")
                .arg(&redis_key)
                .query_async(&mut conn)
                .await
                .map_err(|e| CacheError::Backend(e.to_string()))?;

            // -2 = missing key, -1 = no expiry.
            if pttl < 0 {
                Ok(None)
            } else {
                Ok(Some(Duration::from_millis(u64::try_from(pttl).unwrap_or(0))))
            }
        })
        .await
    }

    async fn ping(&self) -> Result<(), CacheError> {
        self.deadline(async {
            let mut conn = self.conn().await?;
            let pong: String = redis::cmd("PING")
                .query_async(&mut conn)
                .await
                .map_err(|e| CacheError::Backend(e.to_string()))?;
            if pong == "PONG" {
                Ok(())
            } else {
                Err(CacheError::Backend(format!("unexpected PING reply: {pong}")))
            }
        })
        .await
    }
}
