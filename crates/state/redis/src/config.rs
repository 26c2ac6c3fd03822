use std::time::Duration;

/// Configuration for the Redis cache backend.
#[derive(Debug, Clone)]
pub struct RedisConfig {
    /// Redis connection URL (e.g. `redis://127.0.0.1:6379`).
    pub url: String,

    /// Key prefix applied to every Redis key to avoid collisions.
    pub prefix: String,

    /// Number of connections in the `deadpool-redis` pool.
    pub pool_size: usize,

    /// Timeout for acquiring a pooled connection.
    pub connect_timeout: Duration,

    /// Deadline for any single cache operation. Operations that exceed it
    /// fail with a timeout error so the request path can degrade instead of
    /// stalling.
    pub read_timeout: Duration,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: String::from("redis://127.0.0.1:6379"),
            prefix: String::from("portico"),
            pool_size: 10,
            connect_timeout: Duration::from_secs(2),
            read_timeout: Duration::from_secs(1),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_values() {
        let cfg = RedisConfig::default();
        assert_eq!(cfg.url, "redis://127.0.0.1:6379");
        assert_eq!(cfg.prefix, "portico");
        assert_eq!(cfg.pool_size, 10);
        assert_eq!(cfg.connect_timeout, Duration::from_secs(2));
        assert_eq!(cfg.read_timeout, Duration::from_secs(1));
    }
}
