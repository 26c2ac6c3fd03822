use thiserror::Error;

/// Errors from the shared cache.
///
/// Callers on the request path treat every variant as a degradation signal,
/// never as a request failure: the rate limiter fails open and the include
/// resolver returns no includes.
#[derive(Debug, Error)]
pub enum CacheError {
    /// Could not reach the cache or obtain a pooled connection.
    #[error("cache connection error: {0}")]
    Connection(String),

    /// The cache answered with an error.
    #[error("cache backend error: {0}")]
    Backend(String),

    /// The operation exceeded its deadline.
    #[error("cache operation timed out after {0:?}")]
    Timeout(std::time::Duration),
}
