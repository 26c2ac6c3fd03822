use std::sync::atomic::{AtomicU64, Ordering};

/// Atomic counters tracking gateway exchange outcomes.
///
/// All counters use relaxed ordering for maximum throughput. For a
/// consistent point-in-time view, call [`snapshot`](Self::snapshot).
#[derive(Debug, Default)]
pub struct GatewayMetrics {
    /// Total exchanges accepted.
    pub requests: AtomicU64,
    /// Exchanges forwarded to an upstream.
    pub forwarded: AtomicU64,
    /// 401 short-circuits.
    pub unauthorized: AtomicU64,
    /// 403 short-circuits.
    pub forbidden: AtomicU64,
    /// 404 short-circuits (no route or unknown tenant).
    pub not_found: AtomicU64,
    /// 429 short-circuits (principal or IP).
    pub rate_limited: AtomicU64,
    /// Upstream connect failures and timeouts.
    pub upstream_errors: AtomicU64,
    /// Rate-limit checks that failed open because the cache was down.
    pub rate_limit_degraded: AtomicU64,
    /// JSON:API transforms skipped or degraded (oversized body, cache down,
    /// unparsable document).
    pub transform_degraded: AtomicU64,
    /// Responses with spliced includes.
    pub includes_resolved: AtomicU64,
}

impl GatewayMetrics {
    pub fn increment_requests(&self) {
        self.requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_forwarded(&self) {
        self.forwarded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_unauthorized(&self) {
        self.unauthorized.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_forbidden(&self) {
        self.forbidden.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_not_found(&self) {
        self.not_found.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_rate_limited(&self) {
        self.rate_limited.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_upstream_errors(&self) {
        self.upstream_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_rate_limit_degraded(&self) {
        self.rate_limit_degraded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_transform_degraded(&self) {
        self.transform_degraded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_includes_resolved(&self) {
        self.includes_resolved.fetch_add(1, Ordering::Relaxed);
    }

    /// Take a consistent point-in-time snapshot of all counters.
    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            requests: self.requests.load(Ordering::Relaxed),
            forwarded: self.forwarded.load(Ordering::Relaxed),
            unauthorized: self.unauthorized.load(Ordering::Relaxed),
            forbidden: self.forbidden.load(Ordering::Relaxed),
            not_found: self.not_found.load(Ordering::Relaxed),
            rate_limited: self.rate_limited.load(Ordering::Relaxed),
            upstream_errors: self.upstream_errors.load(Ordering::Relaxed),
            rate_limit_degraded: self.rate_limit_degraded.load(Ordering::Relaxed),
            transform_degraded: self.transform_degraded.load(Ordering::Relaxed),
            includes_resolved: self.includes_resolved.load(Ordering::Relaxed),
        }
    }
}

/// A plain data snapshot of [`GatewayMetrics`] at a point in time.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct MetricsSnapshot {
    pub requests: u64,
    pub forwarded: u64,
    pub unauthorized: u64,
    pub forbidden: u64,
    pub not_found: u64,
    pub rate_limited: u64,
    pub upstream_errors: u64,
    pub rate_limit_degraded: u64,
    pub transform_degraded: u64,
    pub includes_resolved: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_metrics_are_zero() {
        let snap = GatewayMetrics::default().snapshot();
        assert_eq!(snap.requests, 0);
        assert_eq!(snap.rate_limited, 0);
    }

    #[test]
    fn increment_and_snapshot() {
        let m = GatewayMetrics::default();
        m.increment_requests();
        m.increment_requests();
        m.increment_forwarded();
        m.increment_rate_limit_degraded();

        let snap = m.snapshot();
        assert_eq!(snap.requests, 2);
        assert_eq!(snap.forwarded, 1);
        assert_eq!(snap.rate_limit_degraded, 1);
    }
}
