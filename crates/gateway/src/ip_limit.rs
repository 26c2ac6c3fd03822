use std::collections::VecDeque;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use tokio::task::JoinHandle;
use tracing::debug;

/// Outcome of a per-IP check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IpDecision {
    Permitted,
    Limited { retry_after_secs: u64 },
}

/// Process-local sliding-window limiter for unauthenticated paths.
///
/// Each IP owns a deque of request instants; a request is admitted when
/// fewer than `limit` instants fall inside the window. The exchange holding
/// the entry is its single writer; concurrent exchanges from the same IP
/// serialize on the shard lock for that entry only. A background task
/// evicts idle entries so the table does not grow with the set of IPs ever
/// seen.
pub struct IpRateLimiter {
    limit: usize,
    window: Duration,
    table: DashMap<IpAddr, VecDeque<Instant>>,
}

impl IpRateLimiter {
    #[must_use]
    pub fn new(limit: usize, window: Duration) -> Self {
        Self {
            limit,
            window,
            table: DashMap::new(),
        }
    }

    /// Count this request against the IP's sliding window.
    #[must_use]
    pub fn check(&self, ip: IpAddr) -> IpDecision {
        let now = Instant::now();
        let mut hits = self.table.entry(ip).or_default();

        while let Some(front) = hits.front() {
            if now.duration_since(*front) >= self.window {
                hits.pop_front();
            } else {
                break;
            }
        }

        if hits.len() >= self.limit {
            let oldest = hits.front().copied().unwrap_or(now);
            let retry_after = self
                .window
                .saturating_sub(now.duration_since(oldest))
                .as_secs()
                .max(1);
            return IpDecision::Limited {
                retry_after_secs: retry_after,
            };
        }

        hits.push_back(now);
        IpDecision::Permitted
    }

    /// Drop entries whose most recent hit left the window.
    pub fn evict_stale(&self) {
        let now = Instant::now();
        let window = self.window;
        let before = self.table.len();
        self.table
            .retain(|_, hits| hits.back().is_some_and(|t| now.duration_since(*t) < window));
        let evicted = before.saturating_sub(self.table.len());
        if evicted > 0 {
            debug!(evicted, "evicted stale IP rate-limit entries");
        }
    }

    /// Spawn the periodic eviction task.
    #[must_use]
    pub fn spawn_evictor(self: &Arc<Self>, interval: Duration) -> JoinHandle<()> {
        let limiter = Arc::clone(self);
        tokio::spawn(async move {
            let mut timer = tokio::time::interval(interval);
            // The immediate first tick would evict at startup; skip it.
            timer.tick().await;
            loop {
                timer.tick().await;
                limiter.evict_stale();
            }
        })
    }

    /// Number of tracked IPs.
    #[must_use]
    pub fn tracked(&self) -> usize {
        self.table.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ip(last: u8) -> IpAddr {
        IpAddr::from([10, 0, 0, last])
    }

    #[test]
    fn admits_until_limit_then_rejects() {
        let limiter = IpRateLimiter::new(3, Duration::from_secs(60));

        for _ in 0..3 {
            assert_eq!(limiter.check(ip(1)), IpDecision::Permitted);
        }
        assert!(matches!(limiter.check(ip(1)), IpDecision::Limited { .. }));

        // A different IP is unaffected.
        assert_eq!(limiter.check(ip(2)), IpDecision::Permitted);
    }

    #[test]
    fn window_slides() {
        let limiter = IpRateLimiter::new(2, Duration::from_millis(10));

        assert_eq!(limiter.check(ip(1)), IpDecision::Permitted);
        assert_eq!(limiter.check(ip(1)), IpDecision::Permitted);
        assert!(matches!(limiter.check(ip(1)), IpDecision::Limited { .. }));

        std::thread::sleep(Duration::from_millis(15));
        assert_eq!(limiter.check(ip(1)), IpDecision::Permitted);
    }

    #[test]
    fn eviction_drops_idle_entries() {
        let limiter = IpRateLimiter::new(10, Duration::from_millis(5));
        let _ = limiter.check(ip(1));
        let _ = limiter.check(ip(2));
        assert_eq!(limiter.tracked(), 2);

        std::thread::sleep(Duration::from_millis(10));
        limiter.evict_stale();
        assert_eq!(limiter.tracked(), 0);
    }

    #[test]
    fn retry_after_is_bounded_by_window() {
        let limiter = IpRateLimiter::new(1, Duration::from_secs(60));
        let _ = limiter.check(ip(1));
        match limiter.check(ip(1)) {
            IpDecision::Limited { retry_after_secs } => assert!(retry_after_secs <= 60),
            IpDecision::Permitted => panic!("expected limit"),
        }
    }
}
