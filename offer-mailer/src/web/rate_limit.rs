//! Per-client fixed-window rate limiting for campaign submissions.

use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::warn;

/// Length of one rate-limit window.
pub const WINDOW: Duration = Duration::from_secs(60);

/// Windows tracked before expired ones are pruned.
const PRUNE_THRESHOLD: usize = 1024;

#[derive(Debug, Clone, Copy)]
struct Window {
    count: u32,
    resets_at: Instant,
}

/// Allows at most `limit` requests per client IP in each window.
#[derive(Clone)]
pub struct RateLimiter {
    limit: u32,
    windows: Arc<Mutex<HashMap<IpAddr, Window>>>,
}

impl RateLimiter {
    pub fn new(limit: u32) -> Self {
        Self {
            limit,
            windows: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Count a request from `ip` and report whether it is allowed.
    pub async fn check(&self, ip: IpAddr) -> bool {
        self.check_at(ip, Instant::now()).await
    }

    async fn check_at(&self, ip: IpAddr, now: Instant) -> bool {
        let mut windows = self.windows.lock().await;

        if windows.len() >= PRUNE_THRESHOLD {
            windows.retain(|_, window| window.resets_at > now);
        }

        let window = windows.entry(ip).or_insert(Window {
            count: 0,
            resets_at: now + WINDOW,
        });

        if now > window.resets_at {
            window.count = 0;
            window.resets_at = now + WINDOW;
        }

        window.count += 1;
        if window.count > self.limit {
            warn!(
                client_ip = %ip,
                count = window.count,
                limit = self.limit,
                "rate_limit_exceeded"
            );
            return false;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    const CLIENT: IpAddr = IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1));
    const OTHER: IpAddr = IpAddr::V4(Ipv4Addr::new(10, 0, 0, 2));

    #[tokio::test]
    async fn test_limit_per_window() {
        let limiter = RateLimiter::new(3);
        let now = Instant::now();

        for _ in 0..3 {
            assert!(limiter.check_at(CLIENT, now).await);
        }
        assert!(!limiter.check_at(CLIENT, now).await);
        // Other clients have their own window
        assert!(limiter.check_at(OTHER, now).await);
    }

    #[tokio::test]
    async fn test_window_resets() {
        let limiter = RateLimiter::new(1);
        let now = Instant::now();

        assert!(limiter.check_at(CLIENT, now).await);
        assert!(!limiter.check_at(CLIENT, now + Duration::from_secs(30)).await);
        assert!(limiter.check_at(CLIENT, now + Duration::from_secs(61)).await);
    }

    #[tokio::test]
    async fn test_expired_windows_are_pruned() {
        let limiter = RateLimiter::new(1);
        let now = Instant::now();

        for i in 0..PRUNE_THRESHOLD as u32 {
            limiter.check_at(IpAddr::V4(Ipv4Addr::from(i)), now).await;
        }
        limiter.check_at(CLIENT, now + Duration::from_secs(120)).await;

        assert_eq!(limiter.windows.lock().await.len(), 1);
    }
}
