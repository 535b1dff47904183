//! Send pacing.
//!
//! Providers flag bursts from a single sender, so every gap between
//! consecutive sends goes through a `Pacer`. The dispatcher never skips or
//! shortens a wait.

use std::time::Duration;

use async_trait::async_trait;
use tokio::time::sleep;
use tracing::debug;

/// Suspends the dispatch loop between sends.
#[async_trait]
pub trait Pacer: Send + Sync {
    async fn wait(&self, duration: Duration);
}

/// Pacer backed by the tokio timer; other tasks keep running while it waits.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioPacer;

#[async_trait]
impl Pacer for TokioPacer {
    async fn wait(&self, duration: Duration) {
        debug!(delay_ms = duration.as_millis() as u64, "pacer_wait");
        sleep(duration).await;
    }
}

/// The two pacing tiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pacing {
    /// Gap between consecutive recipients of the same campaign
    pub intra_batch: Duration,
    /// Gap after a campaign, and between retried items
    pub inter_batch: Duration,
}

impl Pacing {
    pub fn from_millis(intra_batch_ms: u64, inter_batch_ms: u64) -> Self {
        Self {
            intra_batch: Duration::from_millis(intra_batch_ms),
            inter_batch: Duration::from_millis(inter_batch_ms),
        }
    }
}

impl Default for Pacing {
    fn default() -> Self {
        Self::from_millis(30_000, 60_000)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::Instant;

    #[tokio::test(start_paused = true)]
    async fn test_tokio_pacer_waits_full_duration() {
        let start = Instant::now();
        TokioPacer.wait(Duration::from_secs(30)).await;
        assert!(start.elapsed() >= Duration::from_secs(30));
    }

    #[tokio::test(start_paused = true)]
    async fn test_tokio_pacer_does_not_block_other_tasks() {
        let other = tokio::spawn(async { 42 });
        let pacer = tokio::spawn(async { TokioPacer.wait(Duration::from_secs(60)).await });

        assert_eq!(other.await.unwrap(), 42);
        pacer.await.unwrap();
    }

    #[test]
    fn test_default_pacing() {
        let pacing = Pacing::default();
        assert_eq!(pacing.intra_batch, Duration::from_secs(30));
        assert_eq!(pacing.inter_batch, Duration::from_secs(60));
    }
}
