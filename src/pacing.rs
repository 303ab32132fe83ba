//! Pacing between successive calls to rate-sensitive upstreams.
//!
//! The bibliographic search, cover host and books APIs all throttle
//! aggressive clients. Batch jobs space their outbound calls with a fixed
//! minimum interval instead of retrying after rejections.

use async_trait::async_trait;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

/// Trait for pacing outbound upstream calls.
#[async_trait]
pub trait CallPacer: Send + Sync {
    /// Wait until the next upstream call is allowed. Returns immediately on
    /// the first call of a run.
    async fn pace(&self);
}

/// Enforces a minimum interval between successive `pace` returns.
pub struct MinIntervalPacer {
    min_interval: Duration,
    last_call: Mutex<Option<Instant>>,
}

impl MinIntervalPacer {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_call: Mutex::new(None),
        }
    }

    /// Pacer with the default interval used by the batch jobs.
    pub fn with_defaults() -> Self {
        Self::new(Duration::from_millis(300))
    }
}

#[async_trait]
impl CallPacer for MinIntervalPacer {
    async fn pace(&self) {
        let mut last = self.last_call.lock().await;
        if let Some(prev) = *last {
            let elapsed = prev.elapsed();
            if elapsed < self.min_interval {
                tokio::time::sleep(self.min_interval - elapsed).await;
            }
        }
        *last = Some(Instant::now());
    }
}

/// No-op pacer that never waits. Used in tests and when pacing is disabled.
pub struct NoOpPacer;

#[async_trait]
impl CallPacer for NoOpPacer {
    async fn pace(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_first_call_does_not_wait() {
        let pacer = MinIntervalPacer::new(Duration::from_secs(60));
        let start = Instant::now();
        pacer.pace().await;
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_successive_calls_are_spaced() {
        let pacer = MinIntervalPacer::new(Duration::from_millis(50));
        let start = Instant::now();
        pacer.pace().await;
        pacer.pace().await;
        pacer.pace().await;
        // Two paced gaps of at least 50ms each.
        assert!(start.elapsed() >= Duration::from_millis(100));
    }

    #[tokio::test]
    async fn test_elapsed_interval_passes_through() {
        let pacer = MinIntervalPacer::new(Duration::from_millis(20));
        pacer.pace().await;
        tokio::time::sleep(Duration::from_millis(40)).await;
        let start = Instant::now();
        pacer.pace().await;
        // Interval already elapsed while sleeping, no extra wait.
        assert!(start.elapsed() < Duration::from_millis(20));
    }

    #[tokio::test]
    async fn test_no_op_pacer_never_waits() {
        let pacer = NoOpPacer;
        let start = Instant::now();
        for _ in 0..100 {
            pacer.pace().await;
        }
        assert!(start.elapsed() < Duration::from_millis(50));
    }
}
