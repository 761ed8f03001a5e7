//! Fixed-interval rate limiter for provider request pacing.
//!
//! Releases one permit per `interval`: the first permit is immediate, every
//! later one waits until `interval` has passed since the previous release.
//! A zero interval never waits, which is what tests inject.

use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::debug;

/// A fixed-interval permit dispenser.
#[derive(Debug)]
pub struct RateLimiter {
    /// Minimum spacing between consecutive permits
    interval: Duration,
    /// Time the previous permit was released
    last_release: Mutex<Option<Instant>>,
    /// Name for logging
    name: String,
}

impl RateLimiter {
    /// Create a limiter releasing one permit per `interval`.
    ///
    /// # Example
    /// ```
    /// use std::time::Duration;
    /// use dip_scanner::data::RateLimiter;
    ///
    /// let limiter = RateLimiter::fixed_interval("yahoo", Duration::from_secs(1));
    /// assert_eq!(limiter.interval(), Duration::from_secs(1));
    /// ```
    pub fn fixed_interval(name: impl Into<String>, interval: Duration) -> Self {
        Self {
            interval,
            last_release: Mutex::new(None),
            name: name.into(),
        }
    }

    /// Wait for the next permit.
    ///
    /// Callers are serialized on the internal lock, so concurrent callers
    /// are spaced as well.
    pub async fn acquire(&self) {
        let mut last_release = self.last_release.lock().await;

        if let Some(last) = *last_release {
            let elapsed = last.elapsed();
            if elapsed < self.interval {
                let wait_time = self.interval - elapsed;
                debug!(
                    limiter = %self.name,
                    wait_ms = wait_time.as_millis() as u64,
                    "Pacing provider call"
                );
                tokio::time::sleep(wait_time).await;
            }
        }

        *last_release = Some(Instant::now());
    }

    /// Configured spacing between permits.
    pub fn interval(&self) -> Duration {
        self.interval
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_first_acquire_is_immediate() {
        let limiter = RateLimiter::fixed_interval("test", Duration::from_secs(5));
        let start = Instant::now();
        limiter.acquire().await;
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_consecutive_acquires_are_spaced() {
        let limiter = RateLimiter::fixed_interval("test", Duration::from_millis(40));
        let start = Instant::now();
        for _ in 0..3 {
            limiter.acquire().await;
        }
        // two waits of 40ms after the immediate first permit
        assert!(start.elapsed() >= Duration::from_millis(80));
    }

    #[tokio::test]
    async fn test_zero_interval_never_waits() {
        let limiter = RateLimiter::fixed_interval("test", Duration::ZERO);
        let start = Instant::now();
        for _ in 0..100 {
            limiter.acquire().await;
        }
        assert!(start.elapsed() < Duration::from_millis(500));
    }

    #[tokio::test]
    async fn test_slow_callers_are_not_delayed() {
        let limiter = RateLimiter::fixed_interval("test", Duration::from_millis(20));
        limiter.acquire().await;
        tokio::time::sleep(Duration::from_millis(30)).await;
        let start = Instant::now();
        limiter.acquire().await;
        assert!(start.elapsed() < Duration::from_millis(20));
    }
}
