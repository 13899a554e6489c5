use std::collections::VecDeque;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{self, Instant};
use tracing::{debug, info};

/// Sliding-window request pacer: at most `max_requests` calls to
/// [`RateLimiter::acquire`] complete within any `window`.
pub struct RateLimiter {
    max_requests: u32,
    window: Duration,
    recent: Mutex<VecDeque<Instant>>,
}

impl RateLimiter {
    pub fn per_minute(max_requests: u32) -> Self {
        Self::with_window(max_requests, Duration::from_secs(60))
    }

    pub fn with_window(max_requests: u32, window: Duration) -> Self {
        info!(
            "RateLimiter: {} request(s) per {:?}",
            max_requests.max(1),
            window
        );
        Self {
            max_requests: max_requests.max(1),
            window,
            recent: Mutex::new(VecDeque::new()),
        }
    }

    /// Wait until a request slot is free, then claim it.
    pub async fn acquire(&self) {
        let mut recent = self.recent.lock().await;
        loop {
            let now = Instant::now();
            while let Some(&stamp) = recent.front() {
                if now.duration_since(stamp) >= self.window {
                    recent.pop_front();
                } else {
                    break;
                }
            }

            if (recent.len() as u32) < self.max_requests {
                recent.push_back(now);
                return;
            }

            // Window is full: sleep until the oldest request ages out
            if let Some(&oldest) = recent.front() {
                let wake = oldest + self.window;
                debug!(
                    "RateLimiter: limit of {} reached, waiting {:?}",
                    self.max_requests,
                    wake.saturating_duration_since(now)
                );
                time::sleep_until(wake).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_under_limit_does_not_wait() {
        let limiter = RateLimiter::with_window(3, Duration::from_secs(1));
        let start = Instant::now();
        for _ in 0..3 {
            limiter.acquire().await;
        }
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_over_limit_waits_for_window() {
        let limiter = RateLimiter::with_window(2, Duration::from_secs(60));
        let start = Instant::now();
        for _ in 0..3 {
            limiter.acquire().await;
        }
        assert!(start.elapsed() >= Duration::from_secs(60));
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_limit_is_treated_as_one() {
        let limiter = RateLimiter::with_window(0, Duration::from_secs(1));
        let start = Instant::now();
        limiter.acquire().await;
        assert_eq!(start.elapsed(), Duration::ZERO);
        limiter.acquire().await;
        assert!(start.elapsed() >= Duration::from_secs(1));
    }
}
