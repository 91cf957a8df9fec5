// ABOUTME: Process-wide two-window token bucket guarding outbound provider calls
// ABOUTME: Adapted from the per-IP OAuth2 rate limiter's Arc<Mutex<state>> shape to one shared bucket

use std::time::{Duration, Instant};

use tokio::sync::Mutex;
use tokio::time::sleep;

use trailtime_core::constants::{
    PROVIDER_RATE_LIMIT_DAILY_WINDOW_REQUESTS, PROVIDER_RATE_LIMIT_DAILY_WINDOW_SECS,
    PROVIDER_RATE_LIMIT_SHORT_WINDOW_REQUESTS, PROVIDER_RATE_LIMIT_SHORT_WINDOW_SECS,
};

struct Window {
    limit: u32,
    period: Duration,
    count: u32,
    window_start: Instant,
}

impl Window {
    fn new(limit: u32, period: Duration) -> Self {
        Self { limit, period, count: 0, window_start: Instant::now() }
    }

    /// Roll the window forward if its period has elapsed, then report how long
    /// the caller must wait (`Some(duration)`) or that it may proceed now (`None`).
    fn check(&mut self, now: Instant) -> Option<Duration> {
        if now.duration_since(self.window_start) >= self.period {
            self.count = 0;
            self.window_start = now;
        }

        if self.count < self.limit {
            self.count += 1;
            None
        } else {
            let elapsed = now.duration_since(self.window_start);
            Some(self.period.saturating_sub(elapsed))
        }
    }
}

struct RateLimiterState {
    short: Window,
    daily: Window,
}

/// A process-wide token bucket sized to the activity provider's published
/// rate limit windows. Every `ProviderClient` call acquires from the same
/// instance before issuing HTTP, so the limit is shared across all users.
pub struct RateLimiter {
    state: Mutex<RateLimiterState>,
}

impl RateLimiter {
    /// A rate limiter sized to the provider's documented limits
    /// (200 req / 15 min, 2000 req / 24 h).
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Mutex::new(RateLimiterState {
                short: Window::new(
                    PROVIDER_RATE_LIMIT_SHORT_WINDOW_REQUESTS,
                    Duration::from_secs(PROVIDER_RATE_LIMIT_SHORT_WINDOW_SECS),
                ),
                daily: Window::new(
                    PROVIDER_RATE_LIMIT_DAILY_WINDOW_REQUESTS,
                    Duration::from_secs(PROVIDER_RATE_LIMIT_DAILY_WINDOW_SECS),
                ),
            }),
        }
    }

    /// Block until both windows have room, then consume one slot from each.
    /// Never drops the call — back-pressure, not rejection.
    pub async fn acquire(&self) {
        loop {
            let wait = {
                let mut state = self.state.lock().await;
                let now = Instant::now();
                match (state.short.check(now), state.daily.check(now)) {
                    (None, None) => return,
                    (Some(d), None) | (None, Some(d)) => Some(d),
                    (Some(a), Some(b)) => Some(a.max(b)),
                }
            };
            if let Some(duration) = wait {
                sleep(duration).await;
            }
        }
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn acquire_never_exceeds_the_short_window_limit_without_waiting() {
        let limiter = RateLimiter::new();
        for _ in 0..PROVIDER_RATE_LIMIT_SHORT_WINDOW_REQUESTS {
            limiter.acquire().await;
        }
        // The (limit + 1)th acquire would block until the window rolls; we only
        // assert the bucket accounts correctly up to the limit.
        let state = limiter.state.lock().await;
        assert_eq!(state.short.count, PROVIDER_RATE_LIMIT_SHORT_WINDOW_REQUESTS);
    }

    #[test]
    fn window_rolls_over_after_its_period_elapses() {
        let mut window = Window::new(1, Duration::from_millis(1));
        let now = Instant::now();
        assert!(window.check(now).is_none());
        assert!(window.check(now).is_some());
        std::thread::sleep(Duration::from_millis(5));
        assert!(window.check(Instant::now()).is_none());
    }
}
