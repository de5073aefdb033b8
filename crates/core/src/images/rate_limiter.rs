use std::{collections::VecDeque, time::Duration};

use tokio::{
    sync::Mutex,
    time::{Instant, sleep},
};

/// Sliding-window limiter shared by every image job.
///
/// Allows at most `max_requests` acquisitions in any rolling `window`, and
/// spaces consecutive acquisitions at least `window / max_requests` apart.
pub struct RateLimiter {
    max_requests: usize,
    window: Duration,
    min_spacing: Duration,
    sent: Mutex<VecDeque<Instant>>,
}

impl RateLimiter {
    pub fn new(max_requests: usize, window: Duration) -> Self {
        let max_requests = max_requests.max(1);
        Self {
            max_requests,
            window,
            min_spacing: window / max_requests as u32,
            sent: Mutex::new(VecDeque::with_capacity(max_requests)),
        }
    }

    pub fn per_minute(max_requests: usize) -> Self {
        Self::new(max_requests, Duration::from_secs(60))
    }

    /// Waits until a request may be sent and records it.
    pub async fn acquire(&self) {
        loop {
            let wait = {
                let mut sent = self.sent.lock().await;
                let now = Instant::now();
                while sent
                    .front()
                    .is_some_and(|first| now.duration_since(*first) >= self.window)
                {
                    sent.pop_front();
                }

                let until_window = match sent.front() {
                    Some(first) if sent.len() >= self.max_requests => {
                        (*first + self.window).saturating_duration_since(now)
                    }
                    _ => Duration::ZERO,
                };
                let until_spacing = sent
                    .back()
                    .map(|last| (*last + self.min_spacing).saturating_duration_since(now))
                    .unwrap_or(Duration::ZERO);

                let wait = until_window.max(until_spacing);
                if wait.is_zero() {
                    sent.push_back(now);
                    return;
                }
                wait
            };
            sleep(wait).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use futures_util::future::join_all;

    use super::*;

    #[tokio::test(start_paused = true)]
    async fn burst_never_exceeds_window_limit() {
        let limiter = Arc::new(RateLimiter::per_minute(100));
        let started = Instant::now();

        let calls = (0..150).map(|_| {
            let limiter = Arc::clone(&limiter);
            async move {
                limiter.acquire().await;
                Instant::now()
            }
        });
        let mut times = join_all(calls).await;
        times.sort();

        for pair in times.windows(101) {
            assert!(pair[100].duration_since(pair[0]) >= Duration::from_secs(60));
        }
        assert_eq!(times[0], started);
    }

    #[tokio::test(start_paused = true)]
    async fn consecutive_requests_are_spaced() {
        let limiter = RateLimiter::new(10, Duration::from_secs(10));
        let mut previous = None;
        for _ in 0..5 {
            limiter.acquire().await;
            let now = Instant::now();
            if let Some(previous) = previous {
                assert!(now.duration_since(previous) >= Duration::from_secs(1));
            }
            previous = Some(now);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn idle_limiter_does_not_wait() {
        let limiter = RateLimiter::per_minute(100);
        limiter.acquire().await;
        sleep(Duration::from_secs(5)).await;
        let before = Instant::now();
        limiter.acquire().await;
        assert_eq!(Instant::now(), before);
    }
}
