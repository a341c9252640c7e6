use std::sync::{Mutex, MutexGuard};
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use reqwest::header::HeaderMap;
use tokio::time::{sleep, Duration};

/// Longest pause taken while waiting for an exhausted budget to reset.
/// Beyond this the call goes out and the server's 403 is classified instead.
const MAX_RESET_WAIT: Duration = Duration::from_secs(60);

/// Client-side pacing driven by GitHub's rate-limit headers. Never retries a call.
pub struct RateLimiter {
    state: Mutex<RateLimitState>,
    requests_per_minute: u32,
}

struct RateLimitState {
    remaining: Option<u32>,
    reset_at: Option<Instant>,
    requests_this_minute: u32,
    minute_start: Instant,
}

impl RateLimiter {
    /// `requests_per_minute == 0` disables the soft per-minute pacing.
    pub fn new(requests_per_minute: u32) -> Self {
        Self {
            state: Mutex::new(RateLimitState {
                remaining: None,
                reset_at: None,
                requests_this_minute: 0,
                minute_start: Instant::now(),
            }),
            requests_per_minute,
        }
    }

    fn lock(&self) -> MutexGuard<'_, RateLimitState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub async fn wait(&self) {
        if let Some(wait) = self.reset_wait() {
            tracing::info!("Rate limit budget exhausted, waiting {:?}", wait);
            sleep(wait).await;
        }

        if let Some(wait) = self.pacing_wait() {
            tracing::debug!("Soft rate limiting, waiting {:?}", wait);
            sleep(wait).await;
            let mut state = self.lock();
            state.requests_this_minute = 0;
            state.minute_start = Instant::now();
        }

        self.lock().requests_this_minute += 1;
    }

    fn reset_wait(&self) -> Option<Duration> {
        let state = self.lock();
        if state.remaining != Some(0) {
            return None;
        }
        let reset_at = state.reset_at?;
        let wait = reset_at.checked_duration_since(Instant::now())?;
        (wait <= MAX_RESET_WAIT).then_some(wait)
    }

    fn pacing_wait(&self) -> Option<Duration> {
        if self.requests_per_minute == 0 {
            return None;
        }
        let mut state = self.lock();
        let elapsed = state.minute_start.elapsed();
        if elapsed >= Duration::from_secs(60) {
            state.requests_this_minute = 0;
            state.minute_start = Instant::now();
            return None;
        }
        (state.requests_this_minute >= self.requests_per_minute)
            .then(|| Duration::from_secs(60) - elapsed)
    }

    pub fn update_from_headers(&self, headers: &HeaderMap) {
        let Some(remaining) = header_number(headers, "x-ratelimit-remaining") else {
            return;
        };
        let reset = header_number(headers, "x-ratelimit-reset");

        let mut state = self.lock();
        state.remaining = Some(remaining as u32);
        if let Some(reset_timestamp) = reset {
            let now = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_secs())
                .unwrap_or_default();
            state.reset_at = (reset_timestamp > now)
                .then(|| Instant::now() + Duration::from_secs(reset_timestamp - now));
        }
    }

    pub fn remaining(&self) -> Option<u32> {
        self.lock().remaining
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(0)
    }
}

fn header_number(headers: &HeaderMap, name: &str) -> Option<u64> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse().ok())
}
