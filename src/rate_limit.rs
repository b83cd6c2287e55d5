use std::time::{Duration, Instant};

use dashmap::DashMap;

const LOGIN_WINDOW: Duration = Duration::from_secs(15 * 60);
const MAX_LOGIN_FAILURES: u32 = 5;

/// Per-email sign-in brute force limiter.
#[derive(Default)]
pub struct LoginRateLimiter {
    /// email -> (failed_count, window_start)
    entries: DashMap<String, (u32, Instant)>,
}

impl LoginRateLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if a sign-in attempt is allowed. Returns the seconds left in the
    /// window when blocked. Does NOT increment the counter, call
    /// `record_failure()` on a bad password.
    pub fn check(&self, email: &str) -> Result<(), u64> {
        let now = Instant::now();

        let Some(entry) = self.entries.get(&email.to_lowercase()) else {
            return Ok(());
        };

        let (count, start) = entry.value();

        if now.duration_since(*start) > LOGIN_WINDOW {
            return Ok(());
        }

        if *count >= MAX_LOGIN_FAILURES {
            let elapsed = now.duration_since(*start).as_secs();
            return Err(LOGIN_WINDOW.as_secs().saturating_sub(elapsed));
        }

        Ok(())
    }

    pub fn record_failure(&self, email: &str) {
        let now = Instant::now();

        let mut entry = self.entries.entry(email.to_lowercase()).or_insert((0, now));
        let (count, start) = entry.value_mut();

        if now.duration_since(*start) > LOGIN_WINDOW {
            *count = 1;
            *start = now;
        } else {
            *count += 1;
        }
    }

    /// Forget the failures for an address after a successful sign-in.
    pub fn reset(&self, email: &str) {
        self.entries.remove(&email.to_lowercase());
    }

    pub fn cleanup(&self, max_age: Duration) {
        let now = Instant::now();
        self.entries.retain(|_, (_, start)| now.duration_since(*start) < max_age);
    }
}
