use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};

/// Per-`(scope, model)` sliding-window admission state for
/// `rate_aware_admit` (§4.D, optional rate-limit budget per provider/model).
#[derive(Debug, Clone, Copy)]
struct RateWindow {
    window_start: DateTime<Utc>,
    count: u32,
    backoff_until: Option<DateTime<Utc>>,
}

pub struct RateLimiter {
    windows: HashMap<String, RateWindow>,
    window_len: Duration,
    max_per_window: u32,
    backoff: Duration,
}

impl RateLimiter {
    pub fn new(max_per_window: u32, window_len: Duration, backoff: Duration) -> Self {
        RateLimiter {
            windows: HashMap::new(),
            window_len,
            max_per_window,
            backoff,
        }
    }

    pub fn default_limiter() -> Self {
        RateLimiter::new(60, Duration::minutes(1), Duration::seconds(5))
    }

    /// Returns `Ok(())` if admitted, or `Err(backoff_until)` if the caller
    /// should wait. Advances the window and count as a side effect of a
    /// successful admit.
    pub fn admit(&mut self, scope_key: &str, model: &str, now: DateTime<Utc>) -> Result<(), DateTime<Utc>> {
        let key = format!("{scope_key}:{model}");
        let window = self.windows.entry(key).or_insert(RateWindow {
            window_start: now,
            count: 0,
            backoff_until: None,
        });

        if let Some(until) = window.backoff_until {
            if now < until {
                return Err(until);
            }
            window.backoff_until = None;
        }

        if now.signed_duration_since(window.window_start) >= self.window_len {
            window.window_start = now;
            window.count = 0;
        }

        if window.count >= self.max_per_window {
            let until = now + self.backoff;
            window.backoff_until = Some(until);
            return Err(until);
        }

        window.count += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admits_under_limit_and_backs_off_when_exceeded() {
        let mut limiter = RateLimiter::new(2, Duration::minutes(1), Duration::seconds(10));
        let now = Utc::now();
        assert!(limiter.admit("task:1", "claude-3-haiku", now).is_ok());
        assert!(limiter.admit("task:1", "claude-3-haiku", now).is_ok());
        let err = limiter.admit("task:1", "claude-3-haiku", now);
        assert!(err.is_err());
    }

    #[test]
    fn window_resets_after_expiry() {
        let mut limiter = RateLimiter::new(1, Duration::seconds(30), Duration::seconds(5));
        let t0 = Utc::now();
        assert!(limiter.admit("task:1", "gpt-4o", t0).is_ok());
        let t1 = t0 + Duration::seconds(31);
        assert!(limiter.admit("task:1", "gpt-4o", t1).is_ok());
    }
}
