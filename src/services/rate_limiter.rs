use governor::{
    clock::DefaultClock, state::keyed::DefaultKeyedStateStore, Quota, RateLimiter,
};
use std::num::NonZeroU32;
use std::time::Duration;

use crate::errors::{AppError, Result};

type KeyedLimiter = RateLimiter<String, DefaultKeyedStateStore<String>, DefaultClock>;

/// Per-identifier brake on the OTP endpoints. Allows `max_attempts` back to back,
/// then refills one attempt every `window / max_attempts`.
pub struct OtpRateLimiter {
    limiter: KeyedLimiter,
}

impl OtpRateLimiter {
    pub fn new(max_attempts: u32, window: Duration) -> Self {
        let burst = NonZeroU32::new(max_attempts).unwrap_or(NonZeroU32::MIN);
        let period = (window / burst.get()).max(Duration::from_millis(1));
        let quota = Quota::with_period(period)
            .unwrap_or_else(|| Quota::per_second(burst))
            .allow_burst(burst);

        Self {
            limiter: RateLimiter::keyed(quota),
        }
    }

    pub fn check(&self, key: &str) -> Result<()> {
        self.limiter.check_key(&key.to_string()).map_err(|_| {
            tracing::warn!("⚠️ OTP rate limit hit for {}", key);
            AppError::RateLimitExceeded
        })
    }

    /// Drops keys whose limits have fully refilled.
    pub fn prune(&self) {
        self.limiter.retain_recent();
    }

    pub fn tracked_keys(&self) -> usize {
        self.limiter.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_attempts_beyond_the_limit() {
        let limiter = OtpRateLimiter::new(5, Duration::from_secs(15 * 60));

        for _ in 0..5 {
            limiter.check("+911234567890").unwrap();
        }
        let err = limiter.check("+911234567890").unwrap_err();
        assert!(matches!(err, AppError::RateLimitExceeded));

        // other identifiers are unaffected
        assert!(limiter.check("+919999999999").is_ok());
        assert_eq!(limiter.tracked_keys(), 2);
    }

    #[tokio::test]
    async fn attempts_refill_over_the_window() {
        let limiter = OtpRateLimiter::new(2, Duration::from_millis(400));

        limiter.check("a@b.in").unwrap();
        limiter.check("a@b.in").unwrap();
        assert!(limiter.check("a@b.in").is_err());

        tokio::time::sleep(Duration::from_millis(250)).await;
        assert!(limiter.check("a@b.in").is_ok());
    }

    #[test]
    fn zero_limit_still_allows_one_attempt() {
        let limiter = OtpRateLimiter::new(0, Duration::from_secs(60));
        assert!(limiter.check("key").is_ok());
        assert!(limiter.check("key").is_err());
    }
}
