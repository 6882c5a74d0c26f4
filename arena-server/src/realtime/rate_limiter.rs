use std::time::{Duration, Instant};

/// Token bucket guarding one realtime connection.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    tokens: u32,
    max_tokens: u32,
    refill_rate: Duration,
    last_refill: Instant,
}

impl RateLimiter {
    pub fn new() -> Self {
        // 30 message burst, one token back every 2 seconds
        Self::new_with_limits(30, Duration::from_secs(2))
    }

    pub fn new_with_limits(max_tokens: u32, refill_rate: Duration) -> Self {
        Self {
            tokens: max_tokens,
            max_tokens,
            refill_rate: refill_rate.max(Duration::from_millis(1)),
            last_refill: Instant::now(),
        }
    }

    pub fn check_rate_limit(&mut self) -> bool {
        self.check_rate_limit_at(Instant::now())
    }

    pub fn check_rate_limit_at(&mut self, now: Instant) -> bool {
        self.refill_tokens(now);

        if self.tokens > 0 {
            self.tokens -= 1;
            true
        } else {
            false
        }
    }

    fn refill_tokens(&mut self, now: Instant) {
        let time_passed = now.saturating_duration_since(self.last_refill);
        let intervals = time_passed.as_millis() / self.refill_rate.as_millis();
        if intervals == 0 {
            return;
        }

        let tokens_to_add = u32::try_from(intervals).unwrap_or(u32::MAX);
        self.tokens = self.tokens.saturating_add(tokens_to_add).min(self.max_tokens);
        // Keep the partial interval so slow trickles still earn tokens
        self.last_refill += self.refill_rate * tokens_to_add.min(self.max_tokens);
        if self.tokens == self.max_tokens {
            self.last_refill = now;
        }
    }

    pub fn remaining_tokens(&self) -> u32 {
        self.tokens
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

    #[test]
    fn test_burst_then_reject() {
        let mut limiter = RateLimiter::new_with_limits(3, Duration::from_secs(1));
        let start = Instant::now();

        assert!(limiter.check_rate_limit_at(start));
        assert!(limiter.check_rate_limit_at(start));
        assert!(limiter.check_rate_limit_at(start));
        assert!(!limiter.check_rate_limit_at(start));
        assert_eq!(limiter.remaining_tokens(), 0);
    }

    #[test]
    fn test_refill_over_time() {
        let mut limiter = RateLimiter::new_with_limits(2, Duration::from_millis(500));
        let start = Instant::now();

        assert!(limiter.check_rate_limit_at(start));
        assert!(limiter.check_rate_limit_at(start));
        assert!(!limiter.check_rate_limit_at(start + Duration::from_millis(400)));

        // Two intervals later the bucket is full again, never above its size
        assert!(limiter.check_rate_limit_at(start + Duration::from_millis(5_000)));
        assert_eq!(limiter.remaining_tokens(), 1);
    }

    #[test]
    fn test_partial_intervals_accumulate() {
        let mut limiter = RateLimiter::new_with_limits(1, Duration::from_millis(1_000));
        let start = Instant::now();

        assert!(limiter.check_rate_limit_at(start));
        assert!(!limiter.check_rate_limit_at(start + Duration::from_millis(600)));
        assert!(limiter.check_rate_limit_at(start + Duration::from_millis(1_100)));
    }
}
