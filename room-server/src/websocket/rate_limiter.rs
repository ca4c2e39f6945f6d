use std::time::{Duration, Instant};

/// Token bucket guarding a single socket.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    tokens: u32,
    capacity: u32,
    refill_every: Duration,
    last_refill: Instant,
}

impl RateLimiter {
    pub fn new() -> Self {
        // Bursts of 30, then one message every 500ms
        Self::with_limits(30, Duration::from_millis(500))
    }

    pub fn with_limits(capacity: u32, refill_every: Duration) -> Self {
        Self {
            tokens: capacity,
            capacity,
            refill_every,
            last_refill: Instant::now(),
        }
    }

    pub fn try_acquire(&mut self) -> bool {
        self.refill();
        if self.tokens == 0 {
            return false;
        }
        self.tokens -= 1;
        true
    }

    fn refill(&mut self) {
        let step = self.refill_every.as_millis().max(1);
        let earned = u32::try_from(self.last_refill.elapsed().as_millis() / step).unwrap_or(u32::MAX);
        if earned == 0 {
            return;
        }
        self.tokens = self.capacity.min(self.tokens.saturating_add(earned));
        if self.tokens == self.capacity {
            self.last_refill = Instant::now();
        } else {
            self.last_refill += self.refill_every * earned;
        }
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}
