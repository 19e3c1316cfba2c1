//! Exponential backoff for throttle responses

use rand::Rng;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Exponential backoff calculator with jitter
#[derive(Debug)]
pub struct ExponentialBackoff {
    base_delay: Duration,
    max_delay: Duration,
    /// Consecutive throttles seen since the last reset
    attempt: AtomicU64,
    /// Jitter fraction (0.0 to 0.5) added on top of the computed delay
    jitter: f64,
}

impl ExponentialBackoff {
    pub fn new(base_delay: Duration, max_delay: Duration) -> Self {
        Self::with_jitter(base_delay, max_delay, 0.1)
    }

    pub fn with_jitter(base_delay: Duration, max_delay: Duration, jitter: f64) -> Self {
        Self {
            base_delay,
            max_delay: max_delay.max(base_delay),
            attempt: AtomicU64::new(0),
            jitter: jitter.clamp(0.0, 0.5),
        }
    }

    /// Delay for the next attempt; advances the attempt counter
    pub fn next_delay(&self) -> Duration {
        let attempt = self.attempt.fetch_add(1, Ordering::SeqCst);
        self.calculate_delay(attempt)
    }

    /// `base * 2^attempt`, capped at `max_delay`, plus jitter
    pub fn calculate_delay(&self, attempt: u64) -> Duration {
        let multiplier = 2u64.saturating_pow(attempt.min(16) as u32);
        let delay_ms = (self.base_delay.as_millis() as u64).saturating_mul(multiplier);
        let delay_ms = delay_ms.min(self.max_delay.as_millis() as u64);

        let jitter_range = (delay_ms as f64 * self.jitter) as u64;
        if jitter_range == 0 {
            return Duration::from_millis(delay_ms);
        }

        let jitter_value = rand::thread_rng().gen_range(0..=jitter_range);
        Duration::from_millis(delay_ms + jitter_value)
    }

    pub fn reset(&self) {
        self.attempt.store(0, Ordering::SeqCst);
    }

    pub fn attempt(&self) -> u64 {
        self.attempt.load(Ordering::SeqCst)
    }
}

impl Default for ExponentialBackoff {
    fn default() -> Self {
        Self::new(Duration::from_secs(1), Duration::from_secs(120))
    }
}
