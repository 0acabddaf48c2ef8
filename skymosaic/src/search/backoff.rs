//! Exponential backoff with jitter for overload responses.

use rand::Rng;
use std::time::Duration;

/// Produces successive retry delays.
///
/// Delay `n` is drawn uniformly from `[d/2, d]` where
/// `d = min(base * 2^n, max)`.
#[derive(Debug, Clone)]
pub struct Backoff {
    base: Duration,
    max: Duration,
    attempt: u32,
}

impl Backoff {
    pub fn new(base: Duration, max: Duration) -> Self {
        Self {
            base,
            max: max.max(base),
            attempt: 0,
        }
    }

    /// Number of delays handed out so far.
    pub fn attempts(&self) -> u32 {
        self.attempt
    }

    /// Returns the next delay and advances the sequence.
    pub fn next_delay(&mut self) -> Duration {
        let ceiling = self
            .base
            .checked_mul(1u32 << self.attempt.min(16))
            .map_or(self.max, |d| d.min(self.max));
        self.attempt = self.attempt.saturating_add(1);

        let ceiling_ms = ceiling.as_millis() as u64;
        let floor_ms = ceiling_ms / 2;
        if ceiling_ms == floor_ms {
            return ceiling;
        }
        Duration::from_millis(rand::rng().random_range(floor_ms..=ceiling_ms))
    }
}
