use crate::types::constants::{MAX_RECONNECT_ATTEMPTS, RECONNECT_BASE_DELAY, RECONNECT_MAX_DELAY};
use std::time::Duration;

/// Exponential backoff for reconnection scheduling.
///
/// The delay after the Nth consecutive failure is `min(base * 2^(N-1), max)`,
/// deterministic (no jitter). After `max_attempts` consecutive failures the
/// backoff is exhausted and no further delay is produced until [`reset`].
///
/// [`reset`]: Backoff::reset
pub struct Backoff {
    attempts: u32,
    base: u64,
    max_delay: u64,
    max_attempts: u32,
}

impl Backoff {
    pub fn new(base_ms: u64, max_delay_ms: u64, max_attempts: u32) -> Self {
        Self {
            attempts: 0,
            base: base_ms,
            max_delay: max_delay_ms,
            max_attempts,
        }
    }

    /// Records one failure and returns the delay before the next attempt,
    /// or `None` once the attempt cap is reached.
    pub fn next_delay(&mut self) -> Option<Duration> {
        self.attempts += 1;
        if self.attempts >= self.max_attempts {
            return None;
        }
        let exp = (self.attempts - 1).min(31);
        let delay = self.base.saturating_mul(1u64 << exp).min(self.max_delay);
        Some(Duration::from_millis(delay))
    }

    /// Consecutive failures recorded so far
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn is_exhausted(&self) -> bool {
        self.attempts >= self.max_attempts
    }

    /// Clears the failure count (called on successful connect and on a fresh
    /// caller-initiated connect)
    pub fn reset(&mut self) {
        self.attempts = 0;
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new(
            RECONNECT_BASE_DELAY,
            RECONNECT_MAX_DELAY,
            MAX_RECONNECT_ATTEMPTS,
        )
    }
}
