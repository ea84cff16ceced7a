//! Runtime-agnostic reconnect backoff math.

use super::shared::{
    BACKOFF_MULTIPLIER, INITIAL_RETRY_DELAY_MS, MAX_RETRY_ATTEMPTS, MAX_RETRY_DELAY_MS,
};

/// Exponential backoff state used by the session's reconnect loop.
#[derive(Debug, Clone, Copy)]
pub struct BackoffState {
    attempts: u32,
    delay_ms: u64,
    max_attempts: u32,
}

impl Default for BackoffState {
    fn default() -> Self {
        Self::with_max_attempts(MAX_RETRY_ATTEMPTS)
    }
}

impl BackoffState {
    pub fn with_max_attempts(max_attempts: u32) -> Self {
        Self {
            attempts: 0,
            delay_ms: INITIAL_RETRY_DELAY_MS,
            max_attempts,
        }
    }

    /// Start over after a connection epoch reached `OPEN`.
    pub fn reset(&mut self) {
        *self = Self::with_max_attempts(self.max_attempts);
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn is_exhausted(&self) -> bool {
        self.attempts >= self.max_attempts
    }

    /// Advance to the next attempt, updating the delay for the subsequent attempt.
    ///
    /// Returns the delay to wait *before* performing this attempt.
    pub fn next_delay_and_advance(&mut self) -> Option<u64> {
        if self.is_exhausted() {
            return None;
        }

        let current_delay = self.delay_ms;
        self.attempts += 1;
        self.delay_ms =
            ((self.delay_ms as f64) * BACKOFF_MULTIPLIER).min(MAX_RETRY_DELAY_MS as f64) as u64;
        Some(current_delay)
    }
}
