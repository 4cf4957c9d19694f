//! Automatic retry policy for transient load failures

use serde::{Deserialize, Serialize};

/// Capped exponential backoff
///
/// Attempt `n` (1-based) waits `base_delay_ms * multiplier^(n-1)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Automatic attempts before surfacing the error
    pub max_retries: u32,
    /// Delay before the first attempt
    pub base_delay_ms: u64,
    /// Growth factor between attempts
    pub multiplier: u32,
}

impl RetryPolicy {
    /// Create default policy (3 attempts at 1s, 2s, 4s)
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With max retries
    #[inline]
    #[must_use]
    pub fn with_max_retries(mut self, max: u32) -> Self {
        self.max_retries = max;
        self
    }

    /// With base delay
    #[inline]
    #[must_use]
    pub fn with_base_delay_ms(mut self, ms: u64) -> Self {
        self.base_delay_ms = ms;
        self
    }

    /// Delay before 1-based `attempt`
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> u64 {
        let factor = u64::from(self.multiplier).saturating_pow(attempt.saturating_sub(1));
        self.base_delay_ms.saturating_mul(factor)
    }

    /// Whether another automatic attempt is allowed after `used` attempts
    #[inline]
    #[must_use]
    pub fn allows(&self, used: u32) -> bool {
        used < self.max_retries
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay_ms: 1_000,
            multiplier: 2,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_backoff_is_one_two_four_seconds() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for(1), 1_000);
        assert_eq!(policy.delay_for(2), 2_000);
        assert_eq!(policy.delay_for(3), 4_000);
        assert!(policy.allows(2));
        assert!(!policy.allows(3));
    }

    #[test]
    fn delay_saturates() {
        let policy = RetryPolicy::default().with_base_delay_ms(u64::MAX);
        assert_eq!(policy.delay_for(5), u64::MAX);
    }
}
