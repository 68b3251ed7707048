//! Retry policy for remote calls
//!
//! Exponential backoff from a base delay, doubled per attempt, capped, then
//! perturbed by a multiplicative jitter so concurrent retries spread out.

use rand::Rng;
use std::time::Duration;

/// Upper bound applied before jitter when none is configured
pub const DEFAULT_MAX_BACKOFF: Duration = Duration::from_secs(300);

/// Retry budget and backoff shape
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Additional attempts after the first one
    pub max_retries: u32,
    /// Delay before the first retry
    pub backoff: Duration,
    /// Ceiling for the un-jittered delay
    pub max_backoff: Duration,
    /// Jitter fraction in `[0, 1]`
    pub jitter_factor: f64,
}

impl RetryPolicy {
    /// Create new policy
    #[inline]
    #[must_use]
    pub fn new(max_retries: u32, backoff: Duration, jitter_factor: f64) -> Self {
        Self {
            max_retries,
            backoff,
            max_backoff: DEFAULT_MAX_BACKOFF,
            jitter_factor: if jitter_factor.is_finite() {
                jitter_factor.clamp(0.0, 1.0)
            } else {
                0.0
            },
        }
    }

    /// Policy that never retries
    #[inline]
    #[must_use]
    pub fn none() -> Self {
        Self::new(0, Duration::ZERO, 0.0)
    }

    /// With backoff ceiling
    #[inline]
    #[must_use]
    pub fn with_max_backoff(mut self, max_backoff: Duration) -> Self {
        self.max_backoff = max_backoff;
        self
    }

    /// Whether retry number `attempt` (0-based) is within budget
    #[inline]
    #[must_use]
    pub fn should_retry(&self, attempt: u32) -> bool {
        attempt < self.max_retries
    }

    /// Un-jittered delay before retry number `attempt` (0-based)
    #[must_use]
    pub fn base_delay(&self, attempt: u32) -> Duration {
        let factor = 2_u32.checked_pow(attempt).unwrap_or(u32::MAX);
        self.backoff.saturating_mul(factor).min(self.max_backoff)
    }

    /// Delay before retry number `attempt`, jittered
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let base = self.base_delay(attempt);
        if self.jitter_factor <= 0.0 || base.is_zero() {
            return base;
        }
        let spread = rand::rng().random_range(-self.jitter_factor..=self.jitter_factor);
        jittered(base, spread)
    }
}

/// Scale `base` by `1 + spread`, never below zero
fn jittered(base: Duration, spread: f64) -> Duration {
    base.mul_f64((1.0 + spread).max(0.0))
}
