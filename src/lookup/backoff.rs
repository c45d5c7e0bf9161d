//! Exponential backoff and randomized pauses
//!
//! Both portals are sensitive to bot-like timing, so every pause between
//! actions is drawn from a [`JitterRange`], and retries back off
//! exponentially with multiplicative jitter.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::trace;

/// Longest single pause or backoff delay a configuration may ask for
pub const MAX_PAUSE_SECS: f64 = 3600.0;

/// Largest jitter fraction a [`BackoffPolicy`] accepts
pub const MAX_JITTER_FRACTION: f64 = 1.0;

/// Seconds to a [`Duration`], clamped to `0..=MAX_PAUSE_SECS`. NaN is zero.
#[must_use]
pub fn pause_duration(secs: f64) -> Duration {
    if secs.is_nan() {
        return Duration::ZERO;
    }
    Duration::from_secs_f64(secs.clamp(0.0, MAX_PAUSE_SECS))
}

/// Closed interval of seconds a randomized pause is drawn from
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct JitterRange {
    pub min_secs: f64,
    pub max_secs: f64,
}

impl JitterRange {
    #[must_use]
    pub const fn new(min_secs: f64, max_secs: f64) -> Self {
        Self { min_secs, max_secs }
    }

    /// A range that never sleeps
    #[must_use]
    pub const fn zero() -> Self {
        Self::new(0.0, 0.0)
    }

    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.min_secs.is_finite()
            && self.max_secs.is_finite()
            && self.min_secs >= 0.0
            && self.min_secs <= self.max_secs
            && self.max_secs <= MAX_PAUSE_SECS
    }

    /// Draw a duration uniformly from the range
    #[must_use]
    pub fn sample(&self) -> Duration {
        if !self.is_valid() || self.max_secs <= self.min_secs {
            return pause_duration(self.min_secs);
        }
        let secs = rand::rng().random_range(self.min_secs..=self.max_secs);
        pause_duration(secs)
    }

    #[must_use]
    pub fn contains(&self, duration: Duration) -> bool {
        let secs = duration.as_secs_f64();
        // float slack for from_secs_f64 rounding
        secs + 1e-9 >= self.min_secs && secs <= self.max_secs + 1e-9
    }

    /// Sleep for a sampled duration and return how long it was
    pub async fn sleep(&self) -> Duration {
        let pause = self.sample();
        if !pause.is_zero() {
            trace!(pause_ms = pause.as_millis() as u64, "jitter pause");
            tokio::time::sleep(pause).await;
        }
        pause
    }
}

/// Exponential backoff with multiplicative jitter
///
/// `delay(n) = min(base * 2^(n-1), max_delay) * (1 + U(jitter_min, jitter_max))`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BackoffPolicy {
    pub base_secs: f64,
    pub max_delay_secs: f64,
    pub jitter_min: f64,
    pub jitter_max: f64,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            base_secs: 2.0,
            max_delay_secs: 30.0,
            jitter_min: 0.1,
            jitter_max: 0.3,
        }
    }
}

impl BackoffPolicy {
    /// A policy that never waits, for callers that drive retries themselves
    #[must_use]
    pub const fn none() -> Self {
        Self {
            base_secs: 0.0,
            max_delay_secs: 0.0,
            jitter_min: 0.0,
            jitter_max: 0.0,
        }
    }

    #[must_use]
    pub fn is_valid(&self) -> bool {
        let finite = [self.base_secs, self.max_delay_secs, self.jitter_min, self.jitter_max]
            .iter()
            .all(|value| value.is_finite());
        finite
            && (0.0..=MAX_PAUSE_SECS).contains(&self.base_secs)
            && (0.0..=MAX_PAUSE_SECS).contains(&self.max_delay_secs)
            && self.jitter_min >= 0.0
            && self.jitter_min <= self.jitter_max
            && self.jitter_max <= MAX_JITTER_FRACTION
    }

    /// Capped exponential term in seconds, before jitter. `attempt` is 1-based.
    #[must_use]
    pub fn exponential_secs(&self, attempt: u32) -> f64 {
        let exponent = attempt.saturating_sub(1).min(63) as i32;
        (self.base_secs * 2f64.powi(exponent)).min(self.max_delay_secs)
    }

    /// Delay for a given attempt and an explicit jitter fraction
    #[must_use]
    pub fn delay_with_jitter(&self, attempt: u32, jitter: f64) -> Duration {
        let exponential = self.exponential_secs(attempt);
        pause_duration(exponential + exponential * jitter)
    }

    /// Delay for a given attempt with a freshly sampled jitter fraction
    #[must_use]
    pub fn delay(&self, attempt: u32) -> Duration {
        let jitter = if self.jitter_max > self.jitter_min {
            rand::rng().random_range(self.jitter_min..=self.jitter_max)
        } else {
            self.jitter_min
        };
        self.delay_with_jitter(attempt, jitter)
    }

    /// Largest delay `delay(attempt)` can produce
    #[must_use]
    pub fn upper_bound(&self, attempt: u32) -> Duration {
        self.delay_with_jitter(attempt, self.jitter_max)
    }

    /// Smallest delay `delay(attempt)` can produce
    #[must_use]
    pub fn lower_bound(&self, attempt: u32) -> Duration {
        self.delay_with_jitter(attempt, self.jitter_min)
    }
}
