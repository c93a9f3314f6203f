//! # Backoff
//!
//! Exponential requeue delays with jitter, keyed on an object's consecutive
//! error count (`resetCounter`).

use rand::Rng;
use std::time::Duration;

/// Exponential backoff policy
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BackoffPolicy {
    /// Delay for the first retry
    pub base: Duration,
    /// Upper bound for any delay, jitter included
    pub max: Duration,
    pub multiplier: f64,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        use crate::constants::{DEFAULT_BACKOFF_BASE_SECS, DEFAULT_BACKOFF_MAX_SECS};
        Self {
            base: Duration::from_secs(DEFAULT_BACKOFF_BASE_SECS),
            max: Duration::from_secs(DEFAULT_BACKOFF_MAX_SECS),
            multiplier: 2.0,
        }
    }
}

impl BackoffPolicy {
    pub fn new(base: Duration, max: Duration) -> Self {
        Self {
            base,
            max,
            ..Self::default()
        }
    }

    /// Un-jittered delay for the given error count; count 0 and 1 both give `base`
    pub fn delay_for(&self, error_count: u32) -> Duration {
        let exponent = i32::try_from(error_count.saturating_sub(1).min(32)).unwrap_or(32);
        let secs = self.base.as_secs_f64() * self.multiplier.powi(exponent);
        Duration::from_secs_f64(secs.min(self.max.as_secs_f64()))
    }

    /// Delay with 0.5x to 1.5x jitter, still capped at `max`
    pub fn jittered(&self, error_count: u32) -> Duration {
        let jitter = rand::thread_rng().gen_range(0.5..1.5);
        let secs = self.delay_for(error_count).as_secs_f64() * jitter;
        Duration::from_secs_f64(secs.min(self.max.as_secs_f64()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delay_doubles_then_caps() {
        let policy = BackoffPolicy::new(Duration::from_secs(2), Duration::from_secs(30));
        assert_eq!(policy.delay_for(0), Duration::from_secs(2));
        assert_eq!(policy.delay_for(1), Duration::from_secs(2));
        assert_eq!(policy.delay_for(2), Duration::from_secs(4));
        assert_eq!(policy.delay_for(3), Duration::from_secs(8));
        assert_eq!(policy.delay_for(5), Duration::from_secs(30));
        assert_eq!(policy.delay_for(u32::MAX), Duration::from_secs(30));
    }

    #[test]
    fn test_jitter_stays_in_band() {
        let policy = BackoffPolicy::new(Duration::from_secs(4), Duration::from_secs(300));
        for _ in 0..100 {
            let d = policy.jittered(1).as_secs_f64();
            assert!((2.0..6.0).contains(&d), "delay {d} outside jitter band");
        }
        for _ in 0..100 {
            assert!(policy.jittered(40) <= Duration::from_secs(300));
        }
    }
}
