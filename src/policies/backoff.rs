// ABOUTME: Retry delay computation with constant, linear and exponential strategies
// ABOUTME: Applies optional jitter and clamps delays to a fixed floor and ceiling

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// How retry delays grow with the attempt number.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum BackoffStrategy {
    /// Every retry waits the base delay.
    Constant,
    /// Delay grows as `base × attempt`.
    Linear,
    /// Delay grows as `base × multiplier^(attempt − 1)`.
    Exponential { multiplier: f64 },
}

/// Retry delay policy.
///
/// Jitter perturbs the computed delay by at most ±10%, and the jittered
/// result is clamped to `[floor, max_delay]`, so no delay ever escapes those
/// bounds. Delays never feed back into the next computation; each attempt
/// derives its delay from the attempt number alone.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BackoffPolicy {
    pub strategy: BackoffStrategy,
    pub max_delay: Duration,
    pub jitter: bool,
}

/// Minimum delay between attempts, whatever the strategy computes.
const DELAY_FLOOR: Duration = Duration::from_millis(100);

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            strategy: BackoffStrategy::Exponential { multiplier: 2.0 },
            max_delay: Duration::from_secs(60),
            jitter: true,
        }
    }
}

impl BackoffPolicy {
    /// Computes the delay before retry number `attempt` (1-indexed).
    pub fn delay(&self, base: Duration, attempt: u32) -> Duration {
        let attempt = attempt.max(1);
        let base_secs = base.as_secs_f64();

        let raw_secs = match self.strategy {
            BackoffStrategy::Constant => base_secs,
            BackoffStrategy::Linear => base_secs * attempt as f64,
            BackoffStrategy::Exponential { multiplier } => {
                let exp = (attempt - 1).min(i32::MAX as u32) as i32;
                base_secs * multiplier.powi(exp)
            }
        };

        let jittered_secs = if self.jitter {
            raw_secs * jitter_factor()
        } else {
            raw_secs
        };

        let max_secs = self.max_delay.as_secs_f64();
        if !jittered_secs.is_finite() || jittered_secs > max_secs {
            self.max_delay
        } else {
            Duration::from_secs_f64(jittered_secs).max(DELAY_FLOOR)
        }
    }
}

/// Random factor in [0.9, 1.1] to avoid synchronized retries across sibling
/// tasks.
fn jitter_factor() -> f64 {
    rand::thread_rng().gen_range(0.9..=1.1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exponential(jitter: bool) -> BackoffPolicy {
        BackoffPolicy {
            strategy: BackoffStrategy::Exponential { multiplier: 2.0 },
            max_delay: Duration::from_secs(60),
            jitter,
        }
    }

    #[test]
    fn test_exponential_growth() {
        let policy = exponential(false);
        let base = Duration::from_secs(1);

        assert_eq!(policy.delay(base, 1), Duration::from_secs(1));
        assert_eq!(policy.delay(base, 2), Duration::from_secs(2));
        assert_eq!(policy.delay(base, 3), Duration::from_secs(4));
        assert_eq!(policy.delay(base, 4), Duration::from_secs(8));
    }

    #[test]
    fn test_linear_growth() {
        let policy = BackoffPolicy {
            strategy: BackoffStrategy::Linear,
            max_delay: Duration::from_secs(60),
            jitter: false,
        };
        let base = Duration::from_millis(500);

        assert_eq!(policy.delay(base, 1), Duration::from_millis(500));
        assert_eq!(policy.delay(base, 2), Duration::from_secs(1));
        assert_eq!(policy.delay(base, 3), Duration::from_millis(1500));
    }

    #[test]
    fn test_constant_delay() {
        let policy = BackoffPolicy {
            strategy: BackoffStrategy::Constant,
            max_delay: Duration::from_secs(60),
            jitter: false,
        };
        let base = Duration::from_secs(2);

        for attempt in 1..8 {
            assert_eq!(policy.delay(base, attempt), Duration::from_secs(2));
        }
    }

    #[test]
    fn test_clamped_to_max() {
        let policy = BackoffPolicy {
            strategy: BackoffStrategy::Exponential { multiplier: 2.0 },
            max_delay: Duration::from_secs(5),
            jitter: false,
        };

        assert_eq!(
            policy.delay(Duration::from_secs(1), 20),
            Duration::from_secs(5)
        );
    }

    #[test]
    fn test_floor_applied_to_tiny_bases() {
        let policy = exponential(false);

        assert_eq!(
            policy.delay(Duration::from_millis(1), 1),
            Duration::from_millis(100)
        );
        assert_eq!(policy.delay(Duration::ZERO, 1), Duration::from_millis(100));
    }

    #[test]
    fn test_huge_attempt_does_not_overflow() {
        let policy = exponential(false);
        assert_eq!(
            policy.delay(Duration::from_secs(1), u32::MAX),
            Duration::from_secs(60)
        );
    }

    #[test]
    fn test_jitter_never_escapes_floor_or_ceiling() {
        let policy = BackoffPolicy {
            strategy: BackoffStrategy::Exponential { multiplier: 2.0 },
            max_delay: Duration::from_secs(5),
            jitter: true,
        };

        for _ in 0..200 {
            // 8s before jitter; upward jitter must not push past the ceiling.
            assert!(policy.delay(Duration::from_secs(4), 2) <= Duration::from_secs(5));
            // A zero base lands on the floor, never below it.
            assert!(policy.delay(Duration::ZERO, 1) >= Duration::from_millis(100));
        }
    }

    #[test]
    fn test_jitter_stays_within_ten_percent() {
        let policy = exponential(true);
        let base = Duration::from_secs(1);

        for _ in 0..200 {
            let delay = policy.delay(base, 3); // 4s before jitter
            assert!(delay >= Duration::from_millis(3_600), "delay {:?}", delay);
            assert!(delay <= Duration::from_millis(4_400), "delay {:?}", delay);
        }
    }
}
