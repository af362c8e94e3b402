//! Simulated typing latency.

use rand::Rng;
use std::time::Duration;

use crate::error::{ChatError, Result};

/// Half-open range `[min, max)` the reply delay is drawn from uniformly.
///
/// `min == max` yields a fixed delay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplyDelay {
    min: Duration,
    max: Duration,
}

impl ReplyDelay {
    pub const DEFAULT_MIN: Duration = Duration::from_millis(1000);
    pub const DEFAULT_MAX: Duration = Duration::from_millis(3000);

    pub fn new(min: Duration, max: Duration) -> Result<Self> {
        if min > max {
            return Err(ChatError::InvalidDelay {
                min_ms: min.as_millis(),
                max_ms: max.as_millis(),
            });
        }
        Ok(Self { min, max })
    }

    pub fn fixed(delay: Duration) -> Self {
        Self {
            min: delay,
            max: delay,
        }
    }

    /// No delay at all.
    pub fn immediate() -> Self {
        Self::fixed(Duration::ZERO)
    }

    pub fn min(&self) -> Duration {
        self.min
    }

    pub fn max(&self) -> Duration {
        self.max
    }

    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Duration {
        if self.min == self.max {
            return self.min;
        }
        rng.gen_range(self.min..self.max)
    }
}

impl Default for ReplyDelay {
    fn default() -> Self {
        Self {
            min: Self::DEFAULT_MIN,
            max: Self::DEFAULT_MAX,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_default_samples_stay_in_range() {
        let delay = ReplyDelay::default();
        let mut rng = StdRng::seed_from_u64(42);

        for _ in 0..1_000 {
            let d = delay.sample(&mut rng);
            assert!(d >= Duration::from_millis(1000));
            assert!(d < Duration::from_millis(3000));
        }
    }

    #[test]
    fn test_fixed_delay_is_constant() {
        let delay = ReplyDelay::fixed(Duration::from_millis(250));
        assert_eq!(delay.sample(&mut rand::thread_rng()), Duration::from_millis(250));
    }

    #[test]
    fn test_inverted_bounds_are_rejected() {
        let result = ReplyDelay::new(Duration::from_secs(3), Duration::from_secs(1));
        assert!(matches!(
            result,
            Err(ChatError::InvalidDelay { min_ms: 3000, max_ms: 1000 })
        ));
    }
}
