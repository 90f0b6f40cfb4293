use std::time::Duration;

use tracing::debug;

use crate::models::backoff::BackoffConfig;

/// Exponential backoff with optional jitter.
///
/// Each call to [`Backoff::next_delay`] advances the attempt counter until the cap is
/// reached; the delay grows by `factor` per attempt from `min` and never exceeds `max`. With
/// jitter enabled the delay is drawn uniformly from `[min, computed]`.
#[derive(Debug, Clone)]
pub struct Backoff {
    config: BackoffConfig,
    attempt: u32,
}

impl Backoff {
    pub fn new(config: BackoffConfig) -> Self {
        Self { config, attempt: 0 }
    }

    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    pub fn next_delay(&mut self) -> Duration {
        let min_ms = self.config.min.as_millis() as f64;
        let max_ms = self.config.max.as_millis() as f64;

        let exponent = i32::try_from(self.attempt).unwrap_or(i32::MAX);
        let computed = (min_ms * self.config.factor.powi(exponent)).min(max_ms);
        // the counter stops once the cap is reached
        if computed < max_ms {
            self.attempt += 1;
        }

        let delay_ms = if self.config.jitter && computed > min_ms {
            rand::random_range(min_ms..=computed)
        } else {
            computed
        };

        debug!(attempt = self.attempt, delay_ms, "Backoff delay computed");

        Duration::from_millis(delay_ms as u64)
    }

    pub fn reset(&mut self) {
        self.attempt = 0;
    }
}
