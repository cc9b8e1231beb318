//! Bounded retry with a linearly growing pause

use std::time::Duration;

use crate::config::RetryConfig;
use crate::error::{Error, Result};

/// Retry policy applied to every remote call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    base_delay: Duration,
    delay_increment: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration, delay_increment: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            delay_increment,
        }
    }

    pub fn from_config(config: &RetryConfig) -> Self {
        Self::new(
            config.max_attempts,
            Duration::from_millis(config.base_delay_ms),
            Duration::from_millis(config.delay_increment_ms),
        )
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Pause after the failed attempt `attempt` (zero-based)
    pub fn delay_after(&self, attempt: u32) -> Duration {
        self.base_delay + self.delay_increment * attempt
    }

    /// Run `operation` until it succeeds or attempts run out.
    ///
    /// `on_attempt` fires before every attempt with its zero-based index.
    /// The last error is returned once every attempt failed.
    pub fn run<T, A, F>(&self, mut on_attempt: A, mut operation: F) -> Result<T>
    where
        A: FnMut(u32),
        F: FnMut() -> Result<T>,
    {
        let mut last_error = None;

        for attempt in 0..self.max_attempts {
            on_attempt(attempt);
            match operation() {
                Ok(result) => return Ok(result),
                Err(e) => {
                    if attempt + 1 < self.max_attempts {
                        let delay = self.delay_after(attempt);
                        tracing::warn!(
                            "Request failed (attempt {}/{}), retrying in {:?}: {}",
                            attempt + 1,
                            self.max_attempts,
                            delay,
                            e
                        );
                        std::thread::sleep(delay);
                    }
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| Error::internal("retry loop made no attempt")))
    }
}
