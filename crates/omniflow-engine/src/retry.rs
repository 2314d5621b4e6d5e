//! Step retry policy.
//!
//! A failed attempt is retried only when the agent classified the error as
//! retryable and the step still has budget left. The budget counts retries
//! after the first attempt, so `retry_count` never exceeds it.

use std::time::Duration;

use tracing::warn;

use omniflow_config::RetryConfig;
use omniflow_protocols::{AgentError, Step, StepError};

/// Outcome of applying the policy to a failed attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum RetryDecision {
    /// Return the step to `pending` once the delay has elapsed.
    Retry { delay: Duration },

    /// The step fails for good with this error.
    Fail(StepError),
}

/// Retry policy built from [`RetryConfig`].
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    config: RetryConfig,
}

impl RetryPolicy {
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    /// Retries allowed for a step: its own override, else the configured default.
    pub fn budget_for(&self, step: &Step) -> u32 {
        step.metadata.max_retries.unwrap_or(self.config.max_retries)
    }

    /// Attempt timeout for a step.
    pub fn timeout_for(&self, step: &Step) -> Duration {
        step.metadata
            .timeout_ms
            .map(Duration::from_millis)
            .unwrap_or_else(|| self.config.step_timeout())
    }

    /// Undithered backoff before retry number `retry` (1-based).
    fn base_delay_for(&self, retry: u32) -> f64 {
        let exponent = retry.saturating_sub(1).min(i32::MAX as u32) as i32;
        let delay = self.config.base_delay_ms as f64 * self.config.backoff_multiplier.powi(exponent);
        delay.min(self.config.max_delay_ms as f64)
    }

    /// Backoff before retry number `retry` (1-based).
    ///
    /// Jitter only ever adds time, and never more than the gap to the next
    /// retry's base delay, so delays are non-decreasing across retries and
    /// never exceed the configured maximum.
    pub fn delay_for_retry(&self, retry: u32) -> Duration {
        let delay = self.base_delay_for(retry);

        let delay_ms = if self.config.jitter {
            let headroom = (self.base_delay_for(retry.saturating_add(1)) - delay).max(0.0);
            delay + rand_jitter((delay * 0.25).min(headroom))
        } else {
            delay
        };

        Duration::from_millis(delay_ms as u64)
    }

    /// Apply the policy to a failed attempt, updating `retry_count` and `last_error`.
    pub fn on_failure(&self, step: &mut Step, error: &AgentError) -> RetryDecision {
        let last = StepError::from(error);
        let budget = self.budget_for(step);

        let decision = if !last.retryable {
            RetryDecision::Fail(last.clone())
        } else if step.retry_count < budget {
            step.retry_count += 1;
            let delay = self.delay_for_retry(step.retry_count);
            warn!(
                "Step {} failed (attempt {}/{}): {}, retrying in {:?}",
                step.id,
                step.retry_count,
                budget + 1,
                last,
                delay
            );
            RetryDecision::Retry { delay }
        } else {
            RetryDecision::Fail(StepError::exhausted(&last, budget))
        };

        step.last_error = Some(match &decision {
            RetryDecision::Retry { .. } => last,
            RetryDecision::Fail(err) => err.clone(),
        });
        decision
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(RetryConfig::default())
    }
}

/// Non-negative jitter in `[0, max)` from the system clock.
fn rand_jitter(max: f64) -> f64 {
    use std::time::SystemTime;
    let nanos = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| d.subsec_nanos())
        .unwrap_or(0);
    (nanos as f64 / 1_000_000_000.0) * max
}

#[cfg(test)]
#[path = "retry_tests.rs"]
mod tests;
