//! Engine behaviour configuration (scheduling, retries, failure and cancellation policy).

use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::default_true;

/// Step scheduling configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Maximum steps of one workflow running at the same time. 1 means strictly serial.
    #[serde(default = "default_max_concurrent_steps")]
    pub max_concurrent_steps: usize,
}

fn default_max_concurrent_steps() -> usize {
    4
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_concurrent_steps: default_max_concurrent_steps(),
        }
    }
}

/// Per-step retry policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Retries allowed after the first attempt, unless a step overrides it.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Delay before the first retry.
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    /// Upper bound for any single backoff delay.
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,

    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,

    /// Add up to 25% random jitter to each delay.
    #[serde(default = "default_true")]
    pub jitter: bool,

    /// Attempt timeout, unless a step overrides it.
    #[serde(default = "default_step_timeout_ms")]
    pub step_timeout_ms: u64,
}

fn default_max_retries() -> u32 {
    3
}

fn default_base_delay_ms() -> u64 {
    2_000
}

fn default_max_delay_ms() -> u64 {
    60_000
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

fn default_step_timeout_ms() -> u64 {
    300_000
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            backoff_multiplier: default_backoff_multiplier(),
            jitter: default_true(),
            step_timeout_ms: default_step_timeout_ms(),
        }
    }
}

impl RetryConfig {
    /// Retry policy with no delay between attempts.
    pub fn immediate(max_retries: u32) -> Self {
        Self {
            max_retries,
            base_delay_ms: 0,
            max_delay_ms: 0,
            jitter: false,
            ..Self::default()
        }
    }

    pub fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }

    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms)
    }

    pub fn step_timeout(&self) -> Duration {
        Duration::from_millis(self.step_timeout_ms)
    }
}

/// Workflow-level failure policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailureConfig {
    /// Failures of steps marked optional do not fail the workflow.
    #[serde(default = "default_true")]
    pub tolerate_optional: bool,

    /// Skip all remaining pending steps as soon as a workflow-failing step fails.
    #[serde(default)]
    pub fail_fast: bool,
}

impl Default for FailureConfig {
    fn default() -> Self {
        Self {
            tolerate_optional: default_true(),
            fail_fast: false,
        }
    }
}

/// What happens to in-flight steps when a workflow is cancelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CancellationMode {
    /// Steps are signalled and their eventual outcome is recorded.
    #[default]
    Cooperative,
    /// Steps are signalled, marked skipped immediately, and late results dropped.
    Abandon,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CancellationConfig {
    #[serde(default)]
    pub mode: CancellationMode,
}
