//! Recorded step failures.

use serde::{Deserialize, Serialize};

use super::AgentError;

/// Classification of a recorded step failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepErrorKind {
    AgentNotFound,
    InvalidInput,
    Execution,
    Timeout,
    RetryBudgetExhausted,
    /// Skipped because a step it depends on failed.
    UpstreamFailed,
    Cancelled,
}

/// Serializable error stored on a step and carried by `step.failed` events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepError {
    pub kind: StepErrorKind,
    pub message: String,
    pub retryable: bool,
}

impl StepError {
    pub fn new(kind: StepErrorKind, message: impl Into<String>, retryable: bool) -> Self {
        Self {
            kind,
            message: message.into(),
            retryable,
        }
    }

    /// Wraps the last attempt's error once no retries remain.
    pub fn exhausted(last: &StepError, budget: u32) -> Self {
        Self::new(
            StepErrorKind::RetryBudgetExhausted,
            format!("retry budget of {} exhausted: {}", budget, last.message),
            false,
        )
    }

    pub fn cancelled(message: impl Into<String>) -> Self {
        Self::new(StepErrorKind::Cancelled, message, false)
    }

    pub fn upstream_failed(message: impl Into<String>) -> Self {
        Self::new(StepErrorKind::UpstreamFailed, message, false)
    }
}

impl std::fmt::Display for StepError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl From<&AgentError> for StepError {
    fn from(err: &AgentError) -> Self {
        let kind = match err {
            AgentError::NotFound(_) => StepErrorKind::AgentNotFound,
            AgentError::InvalidInput(_) => StepErrorKind::InvalidInput,
            AgentError::Timeout(_) => StepErrorKind::Timeout,
            AgentError::Cancelled => StepErrorKind::Cancelled,
            AgentError::ExecutionFailed(_) | AgentError::Fatal(_) | AgentError::Network(_) => {
                StepErrorKind::Execution
            }
        };
        Self::new(kind, err.to_string(), err.is_retryable())
    }
}
