//! Agent errors.

use thiserror::Error;

/// Failure reported by a capability provider.
///
/// Every variant is classified as either retryable (transport or timeout class)
/// or terminal (retrying cannot change the outcome).
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("Agent not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Agent execution failed: {0}")]
    ExecutionFailed(String),

    #[error("Agent rejected the step: {0}")]
    Fatal(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Timeout after {0} ms")]
    Timeout(u64),

    #[error("Agent was cancelled")]
    Cancelled,
}

impl AgentError {
    /// Shorthand for a retryable execution failure.
    pub fn retryable(message: impl Into<String>) -> Self {
        Self::ExecutionFailed(message.into())
    }

    /// Shorthand for a terminal execution failure.
    pub fn terminal(message: impl Into<String>) -> Self {
        Self::Fatal(message.into())
    }

    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::ExecutionFailed(_) | Self::Network(_) | Self::Timeout(_)
        )
    }
}
