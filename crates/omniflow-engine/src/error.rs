//! Engine errors.

use thiserror::Error;

use omniflow_protocols::{StoreError, WorkflowStatus};

/// Errors returned by orchestrator operations.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The request was rejected before anything was persisted.
    #[error("Invalid workflow: {0}")]
    InvalidWorkflow(String),

    #[error("Workflow not found: {0}")]
    WorkflowNotFound(String),

    #[error("Invalid transition from {from} to {to}")]
    InvalidTransition {
        from: WorkflowStatus,
        to: WorkflowStatus,
    },

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

pub type EngineResult<T> = Result<T, EngineError>;
