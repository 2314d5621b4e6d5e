//! Agent protocol definitions.
//!
//! Agents are the capability providers that execute individual steps
//! (search, outbound calls, bookings, ...). The engine only knows them
//! through this contract.

use async_trait::async_trait;
use std::collections::HashMap;
use tokio_util::sync::CancellationToken;

use crate::error::AgentError;
use crate::types::{StepKind, StepOutput};

/// Core trait for capability providers.
#[async_trait]
pub trait Agent: Send + Sync {
    /// Returns the name the agent is registered under.
    fn name(&self) -> &str;

    /// The step kind this agent is specialized for, if any.
    fn kind(&self) -> Option<StepKind> {
        None
    }

    /// Execute one attempt of a step.
    ///
    /// Implementations should observe `ctx.cancel` and stop early when it fires.
    async fn execute(&self, input: StepInput, ctx: AgentContext) -> Result<StepOutput, AgentError>;
}

/// Input handed to an agent for one step attempt.
#[derive(Debug, Clone)]
pub struct StepInput {
    pub workflow_id: String,
    pub step_id: String,
    pub kind: StepKind,

    /// Opaque payload declared on the step.
    pub payload: serde_json::Value,

    /// 1-based attempt number.
    pub attempt: u32,

    /// Output data of the step's dependencies, keyed by step id.
    pub upstream: HashMap<String, serde_json::Value>,
}

impl StepInput {
    pub fn new(
        workflow_id: impl Into<String>,
        step_id: impl Into<String>,
        kind: StepKind,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            workflow_id: workflow_id.into(),
            step_id: step_id.into(),
            kind,
            payload,
            attempt: 1,
            upstream: HashMap::new(),
        }
    }

    pub fn with_attempt(mut self, attempt: u32) -> Self {
        self.attempt = attempt;
        self
    }

    pub fn with_upstream(mut self, step_id: impl Into<String>, data: serde_json::Value) -> Self {
        self.upstream.insert(step_id.into(), data);
        self
    }

    /// Looks up a top-level field of the payload.
    pub fn field(&self, key: &str) -> Option<&serde_json::Value> {
        self.payload.get(key)
    }

    /// Looks up a string field of the payload, returning `InvalidInput` when absent.
    pub fn require_str(&self, key: &str) -> Result<&str, AgentError> {
        self.field(key)
            .and_then(|v| v.as_str())
            .ok_or_else(|| AgentError::InvalidInput(format!("missing string field '{}'", key)))
    }
}

/// Context for one agent invocation.
#[derive(Clone)]
pub struct AgentContext {
    pub owner_id: String,
    pub session_id: Option<String>,

    /// Fires when the owning workflow is cancelled.
    pub cancel: CancellationToken,
}

impl AgentContext {
    pub fn new(owner_id: impl Into<String>) -> Self {
        Self {
            owner_id: owner_id.into(),
            session_id: None,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_session(mut self, session_id: Option<String>) -> Self {
        self.session_id = session_id;
        self
    }

    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

#[cfg(test)]
#[path = "agent_tests.rs"]
mod tests;
