//! Workflow creation requests.
//!
//! A request is the planner's output: the typed steps a workflow should run.
//! It carries no runtime state; [`crate::Workflow::from_request`] turns it into
//! a fresh `pending` workflow.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::{Metadata, StepKind, StepMetadata, WorkflowPriority, WorkflowType};

/// Declared step within a [`WorkflowRequest`].
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct StepSpec {
    pub id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    pub kind: StepKind,

    pub agent: String,

    #[serde(default)]
    pub input: serde_json::Value,

    #[serde(default)]
    pub metadata: StepMetadata,
}

impl StepSpec {
    pub fn new(id: impl Into<String>, kind: StepKind, agent: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: None,
            kind,
            agent: agent.into(),
            input: serde_json::Value::Null,
            metadata: StepMetadata::default(),
        }
    }

    pub fn with_input(mut self, input: serde_json::Value) -> Self {
        self.input = input;
        self
    }

    pub fn depends_on<I, S>(mut self, deps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.metadata.dependencies = deps.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.metadata.priority = priority;
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.metadata.max_retries = Some(max_retries);
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.metadata.timeout_ms = Some(timeout_ms);
        self
    }

    pub fn with_estimate_ms(mut self, estimate: u64) -> Self {
        self.metadata.estimated_duration_ms = Some(estimate);
        self
    }

    pub fn optional(mut self) -> Self {
        self.metadata.optional = true;
        self
    }
}

/// Request to create a workflow.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct WorkflowRequest {
    pub owner_id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,

    #[serde(default)]
    pub workflow_type: WorkflowType,

    #[serde(default)]
    pub priority: WorkflowPriority,

    /// The natural-language request the plan was derived from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request: Option<String>,

    #[serde(default)]
    pub steps: Vec<StepSpec>,

    #[serde(default)]
    pub metadata: Metadata,
}

impl WorkflowRequest {
    pub fn new(owner_id: impl Into<String>) -> Self {
        Self {
            owner_id: owner_id.into(),
            session_id: None,
            workflow_type: WorkflowType::default(),
            priority: WorkflowPriority::default(),
            request: None,
            steps: Vec::new(),
            metadata: Metadata::new(),
        }
    }

    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    pub fn with_type(mut self, workflow_type: WorkflowType) -> Self {
        self.workflow_type = workflow_type;
        self
    }

    pub fn with_priority(mut self, priority: WorkflowPriority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_request_text(mut self, text: impl Into<String>) -> Self {
        self.request = Some(text.into());
        self
    }

    pub fn step(mut self, step: StepSpec) -> Self {
        self.steps.push(step);
        self
    }
}
