//! Workflow lifecycle events.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::StepError;
use crate::types::{StepOutput, WorkflowResult};

/// Envelope for every event emitted by the orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowEvent {
    pub workflow_id: String,
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub kind: WorkflowEventKind,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum WorkflowEventKind {
    #[serde(rename = "workflow.created")]
    WorkflowCreated { owner_id: String, step_count: usize },

    #[serde(rename = "workflow.started")]
    WorkflowStarted,

    #[serde(rename = "step.started")]
    StepStarted {
        step_id: String,
        agent: String,
        attempt: u32,
    },

    #[serde(rename = "step.completed")]
    StepCompleted { step_id: String, output: StepOutput },

    #[serde(rename = "step.failed")]
    StepFailed {
        step_id: String,
        error: StepError,
        retry_count: u32,
        will_retry: bool,
    },

    #[serde(rename = "step.skipped")]
    StepSkipped { step_id: String, reason: String },

    #[serde(rename = "workflow.paused")]
    WorkflowPaused,

    #[serde(rename = "workflow.resumed")]
    WorkflowResumed,

    #[serde(rename = "workflow.completed")]
    WorkflowCompleted { result: WorkflowResult },

    #[serde(rename = "workflow.failed")]
    WorkflowFailed { error: String, result: WorkflowResult },

    #[serde(rename = "workflow.cancelled")]
    WorkflowCancelled,
}

impl WorkflowEvent {
    pub fn new(workflow_id: impl Into<String>, kind: WorkflowEventKind) -> Self {
        Self {
            workflow_id: workflow_id.into(),
            timestamp: Utc::now(),
            kind,
        }
    }

    /// Dotted event type, e.g. `step.started`.
    pub fn event_type(&self) -> &'static str {
        match &self.kind {
            WorkflowEventKind::WorkflowCreated { .. } => "workflow.created",
            WorkflowEventKind::WorkflowStarted => "workflow.started",
            WorkflowEventKind::StepStarted { .. } => "step.started",
            WorkflowEventKind::StepCompleted { .. } => "step.completed",
            WorkflowEventKind::StepFailed { .. } => "step.failed",
            WorkflowEventKind::StepSkipped { .. } => "step.skipped",
            WorkflowEventKind::WorkflowPaused => "workflow.paused",
            WorkflowEventKind::WorkflowResumed => "workflow.resumed",
            WorkflowEventKind::WorkflowCompleted { .. } => "workflow.completed",
            WorkflowEventKind::WorkflowFailed { .. } => "workflow.failed",
            WorkflowEventKind::WorkflowCancelled => "workflow.cancelled",
        }
    }

    /// The step this event concerns, if any.
    pub fn step_id(&self) -> Option<&str> {
        match &self.kind {
            WorkflowEventKind::StepStarted { step_id, .. }
            | WorkflowEventKind::StepCompleted { step_id, .. }
            | WorkflowEventKind::StepFailed { step_id, .. }
            | WorkflowEventKind::StepSkipped { step_id, .. } => Some(step_id),
            _ => None,
        }
    }

    /// Whether this event ends the workflow.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self.kind,
            WorkflowEventKind::WorkflowCompleted { .. }
                | WorkflowEventKind::WorkflowFailed { .. }
                | WorkflowEventKind::WorkflowCancelled
        )
    }
}

/// Consumer of workflow events (notification relay, audit log, ...).
#[async_trait]
pub trait EventSink: Send + Sync {
    fn name(&self) -> &str;

    async fn publish(&self, event: &WorkflowEvent);
}
