//! Workflow types.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::{Metadata, Step, StepStatus, WorkflowRequest, new_id};

/// Domain category of a workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum WorkflowType {
    Booking,
    Scheduling,
    Travel,
    #[default]
    General,
    System,
}

/// Workflow urgency, higher is more urgent.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum WorkflowPriority {
    Low = 0,
    #[default]
    Normal = 1,
    High = 2,
    Urgent = 3,
}

/// Workflow lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkflowStatus {
    Pending,
    Running,
    Paused,
    Completed,
    Failed,
    Cancelled,
}

impl WorkflowStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Paused => "paused",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }

    /// Allowed edges of the workflow state machine.
    ///
    /// A paused workflow may still settle to completed/failed when its last
    /// in-flight steps finish while paused.
    pub fn can_transition_to(&self, next: WorkflowStatus) -> bool {
        use WorkflowStatus::*;
        matches!(
            (self, next),
            (Pending, Running)
                | (Pending, Cancelled)
                | (Running, Paused)
                | (Running, Completed)
                | (Running, Failed)
                | (Running, Cancelled)
                | (Paused, Running)
                | (Paused, Completed)
                | (Paused, Failed)
                | (Paused, Cancelled)
        )
    }
}

impl std::fmt::Display for WorkflowStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for WorkflowStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "running" => Ok(Self::Running),
            "paused" => Ok(Self::Paused),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            "cancelled" | "canceled" => Ok(Self::Cancelled),
            other => Err(format!("unknown workflow status: {}", other)),
        }
    }
}

/// Aggregated outcome, present only once a workflow is terminal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowResult {
    pub success: bool,

    #[serde(default)]
    pub data: serde_json::Value,

    pub message: String,

    /// Minimum confidence over contributing steps, in [0, 1].
    pub confidence: f64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl WorkflowResult {
    /// Result of a workflow with nothing to do.
    pub fn empty() -> Self {
        Self {
            success: true,
            data: serde_json::Value::Null,
            message: "Workflow has no steps".to_string(),
            confidence: 1.0,
            error: None,
        }
    }

    pub fn cancelled() -> Self {
        Self {
            success: false,
            data: serde_json::Value::Null,
            message: "Workflow cancelled".to_string(),
            confidence: 0.0,
            error: None,
        }
    }
}

/// A workflow and the steps it exclusively owns.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Workflow {
    pub id: String,
    pub owner_id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,

    pub workflow_type: WorkflowType,
    pub priority: WorkflowPriority,
    pub status: WorkflowStatus,

    /// Steps in declared plan order.
    pub steps: Vec<Step>,

    /// Advisory index of the first step still pending. Never used for scheduling.
    #[serde(default)]
    pub current_step: usize,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<WorkflowResult>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,

    #[serde(default)]
    pub estimated_duration_ms: u64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual_duration_ms: Option<u64>,

    #[serde(default)]
    pub metadata: Metadata,
}

impl Workflow {
    /// Builds a fresh `pending` workflow. Does not validate the step graph.
    pub fn from_request(request: WorkflowRequest) -> Self {
        let now = Utc::now();
        let steps: Vec<Step> = request
            .steps
            .into_iter()
            .map(|spec| {
                let mut step = Step::new(spec.id, spec.kind, spec.agent).with_input(spec.input);
                if let Some(name) = spec.name {
                    step.name = name;
                }
                step.metadata = spec.metadata;
                step
            })
            .collect();
        let estimated_duration_ms = steps
            .iter()
            .filter_map(|s| s.metadata.estimated_duration_ms)
            .sum();

        Self {
            id: new_id(),
            owner_id: request.owner_id,
            session_id: request.session_id,
            workflow_type: request.workflow_type,
            priority: request.priority,
            status: WorkflowStatus::Pending,
            steps,
            current_step: 0,
            result: None,
            request: request.request,
            created_at: now,
            updated_at: now,
            started_at: None,
            completed_at: None,
            estimated_duration_ms,
            actual_duration_ms: None,
            metadata: request.metadata,
        }
    }

    pub fn step(&self, id: &str) -> Option<&Step> {
        self.steps.iter().find(|s| s.id == id)
    }

    pub fn step_mut(&mut self, id: &str) -> Option<&mut Step> {
        self.steps.iter_mut().find(|s| s.id == id)
    }

    pub fn count_with_status(&self, status: StepStatus) -> usize {
        self.steps.iter().filter(|s| s.status == status).count()
    }

    /// Whether any step is still pending or running.
    pub fn has_unsettled_steps(&self) -> bool {
        self.steps.iter().any(|s| !s.status.is_terminal())
    }

    /// Recomputes the advisory `current_step` index.
    pub fn refresh_current_step(&mut self) {
        self.current_step = self
            .steps
            .iter()
            .position(|s| s.status == StepStatus::Pending)
            .unwrap_or(self.steps.len());
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    /// Records the terminal status, result, and completion timings.
    pub fn finish(&mut self, status: WorkflowStatus, result: WorkflowResult) {
        let now = Utc::now();
        self.status = status;
        self.result = Some(result);
        self.completed_at = Some(now);
        self.actual_duration_ms = self
            .started_at
            .map(|started| (now - started).num_milliseconds().max(0) as u64);
        self.refresh_current_step();
        self.updated_at = now;
    }
}

#[cfg(test)]
#[path = "workflow_tests.rs"]
mod tests;
