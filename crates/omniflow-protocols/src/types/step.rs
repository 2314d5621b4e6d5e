//! Step types.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::{StepError, StepErrorKind};

/// The fixed kinds of work a step can represent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
    #[serde(alias = "nlp")]
    LanguageUnderstanding,
    Search,
    Call,
    Booking,
    Notification,
    Decision,
}

impl StepKind {
    pub const ALL: [StepKind; 6] = [
        StepKind::LanguageUnderstanding,
        StepKind::Search,
        StepKind::Call,
        StepKind::Booking,
        StepKind::Notification,
        StepKind::Decision,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LanguageUnderstanding => "language_understanding",
            Self::Search => "search",
            Self::Call => "call",
            Self::Booking => "booking",
            Self::Notification => "notification",
            Self::Decision => "decision",
        }
    }
}

impl std::fmt::Display for StepKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Step lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Skipped,
}

impl StepStatus {
    /// No further transition occurs from these states.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Skipped)
    }
}

impl std::fmt::Display for StepStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Skipped => "skipped",
        };
        f.write_str(s)
    }
}

/// Scheduling metadata attached to a step.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct StepMetadata {
    /// Step ids that must be completed or skipped first.
    #[serde(default)]
    pub dependencies: Vec<String>,

    /// Tie-break among simultaneously eligible steps, higher first.
    #[serde(default)]
    pub priority: i32,

    /// A failure of this step does not fail the workflow when tolerance is enabled.
    #[serde(default)]
    pub optional: bool,

    /// Overrides the policy retry budget.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_retries: Option<u32>,

    /// Overrides the policy attempt timeout.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_duration_ms: Option<u64>,
}

/// Output produced by an agent for one step.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StepOutput {
    #[serde(default)]
    pub data: serde_json::Value,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    /// Confidence in [0, 1] reported by the agent, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
}

impl StepOutput {
    pub fn new(data: serde_json::Value) -> Self {
        Self {
            data,
            message: None,
            confidence: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Sets the confidence, clamped to [0, 1].
    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = Some(confidence.clamp(0.0, 1.0));
        self
    }
}

/// One unit of work within a workflow, bound to one agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Step {
    pub id: String,
    pub name: String,
    pub kind: StepKind,
    pub agent: String,
    pub status: StepStatus,

    #[serde(default)]
    pub input: serde_json::Value,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<StepOutput>,

    /// Retries consumed so far.
    #[serde(default)]
    pub retry_count: u32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<StepError>,

    #[serde(default)]
    pub metadata: StepMetadata,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,

    /// Set while a retry backoff is pending; the step is not eligible until it clears.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_attempt_at: Option<DateTime<Utc>>,
}

impl Step {
    pub fn new(id: impl Into<String>, kind: StepKind, agent: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            kind,
            agent: agent.into(),
            status: StepStatus::Pending,
            input: serde_json::Value::Null,
            output: None,
            retry_count: 0,
            last_error: None,
            metadata: StepMetadata::default(),
            started_at: None,
            completed_at: None,
            next_attempt_at: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_input(mut self, input: serde_json::Value) -> Self {
        self.input = input;
        self
    }

    pub fn with_dependencies<I, S>(mut self, deps: I) -> Self
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

    pub fn optional(mut self) -> Self {
        self.metadata.optional = true;
        self
    }

    pub fn is_backing_off(&self) -> bool {
        self.next_attempt_at.is_some()
    }

    /// Skipped because an upstream step failed (or the workflow wound down).
    pub fn is_skipped_by_failure(&self) -> bool {
        self.status == StepStatus::Skipped
            && self.last_error.as_ref().is_some_and(|e| {
                matches!(e.kind, StepErrorKind::UpstreamFailed | StepErrorKind::Cancelled)
            })
    }

    /// Whether this step, as a dependency, unblocks its dependents.
    pub fn satisfies_dependency(&self) -> bool {
        match self.status {
            StepStatus::Completed => true,
            StepStatus::Skipped => !self.is_skipped_by_failure(),
            _ => false,
        }
    }

    /// Whether this step, as a dependency, forces its dependents to be skipped.
    pub fn blocks_dependents(&self) -> bool {
        self.status == StepStatus::Failed || self.is_skipped_by_failure()
    }

    /// Marks the step skipped, recording why.
    pub fn skip(&mut self, error: StepError) {
        self.status = StepStatus::Skipped;
        self.next_attempt_at = None;
        self.completed_at = Some(Utc::now());
        self.last_error = Some(error);
    }

    pub fn is_optional(&self) -> bool {
        self.metadata.optional
    }
}

#[cfg(test)]
#[path = "step_tests.rs"]
mod tests;
