//! Workflow outcome aggregation.

use omniflow_config::FailureConfig;
use omniflow_protocols::{Step, StepKind, StepStatus, Workflow, WorkflowResult, WorkflowStatus};

/// Whether a failed step fails its whole workflow under `policy`.
pub fn fails_workflow(step: &Step, policy: &FailureConfig) -> bool {
    step.status == StepStatus::Failed && !(step.is_optional() && policy.tolerate_optional)
}

/// The first step in plan order that fails the workflow.
pub fn precipitating_failure<'a>(workflow: &'a Workflow, policy: &FailureConfig) -> Option<&'a Step> {
    workflow.steps.iter().find(|s| fails_workflow(s, policy))
}

/// Terminal status and result of a workflow whose steps have all settled.
///
/// The last completed decision step supplies the data and message, falling
/// back to the last completed step. Confidence is the minimum reported by
/// completed steps.
pub fn outcome(workflow: &Workflow, policy: &FailureConfig) -> (WorkflowStatus, WorkflowResult) {
    if workflow.steps.is_empty() {
        return (WorkflowStatus::Completed, WorkflowResult::empty());
    }

    let completed: Vec<&Step> = workflow
        .steps
        .iter()
        .filter(|s| s.status == StepStatus::Completed)
        .collect();

    let headline = completed
        .iter()
        .rev()
        .find(|s| s.kind == StepKind::Decision)
        .or_else(|| completed.last())
        .and_then(|s| s.output.as_ref());

    let data = headline.map(|o| o.data.clone()).unwrap_or_default();

    if let Some(failed) = precipitating_failure(workflow, policy) {
        let reason = failed
            .last_error
            .as_ref()
            .map(|e| e.message.clone())
            .unwrap_or_else(|| "unknown error".to_string());
        let error = format!("step '{}' failed: {}", failed.id, reason);
        let result = WorkflowResult {
            success: false,
            data,
            message: error.clone(),
            confidence: 0.0,
            error: Some(error),
        };
        return (WorkflowStatus::Failed, result);
    }

    let confidence = completed
        .iter()
        .filter_map(|s| s.output.as_ref().and_then(|o| o.confidence))
        .map(clamp_confidence)
        .fold(1.0_f64, f64::min);

    let message = headline
        .and_then(|o| o.message.clone())
        .unwrap_or_else(|| {
            format!(
                "Workflow completed: {} of {} steps succeeded",
                completed.len(),
                workflow.steps.len()
            )
        });

    let success = workflow
        .steps
        .iter()
        .all(|s| s.status == StepStatus::Completed || s.is_optional());

    let result = WorkflowResult {
        success,
        data,
        message,
        confidence,
        error: None,
    };
    (WorkflowStatus::Completed, result)
}

/// Reported confidence forced into [0, 1]. NaN counts as zero.
fn clamp_confidence(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}
