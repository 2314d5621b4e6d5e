//! Step eligibility.
//!
//! Each scheduling pass first propagates failures: a pending step with a
//! failed (or failure-skipped) dependency is skipped, transitively. Then the
//! eligible steps are picked: pending, not backing off, and with every
//! dependency completed or deliberately skipped. Higher priority goes first,
//! ties keep plan order.

use omniflow_protocols::{StepError, StepStatus, Workflow};

/// What a scheduling pass decided.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct SchedulePass {
    /// Steps newly skipped, with the reason.
    pub skipped: Vec<(String, String)>,

    /// Steps to dispatch, in dispatch order.
    pub ready: Vec<String>,
}

/// Skip every pending step whose dependencies can no longer be satisfied.
///
/// Runs to a fixed point so a failure propagates through the whole chain of
/// dependents in one call.
pub fn cascade_skips(workflow: &mut Workflow) -> Vec<(String, String)> {
    let mut skipped = Vec::new();

    loop {
        let mut newly = Vec::new();
        for step in workflow.steps.iter().filter(|s| s.status == StepStatus::Pending) {
            let blocker = step.metadata.dependencies.iter().find(|dep| {
                workflow
                    .step(dep)
                    .is_some_and(|d| d.blocks_dependents())
            });
            if let Some(blocker) = blocker {
                newly.push((
                    step.id.clone(),
                    format!("dependency '{}' did not complete", blocker),
                ));
            }
        }

        if newly.is_empty() {
            return skipped;
        }

        for (id, reason) in &newly {
            if let Some(step) = workflow.step_mut(id) {
                step.skip(StepError::upstream_failed(reason.clone()));
            }
        }
        skipped.extend(newly);
    }
}

/// Steps eligible to start now, at most `capacity` of them.
pub fn ready_steps(workflow: &Workflow, capacity: usize) -> Vec<String> {
    let mut ready: Vec<(usize, i32, &str)> = workflow
        .steps
        .iter()
        .enumerate()
        .filter(|(_, s)| s.status == StepStatus::Pending && !s.is_backing_off())
        .filter(|(_, s)| {
            s.metadata
                .dependencies
                .iter()
                .all(|dep| workflow.step(dep).is_some_and(|d| d.satisfies_dependency()))
        })
        .map(|(index, s)| (index, s.metadata.priority, s.id.as_str()))
        .collect();

    ready.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
    ready
        .into_iter()
        .take(capacity)
        .map(|(_, _, id)| id.to_string())
        .collect()
}

/// Cascade skips, then pick up to `capacity` ready steps.
pub fn plan(workflow: &mut Workflow, capacity: usize) -> SchedulePass {
    let skipped = cascade_skips(workflow);
    let ready = ready_steps(workflow, capacity);
    SchedulePass { skipped, ready }
}

/// Skip every pending step with the given error. Returns the skipped ids.
pub fn skip_pending(workflow: &mut Workflow, error: &StepError) -> Vec<String> {
    workflow
        .steps
        .iter_mut()
        .filter(|s| s.status == StepStatus::Pending)
        .map(|s| {
            s.skip(error.clone());
            s.id.clone()
        })
        .collect()
}

#[cfg(test)]
#[path = "scheduler_tests.rs"]
mod tests;
