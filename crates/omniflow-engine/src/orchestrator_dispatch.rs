//! Scheduling passes, step dispatch, and settlement.
//!
//! Every pass runs under the workflow's lock. Dispatched attempts run on
//! their own tasks without the lock and re-acquire it only to apply their
//! result, which triggers the next pass.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{Instrument, debug, error, info, info_span, warn};

use omniflow_protocols::{
    Agent, AgentContext, AgentError, StepError, StepInput, StepOutput, StepStatus, Workflow,
    WorkflowEventKind, WorkflowStatus,
};

use crate::aggregate;
use crate::executor::execute_attempt;
use crate::orchestrator::Orchestrator;
use crate::retry::RetryDecision;
use crate::run::WorkflowRun;
use crate::scheduler;

/// One attempt ready to hand to its agent.
struct Dispatch {
    agent: Arc<dyn Agent>,
    input: StepInput,
    ctx: AgentContext,
    timeout: Duration,
}

impl Orchestrator {
    /// Run scheduling passes until nothing more can start, then either
    /// finalize the workflow or persist its progress.
    pub(crate) async fn schedule_locked(&self, run: &Arc<WorkflowRun>, wf: &mut Workflow) {
        let failure = &self.inner.config.failure;

        loop {
            if failure.fail_fast && aggregate::precipitating_failure(wf, failure).is_some() {
                let reason = StepError::upstream_failed("workflow failed fast");
                for step_id in scheduler::skip_pending(wf, &reason) {
                    emit_skipped(run, step_id, &reason.message);
                }
            }

            let capacity = if wf.status == WorkflowStatus::Running {
                let running = wf.count_with_status(StepStatus::Running);
                self.inner
                    .config
                    .scheduler
                    .max_concurrent_steps
                    .max(1)
                    .saturating_sub(running)
            } else {
                0
            };

            let pass = scheduler::plan(wf, capacity);
            for (step_id, reason) in pass.skipped {
                emit_skipped(run, step_id, &reason);
            }

            let mut replan = false;
            for step_id in pass.ready {
                match self.begin_step(run, wf, &step_id) {
                    Ok(Some(dispatch)) => {
                        run.emit(WorkflowEventKind::StepStarted {
                            step_id,
                            agent: dispatch.agent.name().to_string(),
                            attempt: dispatch.input.attempt,
                        });
                        self.dispatch(run, dispatch);
                    }
                    Ok(None) => {}
                    Err(err) => {
                        // A missing agent fails the step outright and may unblock a cascade.
                        let step_error = StepError::from(&err);
                        error!("Workflow {} step {}: {}", wf.id, step_id, step_error);
                        if let Some(step) = wf.step_mut(&step_id) {
                            step.status = StepStatus::Failed;
                            step.completed_at = Some(Utc::now());
                            step.last_error = Some(step_error.clone());
                        }
                        run.emit(WorkflowEventKind::StepFailed {
                            step_id,
                            error: step_error,
                            retry_count: 0,
                            will_retry: false,
                        });
                        replan = true;
                    }
                }
            }

            if !replan {
                break;
            }
        }

        if !wf.has_unsettled_steps() {
            self.finalize(run, wf).await;
            return;
        }

        wf.refresh_current_step();
        wf.touch();
        self.persist(wf).await;
    }

    /// Mark a ready step running and build its attempt.
    fn begin_step(
        &self,
        run: &WorkflowRun,
        wf: &mut Workflow,
        step_id: &str,
    ) -> Result<Option<Dispatch>, AgentError> {
        let Some(step) = wf.step(step_id) else {
            return Ok(None);
        };

        let agent = self.inner.registry.resolve(&step.agent)?;

        let mut input = StepInput::new(&wf.id, &step.id, step.kind, step.input.clone())
            .with_attempt(step.retry_count + 1);
        for dep in &step.metadata.dependencies {
            if let Some(output) = wf.step(dep).and_then(|d| d.output.as_ref()) {
                input = input.with_upstream(dep.clone(), output.data.clone());
            }
        }

        let timeout = self.inner.retry.timeout_for(step);
        let ctx = AgentContext::new(&wf.owner_id)
            .with_session(wf.session_id.clone())
            .with_cancel(run.cancel.clone());

        let now = Utc::now();
        wf.started_at.get_or_insert(now);
        if let Some(step) = wf.step_mut(step_id) {
            step.status = StepStatus::Running;
            step.started_at.get_or_insert(now);
        }

        Ok(Some(Dispatch {
            agent,
            input,
            ctx,
            timeout,
        }))
    }

    /// Hand an attempt to its agent on a separate task.
    fn dispatch(&self, run: &Arc<WorkflowRun>, dispatch: Dispatch) {
        let orchestrator = self.clone();
        let run = Arc::clone(run);
        let mode = self.inner.config.cancellation.mode;
        let span = info_span!(
            "step",
            workflow_id = %run.id,
            step_id = %dispatch.input.step_id,
            attempt = dispatch.input.attempt
        );

        tokio::spawn(
            async move {
                let step_id = dispatch.input.step_id.clone();
                let result = execute_attempt(
                    dispatch.agent,
                    dispatch.input,
                    dispatch.ctx,
                    dispatch.timeout,
                    mode,
                )
                .await;
                orchestrator.on_step_settled(&run, &step_id, result).await;
            }
            .instrument(span),
        );
    }

    /// Apply one attempt's result and schedule what follows.
    async fn on_step_settled(
        &self,
        run: &Arc<WorkflowRun>,
        step_id: &str,
        result: Result<StepOutput, AgentError>,
    ) {
        let mut wf = run.state.lock().await;
        let workflow_id = wf.id.clone();
        let winding_down = wf.status.is_terminal();

        let Some(step) = wf.step_mut(step_id) else {
            return;
        };
        if step.status != StepStatus::Running {
            debug!("Dropping late result for step {} of {}", step_id, workflow_id);
            return;
        }

        let event = match result {
            Ok(output) => {
                debug!("Step {} of {} completed", step_id, workflow_id);
                step.status = StepStatus::Completed;
                step.completed_at = Some(Utc::now());
                step.output = Some(output.clone());
                WorkflowEventKind::StepCompleted {
                    step_id: step_id.to_string(),
                    output,
                }
            }
            Err(AgentError::Cancelled) if winding_down => {
                let reason = StepError::cancelled("workflow cancelled");
                step.skip(reason.clone());
                WorkflowEventKind::StepSkipped {
                    step_id: step_id.to_string(),
                    reason: reason.message,
                }
            }
            Err(err) if winding_down => {
                let step_error = StepError::from(&err);
                step.status = StepStatus::Failed;
                step.completed_at = Some(Utc::now());
                step.last_error = Some(step_error.clone());
                WorkflowEventKind::StepFailed {
                    step_id: step_id.to_string(),
                    error: step_error,
                    retry_count: step.retry_count,
                    will_retry: false,
                }
            }
            Err(err) => match self.inner.retry.on_failure(step, &err) {
                RetryDecision::Retry { delay } => {
                    step.status = StepStatus::Pending;
                    let backoff = chrono::Duration::from_std(delay)
                        .unwrap_or_else(|_| chrono::Duration::zero());
                    step.next_attempt_at = Some(Utc::now() + backoff);
                    self.schedule_retry_timer(run, step_id, delay);
                    WorkflowEventKind::StepFailed {
                        step_id: step_id.to_string(),
                        error: StepError::from(&err),
                        retry_count: step.retry_count,
                        will_retry: true,
                    }
                }
                RetryDecision::Fail(step_error) => {
                    error!("Step {} of {} failed: {}", step_id, workflow_id, step_error);
                    step.status = StepStatus::Failed;
                    step.completed_at = Some(Utc::now());
                    WorkflowEventKind::StepFailed {
                        step_id: step_id.to_string(),
                        error: step_error,
                        retry_count: step.retry_count,
                        will_retry: false,
                    }
                }
            },
        };

        run.emit(event);

        if winding_down {
            wf.touch();
            self.persist(&wf).await;
            self.release_if_idle(&wf);
            return;
        }

        self.schedule_locked(run, &mut wf).await;
    }

    /// Re-open a backing-off step once its delay elapses.
    fn schedule_retry_timer(&self, run: &Arc<WorkflowRun>, step_id: &str, delay: Duration) {
        let orchestrator = self.clone();
        let run = Arc::clone(run);
        let step_id = step_id.to_string();

        tokio::spawn(async move {
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = run.cancel.cancelled() => return,
            }

            let mut wf = run.state.lock().await;
            if wf.status.is_terminal() {
                return;
            }
            if let Some(step) = wf.step_mut(&step_id) {
                if step.status == StepStatus::Pending {
                    step.next_attempt_at = None;
                }
            }
            orchestrator.schedule_locked(&run, &mut wf).await;
        });
    }

    /// Aggregate the result of a fully settled workflow and close it out.
    async fn finalize(&self, run: &WorkflowRun, wf: &mut Workflow) {
        let (status, result) = aggregate::outcome(wf, &self.inner.config.failure);
        if !wf.status.can_transition_to(status) {
            warn!("Workflow {} cannot move from {} to {}", wf.id, wf.status, status);
            return;
        }

        wf.finish(status, result.clone());
        match status {
            WorkflowStatus::Failed => {
                let error = result.error.clone().unwrap_or_default();
                info!("Workflow {} failed: {}", wf.id, error);
                run.emit(WorkflowEventKind::WorkflowFailed { error, result });
            }
            _ => {
                info!(
                    "Workflow {} completed (success={}, confidence={:.2})",
                    wf.id, result.success, result.confidence
                );
                run.emit(WorkflowEventKind::WorkflowCompleted { result });
            }
        }

        self.persist(wf).await;
        run.mark_finished();
        self.release_if_idle(wf);
    }

    /// Save a snapshot; failures are logged and the run continues.
    pub(crate) async fn persist(&self, wf: &Workflow) {
        if let Err(e) = self.inner.store.save(wf).await {
            error!("Failed to persist workflow {}: {}", wf.id, e);
        }
    }

    /// Drop the execution context of a terminal workflow with nothing in flight.
    pub(crate) fn release_if_idle(&self, wf: &Workflow) {
        if wf.status.is_terminal() && wf.count_with_status(StepStatus::Running) == 0 {
            self.inner.runs.remove(&wf.id);
        }
    }
}

fn emit_skipped(run: &WorkflowRun, step_id: String, reason: &str) {
    run.emit(WorkflowEventKind::StepSkipped {
        step_id,
        reason: reason.to_string(),
    });
}
