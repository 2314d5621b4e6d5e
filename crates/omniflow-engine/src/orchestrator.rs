//! Workflow orchestrator.
//!
//! The orchestrator owns the workflow lifecycle: it validates and persists new
//! workflows, drives the scheduler on every lifecycle call and step
//! settlement, and emits [`WorkflowEvent`]s along the way. Each live workflow
//! has its own execution context; nothing is shared across workflows except
//! the agent registry, the store, and the event bus.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::broadcast;
use tracing::{debug, info};

use omniflow_config::{CancellationMode, Config};
use omniflow_core::{AgentRegistry, EventBus, LogSink};
use omniflow_protocols::{
    EventSink, Page, StepError, StepStatus, Workflow, WorkflowEvent, WorkflowEventKind,
    WorkflowFilter, WorkflowRequest, WorkflowResult, WorkflowStatus, WorkflowStore,
};

use crate::error::{EngineError, EngineResult};
use crate::graph::validate_request;
use crate::retry::RetryPolicy;
use crate::run::WorkflowRun;
use crate::scheduler;

pub(crate) struct OrchestratorInner {
    pub config: Config,
    pub registry: Arc<AgentRegistry>,
    pub store: Arc<dyn WorkflowStore>,
    pub events: EventBus,
    pub retry: RetryPolicy,
    pub runs: DashMap<String, Arc<WorkflowRun>>,
}

/// Drives workflows from creation to a terminal state.
///
/// Cheap to clone; clones share all state.
#[derive(Clone)]
pub struct Orchestrator {
    pub(crate) inner: Arc<OrchestratorInner>,
}

impl Orchestrator {
    /// Create an orchestrator with an event bus sized from `config`.
    pub fn new(config: Config, registry: Arc<AgentRegistry>, store: Arc<dyn WorkflowStore>) -> Self {
        let events = EventBus::new(config.events.channel_capacity);
        Self::with_events(config, registry, store, events)
    }

    /// Create an orchestrator publishing to an existing event bus.
    pub fn with_events(
        config: Config,
        registry: Arc<AgentRegistry>,
        store: Arc<dyn WorkflowStore>,
        events: EventBus,
    ) -> Self {
        if config.events.log_events {
            events.add_sink(Arc::new(LogSink));
        }
        let retry = RetryPolicy::new(config.retry.clone());

        Self {
            inner: Arc::new(OrchestratorInner {
                config,
                registry,
                store,
                events,
                retry,
                runs: DashMap::new(),
            }),
        }
    }

    pub fn registry(&self) -> &Arc<AgentRegistry> {
        &self.inner.registry
    }

    pub fn events(&self) -> &EventBus {
        &self.inner.events
    }

    /// Live event stream for all workflows.
    pub fn subscribe(&self) -> broadcast::Receiver<WorkflowEvent> {
        self.inner.events.subscribe()
    }

    pub fn add_sink(&self, sink: Arc<dyn EventSink>) {
        self.inner.events.add_sink(sink);
    }

    /// Number of workflows with a live execution context.
    pub fn active_count(&self) -> usize {
        self.inner.runs.len()
    }

    /// Validate, persist, and return a new `pending` workflow.
    ///
    /// Nothing is persisted when the step graph is rejected. The execution
    /// context is loaded from the store by the first lifecycle call that needs it.
    pub async fn create_workflow(&self, request: WorkflowRequest) -> EngineResult<Workflow> {
        validate_request(&request)?;

        let workflow = Workflow::from_request(request);
        self.inner.store.save(&workflow).await?;

        info!("Created workflow {} with {} steps", workflow.id, workflow.steps.len());
        let created = WorkflowEventKind::WorkflowCreated {
            owner_id: workflow.owner_id.clone(),
            step_count: workflow.steps.len(),
        };
        self.inner
            .events
            .publish(WorkflowEvent::new(&workflow.id, created))
            .await;
        Ok(workflow)
    }

    /// Move a `pending` workflow to `running` and dispatch its first steps.
    ///
    /// Calling `start` on a workflow that is not `pending` changes nothing.
    pub async fn start(&self, id: &str) -> EngineResult<Workflow> {
        let run = self.run_for(id).await?;
        let mut wf = run.state.lock().await;

        if wf.status != WorkflowStatus::Pending {
            debug!("Workflow {} already {}, start ignored", id, wf.status);
            return Ok(wf.clone());
        }

        transition(&mut wf, WorkflowStatus::Running)?;
        info!("Starting workflow {}", id);
        run.emit(WorkflowEventKind::WorkflowStarted);
        self.schedule_locked(&run, &mut wf).await;
        Ok(wf.clone())
    }

    /// Create and start a workflow in one call.
    pub async fn submit(&self, request: WorkflowRequest) -> EngineResult<Workflow> {
        let workflow = self.create_workflow(request).await?;
        self.start(&workflow.id).await
    }

    /// Cancel a workflow. Returns without waiting for in-flight steps.
    ///
    /// Pending steps are skipped and in-flight agents are signalled. Under
    /// [`CancellationMode::Abandon`] running steps are skipped too and their
    /// late results dropped. Cancelling a terminal workflow changes nothing.
    pub async fn cancel(&self, id: &str) -> EngineResult<Workflow> {
        let run = self.run_for(id).await?;
        let mut wf = run.state.lock().await;

        if wf.status.is_terminal() {
            debug!("Workflow {} already {}, cancel ignored", id, wf.status);
            return Ok(wf.clone());
        }

        run.cancel.cancel();
        let reason = StepError::cancelled("workflow cancelled");
        let mut skipped = scheduler::skip_pending(&mut wf, &reason);

        if self.inner.config.cancellation.mode == CancellationMode::Abandon {
            for step in wf.steps.iter_mut().filter(|s| s.status == StepStatus::Running) {
                step.skip(reason.clone());
                skipped.push(step.id.clone());
            }
        }

        for step_id in skipped {
            run.emit(WorkflowEventKind::StepSkipped {
                step_id,
                reason: reason.message.clone(),
            });
        }

        wf.finish(WorkflowStatus::Cancelled, WorkflowResult::cancelled());
        info!(
            "Cancelled workflow {} ({} steps still in flight)",
            id,
            wf.count_with_status(StepStatus::Running)
        );
        run.emit(WorkflowEventKind::WorkflowCancelled);
        self.persist(&wf).await;

        run.mark_finished();
        self.release_if_idle(&wf);
        Ok(wf.clone())
    }

    /// Stop dispatching new steps. In-flight steps settle normally.
    pub async fn pause(&self, id: &str) -> EngineResult<Workflow> {
        let run = self.run_for(id).await?;
        let mut wf = run.state.lock().await;

        if wf.status == WorkflowStatus::Paused {
            return Ok(wf.clone());
        }

        if let Err(err) = transition(&mut wf, WorkflowStatus::Paused) {
            self.release_unstarted(&run, &wf);
            return Err(err);
        }
        info!("Paused workflow {}", id);
        run.emit(WorkflowEventKind::WorkflowPaused);
        self.persist(&wf).await;
        Ok(wf.clone())
    }

    /// Return a paused workflow to `running` and dispatch what became ready.
    pub async fn resume(&self, id: &str) -> EngineResult<Workflow> {
        let run = self.run_for(id).await?;
        let mut wf = run.state.lock().await;

        match wf.status {
            WorkflowStatus::Running => return Ok(wf.clone()),
            WorkflowStatus::Paused => {}
            from => {
                self.release_unstarted(&run, &wf);
                return Err(EngineError::InvalidTransition {
                    from,
                    to: WorkflowStatus::Running,
                });
            }
        }

        transition(&mut wf, WorkflowStatus::Running)?;
        info!("Resumed workflow {}", id);
        run.emit(WorkflowEventKind::WorkflowResumed);
        self.schedule_locked(&run, &mut wf).await;
        Ok(wf.clone())
    }

    /// Current snapshot of a workflow.
    pub async fn get_status(&self, id: &str) -> EngineResult<Workflow> {
        let run = self.inner.runs.get(id).map(|entry| Arc::clone(entry.value()));
        if let Some(run) = run {
            return Ok(run.state.lock().await.clone());
        }

        self.inner
            .store
            .find_by_id(id)
            .await?
            .ok_or_else(|| EngineError::WorkflowNotFound(id.to_string()))
    }

    /// Persisted workflows matching `filter`, newest first.
    pub async fn list(&self, filter: &WorkflowFilter) -> EngineResult<Page<Workflow>> {
        Ok(self.inner.store.find_by_filter(filter).await?)
    }

    /// Wait until a workflow is terminal and return its final snapshot.
    pub async fn wait(&self, id: &str) -> EngineResult<Workflow> {
        let run = self.run_for(id).await?;
        let mut finished = run.finished();
        // The sender lives in `run`, so the channel cannot close while waiting.
        let _ = finished.wait_for(|done| *done).await;
        Ok(run.state.lock().await.clone())
    }

    /// Live context for `id`, loading it from the store if needed.
    ///
    /// Terminal workflows get a detached context that is never registered.
    async fn run_for(&self, id: &str) -> EngineResult<Arc<WorkflowRun>> {
        let live = self.inner.runs.get(id).map(|entry| Arc::clone(entry.value()));
        if let Some(run) = live {
            return Ok(run);
        }

        let workflow = self
            .inner
            .store
            .find_by_id(id)
            .await?
            .ok_or_else(|| EngineError::WorkflowNotFound(id.to_string()))?;

        if workflow.status.is_terminal() {
            return Ok(WorkflowRun::new(workflow, &self.inner.events));
        }

        debug!("Loaded workflow {} from store", id);
        let run = WorkflowRun::recover(workflow, &self.inner.events);
        let entry = self.inner.runs.entry(id.to_string()).or_insert(run);
        Ok(Arc::clone(entry.value()))
    }

    /// Drop the context of a workflow that was loaded but never started.
    ///
    /// Only removes the entry when no other caller holds the same run.
    fn release_unstarted(&self, run: &Arc<WorkflowRun>, wf: &Workflow) {
        if wf.status != WorkflowStatus::Pending {
            return;
        }
        self.inner
            .runs
            .remove_if(&wf.id, |_, live| Arc::ptr_eq(live, run) && Arc::strong_count(live) <= 2);
    }
}

/// Apply a lifecycle transition, rejecting edges the state machine forbids.
fn transition(workflow: &mut Workflow, to: WorkflowStatus) -> EngineResult<()> {
    if !workflow.status.can_transition_to(to) {
        return Err(EngineError::InvalidTransition {
            from: workflow.status,
            to,
        });
    }
    workflow.status = to;
    workflow.touch();
    Ok(())
}

#[cfg(test)]
#[path = "orchestrator_tests.rs"]
mod tests;
