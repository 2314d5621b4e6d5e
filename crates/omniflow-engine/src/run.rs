//! Per-workflow execution context.

use std::sync::Arc;

use tokio::sync::{Mutex, mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, info_span};

use omniflow_core::EventBus;
use omniflow_protocols::{StepStatus, Workflow, WorkflowEvent, WorkflowEventKind};

/// Live state of one workflow between creation and termination.
///
/// `state` is the per-workflow exclusion scope: every step result is applied
/// and every scheduling pass is computed while holding it. Events raised
/// under it are queued and delivered by a separate task, so sinks never run
/// with the lock held.
pub(crate) struct WorkflowRun {
    pub id: String,
    pub state: Mutex<Workflow>,
    pub cancel: CancellationToken,
    finished: watch::Sender<bool>,
    events: mpsc::UnboundedSender<WorkflowEvent>,
}

impl WorkflowRun {
    /// Create a run and spawn the task delivering its events to `bus`.
    ///
    /// The delivery task ends once the run is dropped and its queue drained.
    pub fn new(workflow: Workflow, bus: &EventBus) -> Arc<Self> {
        let done = workflow.status.is_terminal();
        let (finished, _) = watch::channel(done);
        let (events, queue) = mpsc::unbounded_channel();
        spawn_delivery(&workflow.id, bus.clone(), queue);

        Arc::new(Self {
            id: workflow.id.clone(),
            state: Mutex::new(workflow),
            cancel: CancellationToken::new(),
            finished,
            events,
        })
    }

    /// Rebuild a run for a workflow loaded from the store.
    ///
    /// Attempts that were in flight when the record was written are lost, so
    /// their steps go back to `pending`. Backoff gates are cleared.
    pub fn recover(mut workflow: Workflow, bus: &EventBus) -> Arc<Self> {
        if !workflow.status.is_terminal() {
            for step in &mut workflow.steps {
                if step.status == StepStatus::Running {
                    step.status = StepStatus::Pending;
                }
                if step.status == StepStatus::Pending {
                    step.next_attempt_at = None;
                }
            }
        }
        Self::new(workflow, bus)
    }

    pub fn finished(&self) -> watch::Receiver<bool> {
        self.finished.subscribe()
    }

    pub fn mark_finished(&self) {
        self.finished.send_replace(true);
    }

    /// Queue an event. Events of one run are delivered in the order queued.
    pub fn emit(&self, kind: WorkflowEventKind) {
        if self.events.send(WorkflowEvent::new(&self.id, kind)).is_err() {
            debug!("Event delivery for workflow {} has stopped", self.id);
        }
    }
}

fn spawn_delivery(
    workflow_id: &str,
    bus: EventBus,
    mut queue: mpsc::UnboundedReceiver<WorkflowEvent>,
) {
    let span = info_span!("events", workflow_id = %workflow_id);
    tokio::spawn(
        async move {
            while let Some(event) = queue.recv().await {
                bus.publish(event).await;
            }
        }
        .instrument(span),
    );
}
