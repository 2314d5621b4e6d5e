//! Built-in event sinks.

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::Notify;
use tracing::info;

use omniflow_protocols::{EventSink, WorkflowEvent};

/// Writes every event to the tracing log.
pub struct LogSink;

#[async_trait]
impl EventSink for LogSink {
    fn name(&self) -> &str {
        "log"
    }

    async fn publish(&self, event: &WorkflowEvent) {
        match event.step_id() {
            Some(step_id) => info!(
                workflow_id = %event.workflow_id,
                step_id,
                "{}",
                event.event_type()
            ),
            None => info!(workflow_id = %event.workflow_id, "{}", event.event_type()),
        }
    }
}

/// Keeps every event in memory, in publication order.
#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<WorkflowEvent>>,
    recorded: Notify,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<WorkflowEvent> {
        self.events.lock().clone()
    }

    /// Event types recorded for one workflow.
    pub fn types_for(&self, workflow_id: &str) -> Vec<&'static str> {
        self.events
            .lock()
            .iter()
            .filter(|e| e.workflow_id == workflow_id)
            .map(|e| e.event_type())
            .collect()
    }

    /// Wait until a terminal event for `workflow_id` has been recorded.
    pub async fn wait_for_terminal(&self, workflow_id: &str) {
        loop {
            let recorded = self.recorded.notified();
            let done = self
                .events
                .lock()
                .iter()
                .any(|e| e.workflow_id == workflow_id && e.is_terminal());
            if done {
                return;
            }
            recorded.await;
        }
    }

    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }
}

#[async_trait]
impl EventSink for RecordingSink {
    fn name(&self) -> &str {
        "recording"
    }

    async fn publish(&self, event: &WorkflowEvent) {
        self.events.lock().push(event.clone());
        self.recorded.notify_waiters();
    }
}
