//! Event bus.
//!
//! Events are broadcast to live subscribers through a tokio `broadcast`
//! channel and delivered to every registered [`EventSink`]. Lagging
//! subscribers lose the oldest events; sinks always see every event.

use futures::future::join_all;
use parking_lot::RwLock;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::trace;

use omniflow_protocols::{EventSink, WorkflowEvent};

const DEFAULT_CAPACITY: usize = 256;

#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<WorkflowEvent>,
    sinks: Arc<RwLock<Vec<Arc<dyn EventSink>>>>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender,
            sinks: Arc::new(RwLock::new(Vec::new())),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<WorkflowEvent> {
        self.sender.subscribe()
    }

    pub fn add_sink(&self, sink: Arc<dyn EventSink>) {
        self.sinks.write().push(sink);
    }

    pub fn sink_count(&self) -> usize {
        self.sinks.read().len()
    }

    /// Publish an event to subscribers and sinks.
    pub async fn publish(&self, event: WorkflowEvent) {
        trace!(
            "Publishing {} for workflow {}",
            event.event_type(),
            event.workflow_id
        );

        let sinks: Vec<Arc<dyn EventSink>> = self.sinks.read().clone();
        join_all(sinks.iter().map(|sink| sink.publish(&event))).await;

        // No receivers is not an error.
        let _ = self.sender.send(event);
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::RecordingSink;
    use omniflow_protocols::WorkflowEventKind;

    #[tokio::test]
    async fn test_publish_to_subscriber() {
        let bus = EventBus::default();
        let mut rx = bus.subscribe();

        bus.publish(WorkflowEvent::new("wf-1", WorkflowEventKind::WorkflowStarted))
            .await;

        let event = rx.recv().await.unwrap();
        assert_eq!(event.workflow_id, "wf-1");
        assert_eq!(event.event_type(), "workflow.started");
    }

    #[tokio::test]
    async fn test_publish_without_subscribers() {
        let bus = EventBus::new(4);
        bus.publish(WorkflowEvent::new("wf-1", WorkflowEventKind::WorkflowCancelled))
            .await;
    }

    #[tokio::test]
    async fn test_sinks_receive_every_event() {
        let bus = EventBus::new(1);
        let sink = Arc::new(RecordingSink::new());
        bus.add_sink(sink.clone());
        assert_eq!(bus.sink_count(), 1);

        for _ in 0..5 {
            bus.publish(WorkflowEvent::new("wf-1", WorkflowEventKind::WorkflowResumed))
                .await;
        }

        assert_eq!(sink.len(), 5);
    }
}
