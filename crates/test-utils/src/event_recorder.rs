use std::sync::{Arc, Mutex};

use siteplan::types::NodeKey;
use siteplan::workflow::WorkflowEvent;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

/// A notification sink that:
/// - drains a `WorkflowEvent` channel in the background
/// - records every event for later assertions.
pub struct EventRecorder {
    events: Arc<Mutex<Vec<WorkflowEvent>>>,
    task: JoinHandle<()>,
}

impl EventRecorder {
    /// Returns the sender to hand to a runtime or registry, and the recorder.
    pub fn spawn() -> (mpsc::Sender<WorkflowEvent>, Self) {
        let (tx, mut rx) = mpsc::channel(64);
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);

        let task = tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                debug!(?event, "recorded workflow event");
                sink.lock().unwrap().push(event);
            }
        });

        (tx, Self { events, task })
    }

    /// Wait until every sender is dropped, then return what was recorded.
    pub async fn finish(self) -> Vec<WorkflowEvent> {
        self.task.await.expect("recorder task panicked");
        debug!("event recorder drained");
        let guard = self.events.lock().unwrap();
        guard.clone()
    }

    pub fn snapshot(&self) -> Vec<WorkflowEvent> {
        self.events.lock().unwrap().clone()
    }
}

/// Nodes reported as newly startable, in delivery order.
pub fn unblocked_nodes(events: &[WorkflowEvent]) -> Vec<NodeKey> {
    events
        .iter()
        .filter_map(|e| match e {
            WorkflowEvent::NowUnblocked { node, .. } => Some(*node),
            _ => None,
        })
        .collect()
}
