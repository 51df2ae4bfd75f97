use crate::{
    core::{EventSink, EventType, CONTROLLER_NAME},
    k8s::ObjectReference,
};
use kube::{
    runtime::events::{self, Event, Recorder, Reporter},
    Client,
};

/// Publishes events through the Kubernetes events API.
///
/// Publishing failures are logged and otherwise ignored.
pub struct KubeEvents {
    recorder: Recorder,
}

// === impl KubeEvents ===

impl KubeEvents {
    pub fn new(client: Client, hostname: &str) -> Self {
        let reporter = Reporter {
            controller: CONTROLLER_NAME.to_string(),
            instance: Some(hostname.to_string()),
        };
        Self {
            recorder: Recorder::new(client, reporter),
        }
    }
}

#[async_trait::async_trait]
impl EventSink for KubeEvents {
    async fn emit(
        &self,
        regarding: &ObjectReference,
        type_: EventType,
        reason: &str,
        message: String,
    ) {
        let event = Event {
            type_: match type_ {
                EventType::Normal => events::EventType::Normal,
                EventType::Warning => events::EventType::Warning,
            },
            reason: reason.to_string(),
            note: Some(message),
            action: "Reconcile".to_string(),
            secondary: None,
        };
        if let Err(error) = self.recorder.publish(&event, regarding).await {
            tracing::warn!(%error, reason, "Failed to publish event");
        }
    }
}
