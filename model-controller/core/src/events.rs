use async_trait::async_trait;
use k8s_openapi::api::core::v1::ObjectReference;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum EventType {
    Normal,
    Warning,
}

/// Records human-readable notifications against an object.
///
/// Emission is best-effort: implementations swallow (and log) their own
/// failures so that narration never fails a reconcile pass.
#[async_trait]
pub trait EventSink: Send + Sync {
    async fn emit(
        &self,
        regarding: &ObjectReference,
        type_: EventType,
        reason: &str,
        message: String,
    );
}

/// An [`EventSink`] bound to the `Model` being reconciled.
pub struct OwnerEvents<'a, E> {
    sink: &'a E,
    owner: ObjectReference,
}

// === impl OwnerEvents ===

impl<'a, E: EventSink> OwnerEvents<'a, E> {
    pub fn new(sink: &'a E, owner: ObjectReference) -> Self {
        Self { sink, owner }
    }

    pub async fn normal(&self, reason: &str, message: impl Into<String>) {
        self.sink
            .emit(&self.owner, EventType::Normal, reason, message.into())
            .await
    }

    pub async fn warning(&self, reason: &str, message: impl Into<String>) {
        self.sink
            .emit(&self.owner, EventType::Warning, reason, message.into())
            .await
    }
}
