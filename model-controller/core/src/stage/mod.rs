//! Stage executors.
//!
//! Each managed kind implements [`Stage`], which describes how to build the
//! object and when it counts as ready. [`Stages`] runs the two operations
//! every stage supports, `ensure_created` and `is_ready`, against the store.
//! The engine picks stages statically, in pipeline order.

mod claim;
mod deployment;
mod endpoint;
mod server;

pub use self::{
    claim::ImageStoreClaim,
    deployment::{DeploymentParams, ModelDeployment},
    endpoint::{ImageStoreEndpoint, ModelEndpoint},
    server::ImageStoreServer,
};

use crate::{
    events::{EventSink, OwnerEvents},
    k8s::{ObjectMeta, OwnerReference, Resource},
    names,
    store::{Object, ObjectKey, Store},
    Error, Result,
};
use std::collections::BTreeMap;

/// Port the model server listens on, in the store and in model pods.
pub const SERVER_PORT: i32 = 11434;

pub trait Stage {
    type Object: Object;
    type Params: ?Sized + Sync;

    const PREFIX: &'static str;

    /// Builds a new object from `metadata`, which already carries the name,
    /// namespace, labels and owner reference.
    fn build(model: &str, metadata: ObjectMeta, params: &Self::Params) -> Self::Object;

    fn is_ready(object: &Self::Object) -> bool;
}

pub struct Stages<'a, S, E> {
    store: &'a S,
    events: &'a OwnerEvents<'a, E>,
}

/// Labels applied to a managed object and used to select its pods.
pub fn app_labels(name: &str) -> BTreeMap<String, String> {
    [("app".to_string(), name.to_string())]
        .into_iter()
        .collect()
}

/// The key of a stage's object for the given model.
pub fn object_key<T: Stage>(namespace: &str, model: &str) -> ObjectKey {
    ObjectKey::new(namespace, names::managed_name(T::PREFIX, model))
}

fn owner_reference<O: Resource<DynamicType = ()>>(owner: &O) -> Result<OwnerReference> {
    if owner.meta().uid.is_none() {
        return Err(Error::missing(owner, "metadata.uid"));
    }
    owner
        .controller_owner_ref(&())
        .ok_or_else(|| Error::missing(owner, "metadata.name"))
}

// === impl Stages ===

impl<'a, S: Store, E: EventSink> Stages<'a, S, E> {
    pub fn new(store: &'a S, events: &'a OwnerEvents<'a, E>) -> Self {
        Self { store, events }
    }

    /// Returns the stage's object, creating it if it does not exist.
    ///
    /// An existing object is returned as-is; its parameters are never
    /// reconciled here.
    pub async fn ensure_created<T, O>(
        &self,
        namespace: &str,
        model: &str,
        params: &T::Params,
        owner: &O,
    ) -> Result<T::Object>
    where
        T: Stage,
        O: Resource<DynamicType = ()> + Sync,
    {
        let key = object_key::<T>(namespace, model);
        if let Some(object) = self.store.get::<T::Object>(&key).await? {
            return Ok(object);
        }

        let metadata = ObjectMeta {
            name: Some(key.name.clone()),
            namespace: Some(key.namespace.clone()),
            labels: Some(app_labels(&key.name)),
            owner_references: Some(vec![owner_reference(owner)?]),
            ..Default::default()
        };
        let object = self
            .store
            .create(&T::build(model, metadata, params))
            .await?;

        let kind = T::Object::kind(&());
        tracing::info!(%kind, namespace, name = %key.name, "Created");
        self.events
            .normal(
                &format!("{kind}Created"),
                format!("{kind} {} created", key.name),
            )
            .await;
        Ok(object)
    }

    /// A missing object is not ready.
    pub async fn is_ready<T: Stage>(&self, namespace: &str, model: &str) -> Result<bool> {
        let key = object_key::<T>(namespace, model);
        let Some(object) = self.store.get::<T::Object>(&key).await? else {
            return Ok(false);
        };

        let kind = T::Object::kind(&());
        if T::is_ready(&object) {
            tracing::debug!(%kind, namespace, name = %key.name, "Ready");
            return Ok(true);
        }

        tracing::info!(%kind, namespace, name = %key.name, "Waiting to become ready");
        self.events
            .normal(
                &format!("WaitingFor{kind}"),
                format!("Waiting for {kind} {} to become ready", key.name),
            )
            .await;
        Ok(false)
    }
}
