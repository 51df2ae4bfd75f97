use crate::{Error, Result};
use async_trait::async_trait;
use k8s_openapi::NamespaceResourceScope;
use kube::Resource;
use serde::{de::DeserializeOwned, Serialize};
use std::fmt;

/// A namespaced cluster object the controller reads or writes.
pub trait Object:
    Resource<DynamicType = (), Scope = NamespaceResourceScope>
    + Clone
    + fmt::Debug
    + Serialize
    + DeserializeOwned
    + Send
    + Sync
    + 'static
{
}

impl<T> Object for T where
    T: Resource<DynamicType = (), Scope = NamespaceResourceScope>
        + Clone
        + fmt::Debug
        + Serialize
        + DeserializeOwned
        + Send
        + Sync
        + 'static
{
}

#[derive(Clone, Debug, Eq, Hash, PartialEq, PartialOrd, Ord)]
pub struct ObjectKey {
    pub namespace: String,
    pub name: String,
}

/// Typed access to the cluster's resource store.
///
/// `update` and `update_status` are conditional on the object's
/// `metadata.resourceVersion`: a write based on a stale read fails with
/// [`Error::Conflict`] rather than clobbering the newer version.
#[async_trait]
pub trait Store: Send + Sync {
    /// Returns `None` when the object does not exist.
    async fn get<K: Object>(&self, key: &ObjectKey) -> Result<Option<K>>;

    async fn create<K: Object>(&self, object: &K) -> Result<K>;

    async fn update<K: Object>(&self, object: &K) -> Result<K>;

    /// Writes only the object's `status` field.
    async fn update_status<K: Object>(&self, object: &K) -> Result<K>;
}

// === impl ObjectKey ===

impl ObjectKey {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    pub fn of<K: Resource<DynamicType = ()>>(object: &K) -> Result<Self> {
        let meta = object.meta();
        let namespace = meta
            .namespace
            .clone()
            .ok_or_else(|| Error::missing(object, "metadata.namespace"))?;
        let name = meta
            .name
            .clone()
            .ok_or_else(|| Error::missing(object, "metadata.name"))?;
        Ok(Self { namespace, name })
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}
