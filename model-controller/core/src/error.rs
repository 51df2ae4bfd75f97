use crate::store::ObjectKey;
use kube::Resource;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("{kind} {key} not found")]
    NotFound { kind: String, key: ObjectKey },

    #[error("{kind} {key} has been modified; the write was based on a stale version")]
    Conflict { kind: String, key: ObjectKey },

    #[error("{kind} {name} is missing {field}")]
    MissingField {
        kind: String,
        name: String,
        field: &'static str,
    },

    #[error("failed to encode status: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("kubernetes API request failed: {0}")]
    Api(#[from] kube::Error),
}

// === impl Error ===

impl Error {
    pub fn not_found<K: Resource<DynamicType = ()>>(key: ObjectKey) -> Self {
        Self::NotFound {
            kind: K::kind(&()).to_string(),
            key,
        }
    }

    pub fn conflict<K: Resource<DynamicType = ()>>(key: ObjectKey) -> Self {
        Self::Conflict {
            kind: K::kind(&()).to_string(),
            key,
        }
    }

    pub fn missing<K: Resource<DynamicType = ()>>(object: &K, field: &'static str) -> Self {
        Self::MissingField {
            kind: K::kind(&()).to_string(),
            name: object.meta().name.clone().unwrap_or_default(),
            field,
        }
    }

    /// Indicates that an object of kind `K` vanished from the store.
    pub fn is_not_found<K: Resource<DynamicType = ()>>(&self) -> bool {
        matches!(self, Self::NotFound { kind, .. } if *kind == K::kind(&()))
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }
}
