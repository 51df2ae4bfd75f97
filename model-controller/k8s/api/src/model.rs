use k8s_openapi::apimachinery::pkg::apis::meta::v1::Time;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Declares a model image to be served by a set of replicas backed by a
/// shared image store.
#[derive(Clone, Debug, PartialEq, CustomResource, Deserialize, Serialize, JsonSchema)]
#[kube(
    group = "ollama.ayaka.io",
    version = "v1",
    kind = "Model",
    namespaced,
    status = "ModelStatus",
    printcolumn = r#"{"name":"Image","type":"string","jsonPath":".spec.image"}"#,
    printcolumn = r#"{"name":"Replicas","type":"integer","jsonPath":".status.replicas"}"#,
    printcolumn = r#"{"name":"Ready","type":"integer","jsonPath":".status.readyReplicas"}"#,
    printcolumn = r#"{"name":"Age","type":"date","jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct ModelSpec {
    pub image: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replicas: Option<i32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_class_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub persistent_volume_claim: Option<ModelPersistentVolumeClaim>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub persistent_volume: Option<ModelPersistentVolume>,
}

/// Parameters for the image store's volume claim.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ModelPersistentVolumeClaim {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_mode: Option<String>,

    /// Requested storage, as a quantity (e.g. `100Gi`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
}

/// References a pre-existing volume the image store claim binds to.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
pub struct ModelPersistentVolume {
    pub name: String,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ModelStatus {
    #[serde(default)]
    pub conditions: Vec<ModelStatusCondition>,

    #[serde(default)]
    pub replicas: i32,

    #[serde(default)]
    pub ready_replicas: i32,

    #[serde(default)]
    pub available_replicas: i32,

    #[serde(default)]
    pub unavailable_replicas: i32,
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ModelStatusCondition {
    #[serde(rename = "type")]
    pub type_: ModelConditionType,

    /// One of `True`, `False` or `Unknown`.
    pub status: String,

    pub last_update_time: Time,

    pub last_transition_time: Time,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Deserialize, Serialize, JsonSchema)]
pub enum ModelConditionType {
    Progressing,
    Available,
}

// === impl ModelSpec ===

impl ModelSpec {
    /// The desired number of model replicas; absent means one.
    pub fn desired_replicas(&self) -> i32 {
        self.replicas.unwrap_or(1)
    }
}

// === impl ModelStatus ===

impl ModelStatus {
    pub fn condition(&self, type_: ModelConditionType) -> Option<&ModelStatusCondition> {
        self.conditions.iter().find(|c| c.type_ == type_)
    }
}

impl fmt::Display for ModelConditionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Progressing => "Progressing".fmt(f),
            Self::Available => "Available".fmt(f),
        }
    }
}
