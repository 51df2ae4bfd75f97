#![deny(warnings, rust_2018_idioms)]
#![forbid(unsafe_code)]

pub mod model;

pub use self::model::{
    Model, ModelConditionType, ModelPersistentVolume, ModelPersistentVolumeClaim, ModelSpec,
    ModelStatus, ModelStatusCondition,
};
pub use k8s_openapi::{
    api::{
        self,
        apps::v1::{Deployment, DeploymentSpec, DeploymentStatus, StatefulSet, StatefulSetSpec},
        core::v1::{
            Container, ContainerPort, EnvVar, ObjectReference, PersistentVolumeClaim,
            PersistentVolumeClaimSpec, PodSpec, PodTemplateSpec, Service, ServicePort,
            ServiceSpec, Volume, VolumeMount,
        },
    },
    apimachinery::pkg::apis::meta::v1::{LabelSelector, OwnerReference, Time},
};
pub use kube::{
    api::{ObjectMeta, Resource, ResourceExt},
    CustomResourceExt,
};
