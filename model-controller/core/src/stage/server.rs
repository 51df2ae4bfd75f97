use super::{app_labels, Stage, SERVER_PORT};
use crate::{
    k8s::{
        Container, ContainerPort, LabelSelector, ObjectMeta, PodSpec, PodTemplateSpec,
        StatefulSet, StatefulSetSpec, Volume, VolumeMount,
    },
    names,
};
use k8s_openapi::api::core::v1::{EnvVar, PersistentVolumeClaimVolumeSource};

pub(super) const IMAGE_STORE_VOLUME: &str = "image-storage";
pub(super) const IMAGE_STORE_MOUNT_PATH: &str = "/root/.ollama";

/// The stateful server that pulls model images into the shared store.
pub struct ImageStoreServer;

impl Stage for ImageStoreServer {
    type Object = StatefulSet;
    /// The server image.
    type Params = str;

    const PREFIX: &'static str = names::IMAGE_STORE_PREFIX;

    fn build(model: &str, metadata: ObjectMeta, server_image: &str) -> StatefulSet {
        let name = names::image_store_name(model);
        let labels = app_labels(&name);

        StatefulSet {
            metadata,
            spec: Some(StatefulSetSpec {
                replicas: Some(1),
                selector: LabelSelector {
                    match_labels: Some(labels.clone()),
                    ..Default::default()
                },
                template: PodTemplateSpec {
                    metadata: Some(ObjectMeta {
                        labels: Some(labels),
                        ..Default::default()
                    }),
                    spec: Some(PodSpec {
                        containers: vec![server_container(server_image, false)],
                        volumes: Some(vec![Volume {
                            name: IMAGE_STORE_VOLUME.to_string(),
                            persistent_volume_claim: Some(PersistentVolumeClaimVolumeSource {
                                claim_name: name,
                                read_only: None,
                            }),
                            ..Default::default()
                        }]),
                        ..Default::default()
                    }),
                },
                ..Default::default()
            }),
            status: None,
        }
    }

    fn is_ready(server: &StatefulSet) -> bool {
        let desired = server.spec.as_ref().and_then(|s| s.replicas).unwrap_or(1);
        let ready = server
            .status
            .as_ref()
            .and_then(|s| s.ready_replicas)
            .unwrap_or(0);
        ready == desired
    }
}

/// Runs `ollama serve` against the image store volume.
pub(super) fn server_container(image: &str, read_only: bool) -> Container {
    Container {
        name: "server".to_string(),
        image: Some(image.to_string()),
        args: Some(vec!["serve".to_string()]),
        env: Some(vec![EnvVar {
            name: "OLLAMA_HOST".to_string(),
            value: Some("0.0.0.0".to_string()),
            ..Default::default()
        }]),
        ports: Some(vec![ContainerPort {
            name: Some("ollama".to_string()),
            container_port: SERVER_PORT,
            ..Default::default()
        }]),
        volume_mounts: Some(vec![VolumeMount {
            name: IMAGE_STORE_VOLUME.to_string(),
            mount_path: IMAGE_STORE_MOUNT_PATH.to_string(),
            read_only: Some(read_only),
            ..Default::default()
        }]),
        ..Default::default()
    }
}
