use super::{
    app_labels, object_key,
    server::{server_container, IMAGE_STORE_VOLUME},
    Stage, Stages, SERVER_PORT,
};
use crate::{
    events::EventSink,
    k8s::{
        Container, Deployment, DeploymentSpec, EnvVar, LabelSelector, ObjectMeta, PodSpec,
        PodTemplateSpec, Volume,
    },
    names,
    store::Store,
    Result,
};
use k8s_openapi::api::core::v1::PersistentVolumeClaimVolumeSource;

/// The deployment serving the model.
pub struct ModelDeployment;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeploymentParams {
    pub image: String,
    pub replicas: i32,
    pub server_image: String,
}

impl Stage for ModelDeployment {
    type Object = Deployment;
    type Params = DeploymentParams;

    const PREFIX: &'static str = names::MODEL_PREFIX;

    fn build(model: &str, metadata: ObjectMeta, params: &DeploymentParams) -> Deployment {
        let labels = app_labels(&names::model_app_name(model));
        let store_host = format!(
            "{}.{}:{SERVER_PORT}",
            names::image_store_name(model),
            metadata.namespace.as_deref().unwrap_or("default"),
        );

        Deployment {
            metadata,
            spec: Some(DeploymentSpec {
                replicas: Some(params.replicas),
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
                        init_containers: Some(vec![puller_container(
                            &params.server_image,
                            &params.image,
                            store_host,
                        )]),
                        containers: vec![server_container(&params.server_image, true)],
                        volumes: Some(vec![Volume {
                            name: IMAGE_STORE_VOLUME.to_string(),
                            persistent_volume_claim: Some(PersistentVolumeClaimVolumeSource {
                                claim_name: names::image_store_name(model),
                                read_only: Some(true),
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

    fn is_ready(deployment: &Deployment) -> bool {
        let desired = deployment
            .spec
            .as_ref()
            .and_then(|s| s.replicas)
            .unwrap_or(1);
        let ready = deployment
            .status
            .as_ref()
            .and_then(|s| s.ready_replicas)
            .unwrap_or(0);
        ready == desired
    }
}

/// Asks the image store to pull the model image before the server starts.
fn puller_container(server_image: &str, image: &str, store_host: String) -> Container {
    Container {
        name: "ollama-image-pull".to_string(),
        image: Some(server_image.to_string()),
        args: Some(vec!["pull".to_string(), image.to_string()]),
        env: Some(vec![EnvVar {
            name: "OLLAMA_HOST".to_string(),
            value: Some(store_host),
            ..Default::default()
        }]),
        ..Default::default()
    }
}

// === impl Stages ===

impl<S: Store, E: EventSink> Stages<'_, S, E> {
    /// Scales the model deployment to `replicas` if it has drifted.
    ///
    /// Returns true if an update was written. A missing deployment is left
    /// to `ensure_created`.
    pub async fn scale_deployment(
        &self,
        namespace: &str,
        model: &str,
        replicas: i32,
    ) -> Result<bool> {
        let key = object_key::<ModelDeployment>(namespace, model);
        let Some(mut deployment) = self.store.get::<Deployment>(&key).await? else {
            return Ok(false);
        };

        let spec = deployment.spec.get_or_insert_with(Default::default);
        if spec.replicas == Some(replicas) {
            return Ok(false);
        }
        spec.replicas = Some(replicas);

        let current = deployment
            .status
            .as_ref()
            .and_then(|s| s.replicas)
            .unwrap_or(0);
        self.store.update(&deployment).await?;

        tracing::info!(namespace, name = %key.name, from = current, to = replicas, "Scaled");
        self.events
            .normal(
                "ModelScaled",
                format!("Model scaled from {current} to {replicas}"),
            )
            .await;
        Ok(true)
    }
}
