use crate::core::{Error, Object, ObjectKey, Result, Store, CONTROLLER_NAME};
use kube::{
    api::{Api, Patch, PatchParams, PostParams},
    Client,
};

/// A [`Store`] backed by the Kubernetes API.
#[derive(Clone)]
pub struct KubeStore {
    client: Client,
}

// === impl KubeStore ===

impl KubeStore {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn api<K: Object>(&self, namespace: &str) -> Api<K> {
        Api::namespaced(self.client.clone(), namespace)
    }
}

#[async_trait::async_trait]
impl Store for KubeStore {
    async fn get<K: Object>(&self, key: &ObjectKey) -> Result<Option<K>> {
        self.api::<K>(&key.namespace)
            .get_opt(&key.name)
            .await
            .map_err(|error| api_error::<K>(error, key))
    }

    async fn create<K: Object>(&self, object: &K) -> Result<K> {
        let key = ObjectKey::of(object)?;
        let params = PostParams {
            field_manager: Some(CONTROLLER_NAME.to_string()),
            ..Default::default()
        };
        self.api::<K>(&key.namespace)
            .create(&params, object)
            .await
            .map_err(|error| api_error::<K>(error, &key))
    }

    async fn update<K: Object>(&self, object: &K) -> Result<K> {
        let key = ObjectKey::of(object)?;
        let params = PostParams {
            field_manager: Some(CONTROLLER_NAME.to_string()),
            ..Default::default()
        };
        self.api::<K>(&key.namespace)
            .replace(&key.name, &params, object)
            .await
            .map_err(|error| api_error::<K>(error, &key))
    }

    async fn update_status<K: Object>(&self, object: &K) -> Result<K> {
        let key = ObjectKey::of(object)?;
        let patch = status_patch(object)?;
        let params = PatchParams {
            field_manager: Some(CONTROLLER_NAME.to_string()),
            ..Default::default()
        };
        self.api::<K>(&key.namespace)
            .patch_status(&key.name, &params, &Patch::Merge(patch))
            .await
            .map_err(|error| api_error::<K>(error, &key))
    }
}

/// Builds a merge patch replacing the object's status.
///
/// The patch carries the resource version the status was computed from so
/// that the API server rejects it if the object changed in the meantime.
fn status_patch<K: Object>(object: &K) -> Result<serde_json::Value> {
    let status = serde_json::to_value(object)?
        .get("status")
        .cloned()
        .unwrap_or_default();
    Ok(serde_json::json!({
        "metadata": {
            "resourceVersion": object.meta().resource_version,
        },
        "status": status,
    }))
}

fn api_error<K: Object>(error: kube::Error, key: &ObjectKey) -> Error {
    match error {
        kube::Error::Api(ref response) if response.code == 404 => {
            Error::not_found::<K>(key.clone())
        }
        kube::Error::Api(ref response) if response.code == 409 => {
            Error::conflict::<K>(key.clone())
        }
        error => Error::Api(error),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::k8s::{Model, ModelSpec, ModelStatus};
    use pretty_assertions::assert_eq;

    fn response(code: u16) -> kube::Error {
        kube::Error::Api(kube::error::ErrorResponse {
            status: "Failure".to_string(),
            message: "test".to_string(),
            reason: "Test".to_string(),
            code,
        })
    }

    #[test]
    fn api_errors_map_to_store_errors() {
        let key = ObjectKey::new("ns-0", "phi");
        assert!(api_error::<Model>(response(404), &key).is_not_found::<Model>());
        assert!(api_error::<Model>(response(409), &key).is_conflict());
        assert!(matches!(
            api_error::<Model>(response(500), &key),
            Error::Api(_)
        ));
    }

    #[test]
    fn status_patch_is_conditional() {
        let mut model = Model::new(
            "phi",
            ModelSpec {
                image: "phi".to_string(),
                replicas: None,
                storage_class_name: None,
                persistent_volume_claim: None,
                persistent_volume: None,
            },
        );
        model.metadata.resource_version = Some("7".to_string());
        model.status = Some(ModelStatus {
            replicas: 2,
            ..Default::default()
        });

        let patch = status_patch(&model).unwrap();
        assert_eq!(patch["metadata"]["resourceVersion"], "7");
        assert_eq!(patch["status"]["replicas"], 2);
        assert!(patch.get("spec").is_none());
    }
}
