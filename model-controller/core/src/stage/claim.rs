use super::Stage;
use crate::{
    k8s::{ModelSpec, ObjectMeta, PersistentVolumeClaim, PersistentVolumeClaimSpec},
    names,
};
use k8s_openapi::{
    api::core::v1::VolumeResourceRequirements, apimachinery::pkg::api::resource::Quantity,
};

const DEFAULT_ACCESS_MODE: &str = "ReadWriteOnce";
const DEFAULT_SIZE: &str = "100Gi";

/// The volume claim backing the image store.
pub struct ImageStoreClaim;

impl Stage for ImageStoreClaim {
    type Object = PersistentVolumeClaim;
    type Params = ModelSpec;

    const PREFIX: &'static str = names::IMAGE_STORE_PREFIX;

    fn build(_model: &str, metadata: ObjectMeta, spec: &ModelSpec) -> PersistentVolumeClaim {
        let claim = spec.persistent_volume_claim.clone().unwrap_or_default();
        let access_mode = claim
            .access_mode
            .unwrap_or_else(|| DEFAULT_ACCESS_MODE.to_string());
        let size = claim.size.unwrap_or_else(|| DEFAULT_SIZE.to_string());

        PersistentVolumeClaim {
            metadata,
            spec: Some(PersistentVolumeClaimSpec {
                access_modes: Some(vec![access_mode]),
                storage_class_name: spec.storage_class_name.clone(),
                volume_name: spec.persistent_volume.as_ref().map(|pv| pv.name.clone()),
                resources: Some(VolumeResourceRequirements {
                    requests: Some(
                        [("storage".to_string(), Quantity(size))]
                            .into_iter()
                            .collect(),
                    ),
                    ..Default::default()
                }),
                ..Default::default()
            }),
            status: None,
        }
    }

    fn is_ready(claim: &PersistentVolumeClaim) -> bool {
        claim
            .status
            .as_ref()
            .and_then(|s| s.phase.as_deref())
            .is_some_and(|phase| phase == "Bound")
    }
}
