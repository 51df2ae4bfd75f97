use super::{app_labels, Stage, SERVER_PORT};
use crate::{
    k8s::{ObjectMeta, Service, ServicePort, ServiceSpec},
    names,
};
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;

/// The service fronting the image store server. Owned by the server's
/// stateful set.
pub struct ImageStoreEndpoint;

/// The service fronting the model deployment. Owned by the deployment.
pub struct ModelEndpoint;

impl Stage for ImageStoreEndpoint {
    type Object = Service;
    type Params = ();

    const PREFIX: &'static str = names::IMAGE_STORE_PREFIX;

    fn build(model: &str, metadata: ObjectMeta, (): &()) -> Service {
        cluster_ip_service(metadata, &names::image_store_name(model))
    }

    fn is_ready(service: &Service) -> bool {
        has_cluster_ip(service)
    }
}

impl Stage for ModelEndpoint {
    type Object = Service;
    type Params = ();

    const PREFIX: &'static str = names::MODEL_PREFIX;

    fn build(model: &str, metadata: ObjectMeta, (): &()) -> Service {
        cluster_ip_service(metadata, &names::model_app_name(model))
    }

    fn is_ready(service: &Service) -> bool {
        has_cluster_ip(service)
    }
}

fn cluster_ip_service(metadata: ObjectMeta, app: &str) -> Service {
    Service {
        metadata,
        spec: Some(ServiceSpec {
            type_: Some("ClusterIP".to_string()),
            selector: Some(app_labels(app)),
            ports: Some(vec![ServicePort {
                name: Some("ollama".to_string()),
                port: SERVER_PORT,
                target_port: Some(IntOrString::Int(SERVER_PORT)),
                ..Default::default()
            }]),
            ..Default::default()
        }),
        status: None,
    }
}

/// A service is routable once the platform has assigned it a cluster IP.
fn has_cluster_ip(service: &Service) -> bool {
    service
        .spec
        .as_ref()
        .and_then(|spec| spec.cluster_ip.as_deref())
        .is_some_and(|ip| !ip.is_empty() && !ip.eq_ignore_ascii_case("none"))
}
