use crate::{
    core::CONTROLLER_NAME,
    k8s::{Deployment, ObjectMeta, Resource},
};
use anyhow::Result;
use k8s_openapi::api::coordination::v1 as coordv1;
use kube::api::{Api, Patch, PatchParams};
use std::sync::Arc;
use tokio::{sync::watch, time};

pub const LEASE_DURATION: time::Duration = time::Duration::from_secs(30);
const LEASE_NAME: &str = "model-controller-write";
const RENEW_GRACE_PERIOD: time::Duration = time::Duration::from_secs(1);

/// Tells whether this replica currently holds the write lease.
///
/// Without a lease every replica is a leader.
#[derive(Clone, Debug)]
pub struct Leadership {
    claims: Option<watch::Receiver<Arc<kubert::lease::Claim>>>,
    hostname: String,
}

pub async fn init<T>(
    runtime: &kubert::Runtime<T>,
    ns: &str,
    deployment_name: &str,
    hostname: &str,
) -> Result<watch::Receiver<Arc<kubert::lease::Claim>>> {
    // Fetch the controller's own deployment so that it can own the Lease.
    let api = Api::<Deployment>::namespaced(runtime.client(), ns);
    let deployment = api.get(deployment_name).await?;

    let lease = coordv1::Lease {
        metadata: ObjectMeta {
            name: Some(LEASE_NAME.to_string()),
            namespace: Some(ns.to_string()),
            // Specifying a resource version of "0" means that we will
            // only create the Lease if it does not already exist.
            resource_version: Some("0".to_string()),
            owner_references: deployment.controller_owner_ref(&()).map(|r| vec![r]),
            labels: Some(
                [(
                    "app.kubernetes.io/name".to_string(),
                    CONTROLLER_NAME.to_string(),
                )]
                .into_iter()
                .collect(),
            ),
            ..Default::default()
        },
        spec: None,
    };
    let api = Api::<coordv1::Lease>::namespaced(runtime.client(), ns);
    match api
        .patch(
            LEASE_NAME,
            &PatchParams {
                field_manager: Some(CONTROLLER_NAME.to_string()),
                ..Default::default()
            },
            &Patch::Apply(lease),
        )
        .await
    {
        Ok(lease) => tracing::info!(?lease, "Created Lease resource"),
        Err(kube::Error::Api(_)) => tracing::debug!("Lease already exists, no need to create it"),
        Err(error) => {
            return Err(error.into());
        }
    };

    let params = kubert::lease::ClaimParams {
        lease_duration: LEASE_DURATION,
        renew_grace_period: RENEW_GRACE_PERIOD,
    };
    let (claims, _task) = kubert::lease::LeaseManager::init(api, LEASE_NAME)
        .await?
        .spawn(hostname, params)
        .await?;
    Ok(claims)
}

// === impl Leadership ===

impl Leadership {
    pub fn new(
        claims: Option<watch::Receiver<Arc<kubert::lease::Claim>>>,
        hostname: impl Into<String>,
    ) -> Self {
        Self {
            claims,
            hostname: hostname.into(),
        }
    }

    pub fn is_leader(&self) -> bool {
        let Some(claims) = self.claims.as_ref() else {
            return true;
        };
        let claim = claims.borrow();
        claim.holder == self.hostname && claim.expiry > chrono::Utc::now()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};

    fn leadership(holder: &str, expiry: DateTime<Utc>) -> Leadership {
        let claim = kubert::lease::Claim {
            holder: holder.to_string(),
            expiry,
        };
        let (_tx, rx) = watch::channel(Arc::new(claim));
        Leadership::new(Some(rx), "model-controller-0")
    }

    #[test]
    fn unclaimed_replicas_lead() {
        assert!(Leadership::new(None, "model-controller-0").is_leader());
    }

    #[test]
    fn current_holder_leads() {
        assert!(leadership("model-controller-0", DateTime::<Utc>::MAX_UTC).is_leader());
    }

    #[test]
    fn other_holders_and_expired_claims_do_not_lead() {
        assert!(!leadership("model-controller-1", DateTime::<Utc>::MAX_UTC).is_leader());
        assert!(!leadership("model-controller-0", DateTime::<Utc>::MIN_UTC).is_leader());
    }
}
