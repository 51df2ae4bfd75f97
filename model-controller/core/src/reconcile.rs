use crate::{
    events::{EventSink, OwnerEvents},
    k8s::{Model, ModelConditionType, Resource},
    stage::{
        DeploymentParams, ImageStoreClaim, ImageStoreEndpoint, ImageStoreServer, ModelDeployment,
        ModelEndpoint, Stages,
    },
    status::{Replicas, StatusTracker},
    store::{ObjectKey, Store},
    Result,
};
use tokio::time::Duration;
use tracing::instrument;

/// Delay after a model is first marked as progressing.
pub const PROGRESSING_REQUEUE: Duration = Duration::from_secs(1);

/// Delay while waiting on a stage to become ready or on a drift correction
/// to settle.
pub const READINESS_REQUEUE: Duration = Duration::from_secs(5);

const DEFAULT_SERVER_IMAGE: &str = "ollama/ollama";

/// The result of a successful reconcile pass.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// The model has converged; wait for the next change.
    Done,
    /// Some stage is not ready yet; run another pass after the delay.
    RequeueAfter(Duration),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Settings {
    /// Image running the image store server and the model servers.
    pub server_image: String,
}

/// Drives a model's managed objects toward its spec, one pass at a time.
///
/// A pass never waits on the cluster. Whenever a stage is not ready it
/// returns [`Outcome::RequeueAfter`] and the next pass resumes from whatever
/// already exists. Errors abort the pass without rolling back objects
/// created so far. Passes for different models share no state; the caller
/// must not run two passes for the same model concurrently.
pub struct Reconciler<S, E> {
    store: S,
    events: E,
    settings: Settings,
}

// === impl Settings ===

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_image: DEFAULT_SERVER_IMAGE.to_string(),
        }
    }
}

// === impl Reconciler ===

impl<S: Store, E: EventSink> Reconciler<S, E> {
    pub fn new(store: S, events: E, settings: Settings) -> Self {
        Self {
            store,
            events,
            settings,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn events(&self) -> &E {
        &self.events
    }

    #[instrument(skip_all, fields(namespace = %key.namespace, name = %key.name))]
    pub async fn reconcile(&self, key: &ObjectKey) -> Result<Outcome> {
        let Some(model) = self.store.get::<Model>(key).await? else {
            tracing::debug!("Model not found");
            return Ok(Outcome::Done);
        };

        let events = OwnerEvents::new(&self.events, model.object_ref(&()));
        match self.converge(key, model, &events).await {
            Err(error) if error.is_not_found::<Model>() => {
                tracing::debug!("Model was deleted during reconciliation");
                Ok(Outcome::Done)
            }
            Err(error) => {
                // Conflicts resolve on the next pass and are not worth
                // reporting to users.
                if !error.is_conflict() {
                    events.warning("ReconcileFailed", error.to_string()).await;
                }
                Err(error)
            }
            outcome => outcome,
        }
    }

    async fn converge(
        &self,
        key: &ObjectKey,
        model: Model,
        events: &OwnerEvents<'_, E>,
    ) -> Result<Outcome> {
        let ObjectKey { namespace, name } = key;
        let mut status = StatusTracker::new(&self.store, model);

        if !status.has_condition(ModelConditionType::Available)
            && status
                .set_condition(ModelConditionType::Progressing)
                .await?
        {
            events.normal("ModelProgressing", "Model is progressing").await;
            return Ok(Outcome::RequeueAfter(PROGRESSING_REQUEUE));
        }

        let model = status.model().clone();
        let stages = Stages::new(&self.store, events);

        stages
            .ensure_created::<ImageStoreClaim, _>(namespace, name, &model.spec, &model)
            .await?;

        let server = stages
            .ensure_created::<ImageStoreServer, _>(
                namespace,
                name,
                self.settings.server_image.as_str(),
                &model,
            )
            .await?;
        if !stages.is_ready::<ImageStoreServer>(namespace, name).await? {
            return Ok(Outcome::RequeueAfter(READINESS_REQUEUE));
        }

        stages
            .ensure_created::<ImageStoreEndpoint, _>(namespace, name, &(), &server)
            .await?;
        if !stages.is_ready::<ImageStoreEndpoint>(namespace, name).await? {
            return Ok(Outcome::RequeueAfter(READINESS_REQUEUE));
        }

        let params = DeploymentParams {
            image: model.spec.image.clone(),
            replicas: model.spec.desired_replicas(),
            server_image: self.settings.server_image.clone(),
        };
        let deployment = stages
            .ensure_created::<ModelDeployment, _>(namespace, name, &params, &model)
            .await?;

        // A scaled deployment's status is stale until the next pass.
        if stages
            .scale_deployment(namespace, name, params.replicas)
            .await?
        {
            return Ok(Outcome::RequeueAfter(READINESS_REQUEUE));
        }
        if !stages.is_ready::<ModelDeployment>(namespace, name).await? {
            return Ok(Outcome::RequeueAfter(READINESS_REQUEUE));
        }

        stages
            .ensure_created::<ModelEndpoint, _>(namespace, name, &(), &deployment)
            .await?;
        if !stages.is_ready::<ModelEndpoint>(namespace, name).await? {
            return Ok(Outcome::RequeueAfter(READINESS_REQUEUE));
        }

        if status
            .update_counters(Replicas::observed(&deployment))
            .await?
        {
            return Ok(Outcome::RequeueAfter(READINESS_REQUEUE));
        }

        if status.set_condition(ModelConditionType::Available).await? {
            tracing::info!("Model is available");
        }
        events.normal("ModelAvailable", "Model is available").await;
        Ok(Outcome::Done)
    }
}
