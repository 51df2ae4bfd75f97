use crate::{
    core::{Error, ObjectKey, Outcome, Reconciler},
    k8s::{Deployment, Model, PersistentVolumeClaim, ResourceExt, StatefulSet},
    lease::{Leadership, LEASE_DURATION},
    metrics::ReconcileMetrics,
    KubeEvents, KubeStore,
};
use futures::prelude::*;
use kube::{
    runtime::{controller::Action, watcher, Controller},
    Api, Client,
};
use std::sync::Arc;
use tokio::time;

/// State shared by every reconcile pass.
pub struct Context {
    pub reconciler: Reconciler<KubeStore, KubeEvents>,
    pub leadership: Leadership,
    pub metrics: ReconcileMetrics,
    pub error_backoff: time::Duration,
}

/// Watches models and the objects they own, reconciling each model whenever
/// it or one of its objects changes.
///
/// Returns once the process begins shutting down.
pub async fn run(client: Client, ctx: Arc<Context>, shutdown: kubert::shutdown::Watch) {
    let controller = Controller::new(Api::<Model>::all(client.clone()), watcher::Config::default())
        .owns(
            Api::<Deployment>::all(client.clone()),
            watcher::Config::default(),
        )
        .owns(
            Api::<StatefulSet>::all(client.clone()),
            watcher::Config::default(),
        )
        .owns(
            Api::<PersistentVolumeClaim>::all(client),
            watcher::Config::default(),
        )
        .run(reconcile, error_policy, ctx)
        .for_each(|res| async move {
            match res {
                Ok((model, _)) => tracing::trace!(%model, "Reconciled"),
                Err(error) => tracing::debug!(%error, "Reconcile failed"),
            }
        });

    tokio::select! {
        _ = controller => {}
        release = shutdown.signaled() => {
            tracing::info!("Stopping model controller");
            drop(release);
        }
    }
}

async fn reconcile(model: Arc<Model>, ctx: Arc<Context>) -> Result<Action, Error> {
    if !ctx.leadership.is_leader() {
        return Ok(Action::requeue(LEASE_DURATION));
    }

    let key = ObjectKey::of(model.as_ref())?;
    let start = time::Instant::now();
    let result = ctx.reconciler.reconcile(&key).await;
    ctx.metrics.observe(&result, start.elapsed());
    result.map(action)
}

fn error_policy(model: Arc<Model>, error: &Error, ctx: Arc<Context>) -> Action {
    let namespace = model.namespace().unwrap_or_default();
    let name = model.name_any();
    if error.is_conflict() {
        tracing::debug!(%namespace, %name, %error, "Stale write; retrying");
    } else {
        tracing::warn!(%namespace, %name, %error, "Failed to reconcile model");
    }
    Action::requeue(ctx.error_backoff)
}

fn action(outcome: Outcome) -> Action {
    match outcome {
        Outcome::Done => Action::await_change(),
        Outcome::RequeueAfter(delay) => Action::requeue(delay),
    }
}
