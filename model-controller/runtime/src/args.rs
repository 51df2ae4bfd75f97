use crate::{
    controller::{self, Context},
    core::{Reconciler, Settings},
    lease::{self, Leadership},
    metrics::ReconcileMetrics,
    KubeEvents, KubeStore,
};
use anyhow::{bail, Context as _, Result};
use clap::Parser;
use prometheus_client::registry::Registry;
use std::sync::Arc;
use tokio::time::Duration;
use tracing::{info, info_span, Instrument};

#[derive(Debug, Parser)]
#[clap(name = "model-controller", about = "Serves Model resources")]
pub struct Args {
    #[clap(
        long,
        default_value = "model_controller=info,warn",
        env = "MODEL_CONTROLLER_LOG"
    )]
    log_level: kubert::LogFilter,

    #[clap(long, default_value = "plain")]
    log_format: kubert::LogFormat,

    #[clap(flatten)]
    client: kubert::ClientArgs,

    #[clap(flatten)]
    admin: kubert::AdminArgs,

    /// Image running the image store server and the model servers.
    #[clap(long, default_value = "ollama/ollama")]
    server_image: String,

    /// Delay before retrying a model whose reconcile pass failed.
    #[clap(long, default_value = "5000")]
    error_backoff_ms: u64,

    /// Only reconcile while holding the controller's write lease.
    #[clap(long)]
    leader_elect: bool,

    #[clap(long, env = "POD_NAMESPACE", default_value = "default")]
    lease_namespace: String,

    #[clap(long, default_value = "model-controller")]
    controller_deployment_name: String,
}

impl Args {
    #[inline]
    pub async fn parse_and_run() -> Result<()> {
        Self::parse().run().await
    }

    pub async fn run(self) -> Result<()> {
        let Self {
            admin,
            client,
            log_level,
            log_format,
            server_image,
            error_backoff_ms,
            leader_elect,
            lease_namespace,
            controller_deployment_name,
        } = self;

        let mut prom = <Registry>::default();
        let metrics =
            ReconcileMetrics::register(prom.sub_registry_with_prefix("model_controller"));
        let rt_metrics = kubert::RuntimeMetrics::register(prom.sub_registry_with_prefix("kube"));

        let runtime = kubert::Runtime::builder()
            .with_log(log_level, log_format)
            .with_metrics(rt_metrics)
            .with_admin(admin.into_builder().with_prometheus(prom))
            .with_client(client)
            .build()
            .await?;

        let hostname =
            std::env::var("HOSTNAME").context("Failed to fetch `HOSTNAME` environment variable")?;

        let claims = if leader_elect {
            let claims = lease::init(
                &runtime,
                &lease_namespace,
                &controller_deployment_name,
                &hostname,
            )
            .await?;
            Some(claims)
        } else {
            None
        };

        let client = runtime.client();
        let reconciler = Reconciler::new(
            KubeStore::new(client.clone()),
            KubeEvents::new(client.clone(), &hostname),
            Settings { server_image },
        );
        let ctx = Arc::new(Context {
            reconciler,
            leadership: Leadership::new(claims, hostname),
            metrics,
            error_backoff: Duration::from_millis(error_backoff_ms),
        });

        info!(leader_elect, "Starting model controller");
        tokio::spawn(
            controller::run(client, ctx, runtime.shutdown_handle())
                .instrument(info_span!("models")),
        );

        // Block the main thread on the shutdown signal. Once it fires, wait for
        // the background tasks to complete before exiting.
        if runtime.run().await.is_err() {
            bail!("Aborted");
        }

        Ok(())
    }
}
