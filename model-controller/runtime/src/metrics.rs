use crate::core::{Error, Outcome};
use prometheus_client::{
    encoding::EncodeLabelSet,
    metrics::{
        counter::Counter,
        family::Family,
        histogram::{exponential_buckets, Histogram},
    },
    registry::{Registry, Unit},
};
use tokio::time;

#[derive(Clone, Debug)]
pub struct ReconcileMetrics {
    reconciles: Family<OutcomeLabels, Counter>,
    duration: Histogram,
}

#[derive(Clone, Hash, PartialEq, Eq, EncodeLabelSet, Debug)]
struct OutcomeLabels {
    outcome: &'static str,
}

// === impl ReconcileMetrics ===

impl ReconcileMetrics {
    pub fn register(reg: &mut Registry) -> Self {
        let reconciles = Family::<OutcomeLabels, Counter>::default();
        reg.register(
            "reconciles",
            "Total number of model reconcile passes, by outcome",
            reconciles.clone(),
        );

        // Passes issue a handful of API requests and never wait on the
        // cluster, so they complete well within a few seconds.
        let duration = Histogram::new(exponential_buckets(0.005, 2.0, 12));
        reg.register_with_unit(
            "reconcile_duration",
            "Histogram of model reconcile pass durations",
            Unit::Seconds,
            duration.clone(),
        );

        Self {
            reconciles,
            duration,
        }
    }

    pub fn observe(&self, result: &Result<Outcome, Error>, elapsed: time::Duration) {
        let outcome = match result {
            Ok(Outcome::Done) => "done",
            Ok(Outcome::RequeueAfter(_)) => "requeue",
            Err(error) if error.is_conflict() => "conflict",
            Err(_) => "error",
        };
        self.reconciles
            .get_or_create(&OutcomeLabels { outcome })
            .inc();
        self.duration.observe(elapsed.as_secs_f64());
    }
}
