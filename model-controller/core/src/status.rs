use crate::{
    k8s::{Deployment, Model, ModelConditionType, ModelStatusCondition, Time},
    store::Store,
    Result,
};
use chrono::offset::Utc;

/// Replica counters mirrored from the model deployment onto the model.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Replicas {
    pub desired: i32,
    pub ready: i32,
    pub available: i32,
    pub unavailable: i32,
}

/// Reads and writes a model's status.
///
/// Conditions are progress markers: once set they are never cleared, and
/// each condition type appears at most once. Every write is conditional on
/// the model's resource version, so a writer that lost a race fails with a
/// conflict and the next pass re-reads.
pub struct StatusTracker<'a, S> {
    store: &'a S,
    model: Model,
}

// === impl Replicas ===

impl Replicas {
    pub fn observed(deployment: &Deployment) -> Self {
        deployment
            .status
            .as_ref()
            .map(|s| Self {
                desired: s.replicas.unwrap_or(0),
                ready: s.ready_replicas.unwrap_or(0),
                available: s.available_replicas.unwrap_or(0),
                unavailable: s.unavailable_replicas.unwrap_or(0),
            })
            .unwrap_or_default()
    }

    pub fn recorded(model: &Model) -> Self {
        model
            .status
            .as_ref()
            .map(|s| Self {
                desired: s.replicas,
                ready: s.ready_replicas,
                available: s.available_replicas,
                unavailable: s.unavailable_replicas,
            })
            .unwrap_or_default()
    }
}

// === impl StatusTracker ===

impl<'a, S: Store> StatusTracker<'a, S> {
    pub fn new(store: &'a S, model: Model) -> Self {
        Self { store, model }
    }

    /// The most recently read or written version of the model.
    pub fn model(&self) -> &Model {
        &self.model
    }

    pub fn has_condition(&self, type_: ModelConditionType) -> bool {
        self.model
            .status
            .as_ref()
            .is_some_and(|s| s.condition(type_).is_some())
    }

    /// Adds a `True` condition of the given type.
    ///
    /// Returns false without writing if the condition is already present.
    pub async fn set_condition(&mut self, type_: ModelConditionType) -> Result<bool> {
        if self.has_condition(type_) {
            return Ok(false);
        }

        let now = now();
        let mut model = self.model.clone();
        model
            .status
            .get_or_insert_with(Default::default)
            .conditions
            .push(ModelStatusCondition {
                type_,
                status: "True".to_string(),
                last_update_time: now.clone(),
                last_transition_time: now,
            });
        self.model = self.store.update_status(&model).await?;

        tracing::debug!(condition = %type_, "Set condition");
        Ok(true)
    }

    /// Records the given replica counters.
    ///
    /// Returns false without writing if they match what is already recorded.
    pub async fn update_counters(&mut self, replicas: Replicas) -> Result<bool> {
        if Replicas::recorded(&self.model) == replicas {
            return Ok(false);
        }

        let mut model = self.model.clone();
        let status = model.status.get_or_insert_with(Default::default);
        status.replicas = replicas.desired;
        status.ready_replicas = replicas.ready;
        status.available_replicas = replicas.available;
        status.unavailable_replicas = replicas.unavailable;
        self.model = self.store.update_status(&model).await?;

        tracing::debug!(?replicas, "Updated replica counters");
        Ok(true)
    }
}

fn now() -> Time {
    Time(Utc::now())
}
