#![deny(warnings, rust_2018_idioms)]
#![forbid(unsafe_code)]

//! Convergence logic for `Model` resources.
//!
//! A reconcile pass walks a fixed pipeline of stages (image store claim,
//! image store server, image store endpoint, model deployment, model
//! endpoint), creating whatever is missing and returning a requeue whenever
//! a stage is not ready yet. Passes are idempotent and may be re-run any
//! number of times; all cluster access goes through the [`Store`] and
//! [`EventSink`] seams.

mod error;
pub mod events;
pub mod names;
mod reconcile;
pub mod stage;
pub mod status;
pub mod store;

#[cfg(test)]
mod tests;

pub use self::{
    error::{Error, Result},
    events::{EventSink, EventType, OwnerEvents},
    reconcile::{Outcome, Reconciler, Settings, PROGRESSING_REQUEUE, READINESS_REQUEUE},
    status::{Replicas, StatusTracker},
    store::{Object, ObjectKey, Store},
};
pub use model_controller_k8s_api as k8s;

pub const CONTROLLER_NAME: &str = "model-controller";
