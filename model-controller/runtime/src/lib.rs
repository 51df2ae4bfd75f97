#![deny(warnings, rust_2018_idioms)]
#![forbid(unsafe_code)]

pub use model_controller_core as core;
pub use model_controller_k8s_api as k8s;

mod args;
mod controller;
mod events;
mod lease;
mod metrics;
mod store;

pub use self::{args::Args, events::KubeEvents, store::KubeStore};
