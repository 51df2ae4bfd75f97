//! Names of the objects managed on behalf of a `Model`.
//!
//! Every managed object is named `<prefix>-<model name>`. Other tooling
//! discovers a model's objects through these names, so they must not change.

/// Prefix of the model's deployment and the service fronting it.
pub const MODEL_PREFIX: &str = "ollama-model";

/// Prefix of the image store's claim, stateful set and service.
pub const IMAGE_STORE_PREFIX: &str = "ollama-models-store";

pub fn managed_name(prefix: &str, model: &str) -> String {
    format!("{prefix}-{model}")
}

pub fn model_app_name(model: &str) -> String {
    managed_name(MODEL_PREFIX, model)
}

pub fn image_store_name(model: &str) -> String {
    managed_name(IMAGE_STORE_PREFIX, model)
}
