//! In-memory fakes for the store and event seams.


use crate::{
    events::{EventSink, EventType},
    k8s::{Model, ModelSpec, ObjectMeta, ObjectReference, Resource},
    store::{Object, ObjectKey, Store},
    Error, Result,
};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::BTreeMap;

pub const TEST_NAMESPACE: &str = "ns-0";
pub const TEST_MODEL: &str = "phi";

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Verb {
    Get,
    Create,
    Update,
    UpdateStatus,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Call {
    pub verb: Verb,
    pub kind: String,
    pub name: String,
}

/// A resource store backed by JSON documents.
///
/// Objects get a uid on creation and a new resource version on every write.
/// Updates carrying a stale resource version fail with a conflict, and
/// `update` leaves the stored status untouched, as with a status
/// subresource.
#[derive(Default)]
pub struct FakeStore {
    state: Mutex<State>,
}

#[derive(Default)]
struct State {
    objects: BTreeMap<(String, ObjectKey), serde_json::Value>,
    version: u64,
    calls: Vec<Call>,
    vanish_after_get: Option<(String, ObjectKey)>,
    failures: Vec<(Verb, String, Error)>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Recorded {
    pub type_: EventType,
    pub reason: String,
    pub message: String,
}

#[derive(Default)]
pub struct FakeEvents {
    events: Mutex<Vec<Recorded>>,
}

pub fn model(replicas: Option<i32>) -> Model {
    let mut model = Model::new(
        TEST_MODEL,
        ModelSpec {
            image: "phi".to_string(),
            replicas,
            storage_class_name: None,
            persistent_volume_claim: None,
            persistent_volume: None,
        },
    );
    model.metadata.namespace = Some(TEST_NAMESPACE.to_string());
    model
}

pub fn model_key() -> ObjectKey {
    ObjectKey::new(TEST_NAMESPACE, TEST_MODEL)
}

pub fn api_error(code: u16) -> Error {
    Error::Api(kube::Error::Api(kube::error::ErrorResponse {
        status: "Failure".to_string(),
        message: "injected".to_string(),
        reason: "InternalError".to_string(),
        code,
    }))
}

fn kind_of<K: Object>() -> String {
    K::kind(&()).to_string()
}

// === impl FakeStore ===

impl FakeStore {
    /// Stores an object as if some other client had created it.
    pub fn insert<K: Object>(&self, object: K) -> K {
        let mut state = self.state.lock();
        let key = ObjectKey::of(&object).unwrap();
        let mut value = serde_json::to_value(&object).unwrap();
        state.version += 1;
        let version = state.version;
        stamp(&mut value, version, true);
        state.objects.insert((kind_of::<K>(), key), value.clone());
        serde_json::from_value(value).unwrap()
    }

    pub fn object<K: Object>(&self, key: &ObjectKey) -> Option<K> {
        self.state
            .lock()
            .objects
            .get(&(kind_of::<K>(), key.clone()))
            .map(|v| serde_json::from_value(v.clone()).unwrap())
    }

    /// Applies a change as if some other client had written it.
    pub fn modify<K: Object>(&self, key: &ObjectKey, f: impl FnOnce(&mut K)) {
        let mut object = self.object::<K>(key).expect("object must exist");
        f(&mut object);
        let mut state = self.state.lock();
        let mut value = serde_json::to_value(&object).unwrap();
        state.version += 1;
        let version = state.version;
        stamp(&mut value, version, false);
        state.objects.insert((kind_of::<K>(), key.clone()), value);
    }

    /// Deletes the object right after the next read of it.
    pub fn vanish_after_get<K: Object>(&self, key: &ObjectKey) {
        self.state.lock().vanish_after_get = Some((kind_of::<K>(), key.clone()));
    }

    /// Fails the next `verb` request for an object of kind `K`.
    pub fn fail_next<K: Object>(&self, verb: Verb, error: Error) {
        self.state
            .lock()
            .failures
            .push((verb, kind_of::<K>(), error));
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().calls.clone()
    }

    pub fn count<K: Object>(&self, verb: Verb) -> usize {
        let kind = kind_of::<K>();
        self.state
            .lock()
            .calls
            .iter()
            .filter(|c| c.verb == verb && c.kind == kind)
            .count()
    }

    /// Counts writes of any kind.
    pub fn writes(&self) -> usize {
        self.state
            .lock()
            .calls
            .iter()
            .filter(|c| c.verb != Verb::Get)
            .count()
    }
}

impl State {
    fn record<K: Object>(&mut self, verb: Verb, key: &ObjectKey) -> Result<()> {
        let kind = kind_of::<K>();
        self.calls.push(Call {
            verb,
            kind: kind.clone(),
            name: key.name.clone(),
        });
        match self
            .failures
            .iter()
            .position(|(v, k, _)| *v == verb && *k == kind)
        {
            Some(i) => Err(self.failures.remove(i).2),
            None => Ok(()),
        }
    }

    fn next_version(&mut self) -> u64 {
        self.version += 1;
        self.version
    }
}

fn stamp(value: &mut serde_json::Value, version: u64, assign_uid: bool) {
    let metadata = &mut value["metadata"];
    metadata["resourceVersion"] = serde_json::Value::String(version.to_string());
    if assign_uid && metadata.get("uid").is_none() {
        metadata["uid"] = serde_json::Value::String(format!("uid-{version}"));
    }
}

fn resource_version(value: &serde_json::Value) -> Option<&str> {
    value["metadata"]["resourceVersion"].as_str()
}

#[async_trait]
impl Store for FakeStore {
    async fn get<K: Object>(&self, key: &ObjectKey) -> Result<Option<K>> {
        let mut state = self.state.lock();
        state.record::<K>(Verb::Get, key)?;
        let id = (kind_of::<K>(), key.clone());
        let value = state.objects.get(&id).cloned();
        if state.vanish_after_get.as_ref() == Some(&id) {
            state.vanish_after_get = None;
            state.objects.remove(&id);
        }
        Ok(value.map(serde_json::from_value).transpose()?)
    }

    async fn create<K: Object>(&self, object: &K) -> Result<K> {
        let key = ObjectKey::of(object)?;
        let mut state = self.state.lock();
        state.record::<K>(Verb::Create, &key)?;
        let id = (kind_of::<K>(), key.clone());
        if state.objects.contains_key(&id) {
            return Err(Error::conflict::<K>(key));
        }
        let mut value = serde_json::to_value(object)?;
        let version = state.next_version();
        stamp(&mut value, version, true);
        state.objects.insert(id, value.clone());
        Ok(serde_json::from_value(value)?)
    }

    async fn update<K: Object>(&self, object: &K) -> Result<K> {
        let key = ObjectKey::of(object)?;
        let mut state = self.state.lock();
        state.record::<K>(Verb::Update, &key)?;
        let id = (kind_of::<K>(), key.clone());
        let Some(stored) = state.objects.get(&id).cloned() else {
            return Err(Error::not_found::<K>(key));
        };
        if object.meta().resource_version.as_deref() != resource_version(&stored) {
            return Err(Error::conflict::<K>(key));
        }
        let mut value = serde_json::to_value(object)?;
        match stored.get("status") {
            Some(status) => value["status"] = status.clone(),
            None => {
                if let Some(fields) = value.as_object_mut() {
                    fields.remove("status");
                }
            }
        }
        let version = state.next_version();
        stamp(&mut value, version, false);
        state.objects.insert(id, value.clone());
        Ok(serde_json::from_value(value)?)
    }

    async fn update_status<K: Object>(&self, object: &K) -> Result<K> {
        let key = ObjectKey::of(object)?;
        let mut state = self.state.lock();
        state.record::<K>(Verb::UpdateStatus, &key)?;
        let id = (kind_of::<K>(), key.clone());
        let Some(mut stored) = state.objects.get(&id).cloned() else {
            return Err(Error::not_found::<K>(key));
        };
        if object.meta().resource_version.as_deref() != resource_version(&stored) {
            return Err(Error::conflict::<K>(key));
        }
        stored["status"] = serde_json::to_value(object)?["status"].clone();
        let version = state.next_version();
        stamp(&mut stored, version, false);
        state.objects.insert(id, stored.clone());
        Ok(serde_json::from_value(stored)?)
    }
}

// === impl FakeEvents ===

impl FakeEvents {
    pub fn recorded(&self) -> Vec<Recorded> {
        self.events.lock().clone()
    }

    pub fn reasons(&self) -> Vec<String> {
        self.events.lock().iter().map(|e| e.reason.clone()).collect()
    }
}

#[async_trait]
impl EventSink for FakeEvents {
    async fn emit(
        &self,
        _regarding: &ObjectReference,
        type_: EventType,
        reason: &str,
        message: String,
    ) {
        self.events.lock().push(Recorded {
            type_,
            reason: reason.to_string(),
            message,
        });
    }
}

#[test]
fn managed_names_are_prefixed_with_the_kind_of_object() {
    assert_eq!(crate::names::model_app_name("phi"), "ollama-model-phi");
    assert_eq!(
        crate::names::image_store_name("phi"),
        "ollama-models-store-phi"
    );
}

pub fn metadata(name: &str) -> ObjectMeta {
    ObjectMeta {
        name: Some(name.to_string()),
        namespace: Some(TEST_NAMESPACE.to_string()),
        ..Default::default()
    }
}
