//! Mock object API for testing
//!
//! Stores objects in memory keyed by their API path and mimics the parts of
//! API server behaviour the lifecycle engine depends on: server-side apply
//! merges, `managedFields` ownership (fields a manager stops applying are
//! removed) and ownership conflicts, server-populated fields, deletion that
//! completes after a number of reads, and injected failures.

use async_trait::async_trait;
use hiveform_core::{DeletionPropagation, ManagedFields, ResourceIdentity};
use kube::core::ErrorResponse;
use serde_json::{Map, Value, json};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock};

use crate::api::{ApplyParams, ObjectApi};
use crate::diff::{field_set, owned_fields};
use crate::error::{KubeError, Result};

/// How an object goes away after DELETE
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeleteBehavior {
    /// Gone before the next read
    #[default]
    Immediate,
    /// Still visible for this many reads, as with a finalizer
    AfterGets(usize),
    /// Never goes away
    Never,
}

#[derive(Debug, Clone)]
struct StoredObject {
    object: Value,
    manager: String,
    /// Reads left before a pending deletion completes
    deleting: Option<Option<usize>>,
    /// Status merged into the object after this many reads
    pending_status: Option<(usize, Value)>,
}

#[derive(Default)]
struct MockState {
    objects: HashMap<String, StoredObject>,
    last_apply: Option<ApplyParams>,
    last_propagation: Option<Option<DeletionPropagation>>,
    get_error: Option<u16>,
    next_uid: u64,
}

/// In-memory object API for testing
#[derive(Clone, Default)]
pub struct MockObjectApi {
    state: Arc<RwLock<MockState>>,
    /// Track operation counts for assertions
    operations: Arc<RwLock<OperationCounts>>,
    default_labels: BTreeMap<String, String>,
    delete_behavior: DeleteBehavior,
}

/// Counts of operations performed for testing assertions
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct OperationCounts {
    pub gets: usize,
    pub applies: usize,
    pub deletes: usize,
}

fn api_error(code: u16, reason: &str, message: String) -> KubeError {
    KubeError::Api(kube::Error::Api(ErrorResponse {
        status: "Failure".to_string(),
        message,
        reason: reason.to_string(),
        code,
    }))
}

/// Recursive merge, objects merge key by key and anything else is replaced
fn merge(target: &mut Value, patch: &Value) {
    match (target, patch) {
        (Value::Object(target), Value::Object(patch)) => {
            for (key, value) in patch {
                match target.get_mut(key) {
                    Some(existing) => merge(existing, value),
                    None => {
                        target.insert(key.clone(), value.clone());
                    }
                }
            }
        }
        (target, patch) => *target = patch.clone(),
    }
}

/// Whether applying `patch` would change any field already set on `current`
fn changes_owned_fields(current: &Value, patch: &Value) -> bool {
    match (current, patch) {
        (Value::Object(current), Value::Object(patch)) => patch.iter().any(|(key, value)| {
            current
                .get(key)
                .is_some_and(|existing| changes_owned_fields(existing, value))
        }),
        (current, patch) => current != patch,
    }
}

/// The part of a manifest that field ownership is tracked for
fn applied_fields(manifest: &Value) -> Value {
    let mut tracked = Map::new();
    let mut metadata = Map::new();
    for key in ["labels", "annotations"] {
        if let Some(value) = manifest.get("metadata").and_then(|m| m.get(key)) {
            metadata.insert(key.to_string(), value.clone());
        }
    }
    if !metadata.is_empty() {
        tracked.insert("metadata".to_string(), Value::Object(metadata));
    }
    if let Some(spec) = manifest.get("spec").filter(|s| !s.is_null()) {
        tracked.insert("spec".to_string(), spec.clone());
    }
    field_set(&Value::Object(tracked))
}

/// Drop leaf fields that were in `previous` but are missing from `current`
///
/// Maps that held owned fields stay, possibly empty.
fn remove_dropped(object: &mut Value, previous: &Value, current: &Value) {
    let (Value::Object(target), Value::Object(previous)) = (object, previous) else {
        return;
    };
    let nothing = Value::Object(Map::new());

    for (key, children) in previous {
        let Some(field) = key.strip_prefix("f:") else {
            continue;
        };
        let kept = current.get(key);
        let is_leaf = children.as_object().is_none_or(Map::is_empty);
        if is_leaf {
            if kept.is_none() {
                target.remove(field);
            }
        } else if let Some(child) = target.get_mut(field) {
            remove_dropped(child, children, kept.unwrap_or(&nothing));
        }
    }
}

fn managed_fields(object: &Value) -> Vec<ManagedFields> {
    object
        .pointer("/metadata/managedFields")
        .and_then(|entries| serde_json::from_value(entries.clone()).ok())
        .unwrap_or_default()
}

/// Replace the Apply entry of `manager` with `fields`
fn record_ownership(object: &mut Value, manager: &str, fields: Value) {
    let mut entries: Vec<ManagedFields> = managed_fields(object)
        .into_iter()
        .filter(|entry| !entry.is_apply_by(manager))
        .collect();
    entries.push(ManagedFields::applied(manager, fields));
    object["metadata"]["managedFields"] = json!(entries);
}

impl MockObjectApi {
    /// Create a new empty mock API
    pub fn new() -> Self {
        Self::default()
    }

    /// Labels the "server" adds to every applied object
    pub fn with_default_labels<I, K, V>(mut self, labels: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.default_labels = labels
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        self
    }

    pub fn with_delete_behavior(mut self, behavior: DeleteBehavior) -> Self {
        self.delete_behavior = behavior;
        self
    }

    /// Seed an object as if another field manager had applied it
    pub fn insert(&self, identity: &ResourceIdentity, object: Value, manager: &str) {
        let mut state = self.state.write().unwrap();
        let mut object = object;
        Self::stamp_server_fields(&mut state, identity, &mut object);
        let owned = applied_fields(&object);
        record_ownership(&mut object, manager, owned);
        state.objects.insert(
            identity.api_path(),
            StoredObject {
                object,
                manager: manager.to_string(),
                deleting: None,
                pending_status: None,
            },
        );
    }

    /// Make `status` appear on the object after `gets` more reads
    pub fn set_status_after(&self, identity: &ResourceIdentity, gets: usize, status: Value) {
        let mut state = self.state.write().unwrap();
        if let Some(stored) = state.objects.get_mut(&identity.api_path()) {
            stored.pending_status = Some((gets, status));
        }
    }

    /// Fail every subsequent GET with this HTTP status, `None` to stop
    pub fn fail_gets_with(&self, code: Option<u16>) {
        self.state.write().unwrap().get_error = code;
    }

    /// Get the stored object, bypassing counts and behaviours
    pub fn object(&self, identity: &ResourceIdentity) -> Option<Value> {
        let state = self.state.read().unwrap();
        state
            .objects
            .get(&identity.api_path())
            .map(|stored| stored.object.clone())
    }

    pub fn object_count(&self) -> usize {
        self.state.read().unwrap().objects.len()
    }

    /// Parameters of the most recent apply
    pub fn last_apply(&self) -> Option<ApplyParams> {
        self.state.read().unwrap().last_apply.clone()
    }

    /// Propagation policy of the most recent delete
    pub fn last_propagation(&self) -> Option<Option<DeletionPropagation>> {
        self.state.read().unwrap().last_propagation
    }

    /// Get operation counts for assertions
    pub fn operation_counts(&self) -> OperationCounts {
        self.operations.read().unwrap().clone()
    }

    /// Reset operation counts
    pub fn reset_counts(&self) {
        let mut ops = self.operations.write().unwrap();
        *ops = OperationCounts::default();
    }

    fn stamp_server_fields(state: &mut MockState, identity: &ResourceIdentity, object: &mut Value) {
        if !object.is_object() {
            *object = Value::Object(Map::new());
        }
        merge(
            object,
            &json!({
                "apiVersion": identity.kind.api_version(),
                "kind": identity.kind.kind(),
                "metadata": {"name": identity.name},
            }),
        );
        if let Some(ns) = &identity.namespace {
            object["metadata"]["namespace"] = Value::String(ns.clone());
        }
        if object["metadata"].get("uid").is_none() {
            state.next_uid += 1;
            object["metadata"]["uid"] = Value::String(format!("uid-{}", state.next_uid));
            object["metadata"]["generation"] = json!(1);
        }
    }
}

#[async_trait]
impl ObjectApi for MockObjectApi {
    async fn get(&self, identity: &ResourceIdentity) -> Result<Value> {
        {
            let mut ops = self.operations.write().unwrap();
            ops.gets += 1;
        }

        let mut state = self.state.write().unwrap();
        if let Some(code) = state.get_error {
            return Err(api_error(
                code,
                "InternalError",
                format!("injected failure reading {}", identity.api_path()),
            ));
        }

        let path = identity.api_path();
        let not_found = || KubeError::NotFound {
            identity: identity.clone(),
        };

        let deleted = match state.objects.get_mut(&path) {
            None => return Err(not_found()),
            Some(stored) => match &mut stored.deleting {
                Some(Some(0)) => true,
                Some(Some(remaining)) => {
                    *remaining -= 1;
                    false
                }
                _ => false,
            },
        };
        if deleted {
            state.objects.remove(&path);
            return Err(not_found());
        }

        let stored = state.objects.get_mut(&path).ok_or_else(not_found)?;
        if let Some((remaining, status)) = stored.pending_status.take() {
            if remaining == 0 {
                stored.object["status"] = status;
            } else {
                stored.pending_status = Some((remaining - 1, status));
            }
        }

        Ok(stored.object.clone())
    }

    async fn apply(
        &self,
        identity: &ResourceIdentity,
        manifest: &Value,
        params: &ApplyParams,
    ) -> Result<Value> {
        {
            let mut ops = self.operations.write().unwrap();
            ops.applies += 1;
        }

        let mut state = self.state.write().unwrap();
        state.last_apply = Some(params.clone());

        let path = identity.api_path();
        let mut object = match state.objects.get(&path) {
            Some(stored) => {
                if stored.manager != params.field_manager
                    && !params.force
                    && changes_owned_fields(&stored.object, manifest)
                {
                    return Err(api_error(
                        409,
                        "Conflict",
                        format!(
                            "Apply failed with 1 conflict: conflict with \"{}\"",
                            stored.manager
                        ),
                    ));
                }
                stored.object.clone()
            }
            None => Value::Object(Map::new()),
        };

        let previous_spec = object.get("spec").cloned();
        let owned = applied_fields(manifest);
        if let Some(previous) = owned_fields(&managed_fields(&object), &params.field_manager) {
            remove_dropped(&mut object, &previous, &owned);
        }
        merge(&mut object, manifest);
        for (key, value) in &self.default_labels {
            object["metadata"]["labels"][key] = Value::String(value.clone());
        }
        Self::stamp_server_fields(&mut state, identity, &mut object);
        record_ownership(&mut object, &params.field_manager, owned);
        if previous_spec.is_some() && previous_spec.as_ref() != object.get("spec") {
            let generation = object["metadata"]["generation"].as_i64().unwrap_or(1);
            object["metadata"]["generation"] = json!(generation + 1);
        }

        let pending_status = state
            .objects
            .get(&path)
            .and_then(|stored| stored.pending_status.clone());
        state.objects.insert(
            path,
            StoredObject {
                object: object.clone(),
                manager: params.field_manager.clone(),
                deleting: None,
                pending_status,
            },
        );

        Ok(object)
    }

    async fn delete(
        &self,
        identity: &ResourceIdentity,
        propagation: Option<DeletionPropagation>,
    ) -> Result<()> {
        {
            let mut ops = self.operations.write().unwrap();
            ops.deletes += 1;
        }

        let mut state = self.state.write().unwrap();
        state.last_propagation = Some(propagation);

        let path = identity.api_path();
        let Some(stored) = state.objects.get_mut(&path) else {
            return Err(KubeError::NotFound {
                identity: identity.clone(),
            });
        };

        stored.object["metadata"]["deletionTimestamp"] =
            Value::String("2024-01-01T00:00:00Z".to_string());
        stored.deleting = match self.delete_behavior {
            DeleteBehavior::Immediate => None,
            DeleteBehavior::AfterGets(gets) => Some(Some(gets)),
            DeleteBehavior::Never => Some(None),
        };

        if self.delete_behavior == DeleteBehavior::Immediate {
            state.objects.remove(&path);
        }

        Ok(())
    }
}
