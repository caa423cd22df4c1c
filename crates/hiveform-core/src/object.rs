//! Desired and observed object states
//!
//! The spec body of a Hive object is carried as an opaque JSON value; only
//! the standard metadata fields and server-side apply field ownership are
//! modelled.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

use crate::error::{CoreError, Result};
use crate::identity::ResourceIdentity;
use crate::kind::HiveKind;

/// Standard object metadata managed by the provider
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectMetadata {
    #[serde(default)]
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,
}

impl ObjectMetadata {
    pub fn new(namespace: Option<&str>, name: &str) -> Self {
        Self {
            name: name.to_string(),
            namespace: namespace.map(str::to_string),
            ..Default::default()
        }
    }

    /// Validated identity of the object this metadata names
    pub fn identity(&self, kind: HiveKind) -> Result<ResourceIdentity> {
        ResourceIdentity::new(kind, self.namespace.as_deref(), &self.name)
    }

    /// Extract metadata from a raw object, ignoring server-managed fields
    fn from_object(object: &Value) -> Result<Self> {
        let metadata = object
            .get("metadata")
            .ok_or_else(|| CoreError::InvalidObject {
                message: "object has no metadata".to_string(),
            })?;

        let name = metadata
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| CoreError::InvalidObject {
                message: "object has no metadata.name".to_string(),
            })?;

        Ok(Self {
            name: name.to_string(),
            namespace: metadata
                .get("namespace")
                .and_then(Value::as_str)
                .map(str::to_string),
            labels: string_map(metadata.get("labels"))?,
            annotations: string_map(metadata.get("annotations"))?,
        })
    }
}

fn string_map(value: Option<&Value>) -> Result<BTreeMap<String, String>> {
    match value {
        None | Some(Value::Null) => Ok(BTreeMap::new()),
        Some(v) => Ok(serde_json::from_value(v.clone())?),
    }
}

/// What the caller wants the object to look like
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DesiredState {
    pub metadata: ObjectMetadata,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub spec: Value,
}

impl DesiredState {
    pub fn new(metadata: ObjectMetadata, spec: Value) -> Self {
        Self { metadata, spec }
    }

    /// Build the full manifest sent to the API server
    ///
    /// `apiVersion` and `kind` come from the identity's kind and the name and
    /// namespace from the identity itself, whatever the metadata says.
    pub fn to_manifest(&self, identity: &ResourceIdentity) -> Value {
        let mut metadata = Map::new();
        metadata.insert("name".to_string(), Value::String(identity.name.clone()));
        if let Some(ns) = &identity.namespace {
            metadata.insert("namespace".to_string(), Value::String(ns.clone()));
        }
        if !self.metadata.labels.is_empty() {
            metadata.insert("labels".to_string(), string_map_value(&self.metadata.labels));
        }
        if !self.metadata.annotations.is_empty() {
            metadata.insert(
                "annotations".to_string(),
                string_map_value(&self.metadata.annotations),
            );
        }

        let mut manifest = Map::new();
        manifest.insert(
            "apiVersion".to_string(),
            Value::String(identity.kind.api_version()),
        );
        manifest.insert(
            "kind".to_string(),
            Value::String(identity.kind.kind().to_string()),
        );
        manifest.insert("metadata".to_string(), Value::Object(metadata));
        if !self.spec.is_null() {
            manifest.insert("spec".to_string(), self.spec.clone());
        }
        Value::Object(manifest)
    }
}

fn string_map_value(map: &BTreeMap<String, String>) -> Value {
    Value::Object(
        map.iter()
            .map(|(k, v)| (k.clone(), Value::String(v.clone())))
            .collect(),
    )
}

/// One entry of `metadata.managedFields`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManagedFields {
    pub manager: String,

    /// `Apply` or `Update`
    #[serde(default)]
    pub operation: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subresource: Option<String>,

    /// Owned field set in the `FieldsV1` encoding (`f:name` keys)
    #[serde(default, rename = "fieldsV1", skip_serializing_if = "Value::is_null")]
    pub fields_v1: Value,
}

impl ManagedFields {
    /// Entry recorded by a server-side apply
    pub fn applied(manager: impl Into<String>, fields_v1: Value) -> Self {
        Self {
            manager: manager.into(),
            operation: "Apply".to_string(),
            subresource: None,
            fields_v1,
        }
    }

    /// Whether this entry is a server-side apply of the main resource by `manager`
    pub fn is_apply_by(&self, manager: &str) -> bool {
        self.manager == manager && self.operation == "Apply" && self.subresource.is_none()
    }
}

/// What the API server reports for the object
///
/// This is a projection: metadata keeps name, namespace, labels and
/// annotations, plus the field ownership needed to plan removals. Server
/// bookkeeping such as `uid`, `resourceVersion` and `generation` is dropped.
/// Use `LifecycleEngine::read_raw` for the object exactly as returned.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ObservedState {
    pub metadata: ObjectMetadata,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub spec: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<Value>,
    #[serde(default, skip_serializing)]
    pub managed_fields: Vec<ManagedFields>,
}

impl ObservedState {
    /// Deserialize a raw object returned by the API server
    pub fn from_object(object: &Value) -> Result<Self> {
        let managed_fields = match object.pointer("/metadata/managedFields") {
            None | Some(Value::Null) => Vec::new(),
            Some(entries) => serde_json::from_value(entries.clone()).map_err(|e| {
                CoreError::InvalidObject {
                    message: format!("metadata.managedFields: {e}"),
                }
            })?,
        };

        Ok(Self {
            metadata: ObjectMetadata::from_object(object)?,
            spec: object.get("spec").cloned().unwrap_or(Value::Null),
            status: object.get("status").filter(|s| !s.is_null()).cloned(),
            managed_fields,
        })
    }

    /// Desired-state view of what the server holds, used for import and drift
    pub fn to_desired(&self) -> DesiredState {
        DesiredState {
            metadata: self.metadata.clone(),
            spec: self.spec.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn identity() -> ResourceIdentity {
        ResourceIdentity::new(HiveKind::ClusterClaim, Some("ns1"), "claim1").unwrap()
    }

    #[test]
    fn test_manifest_uses_kind_constants() {
        let mut metadata = ObjectMetadata::new(Some("ns1"), "claim1");
        metadata.labels.insert("team".to_string(), "infra".to_string());
        let desired = DesiredState::new(metadata, json!({"clusterPoolName": "pool"}));

        let manifest = desired.to_manifest(&identity());

        assert_eq!(manifest["apiVersion"], "hive.openshift.io/v1");
        assert_eq!(manifest["kind"], "ClusterClaim");
        assert_eq!(manifest["metadata"]["name"], "claim1");
        assert_eq!(manifest["metadata"]["namespace"], "ns1");
        assert_eq!(manifest["metadata"]["labels"]["team"], "infra");
        assert_eq!(manifest["spec"]["clusterPoolName"], "pool");
        assert!(manifest["metadata"].get("annotations").is_none());
    }

    #[test]
    fn test_manifest_identity_wins_over_metadata() {
        let desired = DesiredState::new(ObjectMetadata::new(Some("other"), "other"), Value::Null);
        let manifest = desired.to_manifest(&identity());

        assert_eq!(manifest["metadata"]["name"], "claim1");
        assert_eq!(manifest["metadata"]["namespace"], "ns1");
        assert!(manifest.get("spec").is_none());
    }

    #[test]
    fn test_observed_from_object() {
        let object = json!({
            "apiVersion": "hive.openshift.io/v1",
            "kind": "ClusterClaim",
            "metadata": {
                "name": "claim1",
                "namespace": "ns1",
                "uid": "1234",
                "resourceVersion": "42",
                "labels": {"team": "infra"}
            },
            "spec": {"clusterPoolName": "pool"},
            "status": {"conditions": []}
        });

        let observed = ObservedState::from_object(&object).unwrap();
        assert_eq!(observed.metadata.name, "claim1");
        assert_eq!(observed.metadata.namespace.as_deref(), Some("ns1"));
        assert_eq!(observed.metadata.labels["team"], "infra");
        assert!(observed.metadata.annotations.is_empty());
        assert_eq!(observed.spec["clusterPoolName"], "pool");
        assert!(observed.status.is_some());
    }

    #[test]
    fn test_observed_keeps_field_ownership() {
        let object = json!({
            "metadata": {
                "name": "claim1",
                "uid": "1234",
                "managedFields": [
                    {
                        "manager": "hiveform",
                        "operation": "Apply",
                        "apiVersion": "hive.openshift.io/v1",
                        "time": "2024-01-01T00:00:00Z",
                        "fieldsType": "FieldsV1",
                        "fieldsV1": {"f:spec": {"f:clusterPoolName": {}}}
                    },
                    {
                        "manager": "hive-controllers",
                        "operation": "Update",
                        "subresource": "status",
                        "fieldsV1": {"f:status": {}}
                    }
                ]
            }
        });

        let observed = ObservedState::from_object(&object).unwrap();
        assert_eq!(observed.managed_fields.len(), 2);
        assert!(observed.managed_fields[0].is_apply_by("hiveform"));
        assert!(!observed.managed_fields[1].is_apply_by("hive-controllers"));
        assert_eq!(
            observed.managed_fields[0],
            ManagedFields::applied("hiveform", json!({"f:spec": {"f:clusterPoolName": {}}}))
        );

        let view = serde_json::to_value(&observed).unwrap();
        assert!(view.get("managed_fields").is_none());
    }

    #[test]
    fn test_observed_rejects_malformed_ownership() {
        let object = json!({"metadata": {"name": "x", "managedFields": {"manager": 1}}});
        let err = ObservedState::from_object(&object).unwrap_err();
        assert!(err.to_string().contains("managedFields"));
    }

    #[test]
    fn test_observed_requires_name() {
        let err = ObservedState::from_object(&json!({"metadata": {}})).unwrap_err();
        assert!(err.to_string().contains("metadata.name"));
    }

    #[test]
    fn test_observed_rejects_non_string_labels() {
        let object = json!({"metadata": {"name": "x", "labels": {"a": 1}}});
        assert!(ObservedState::from_object(&object).is_err());
    }
}
