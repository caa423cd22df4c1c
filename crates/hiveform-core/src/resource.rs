//! Resource documents and tracked resource state
//!
//! A resource document is what a user writes: the kind, metadata, an opaque
//! spec and the lifecycle settings, one YAML document per resource. The
//! [`ResourceState`] is what gets tracked after a successful operation.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{CoreError, Result};
use crate::identity::ResourceIdentity;
use crate::kind::HiveKind;
use crate::object::{DesiredState, ManagedFields, ObjectMetadata, ObservedState};
use crate::settings::ResourceSettings;

/// One resource as declared by the user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceConfig {
    pub kind: HiveKind,

    pub metadata: ObjectMetadata,

    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub spec: Value,

    #[serde(flatten)]
    pub settings: ResourceSettings,
}

impl ResourceConfig {
    pub fn new(kind: HiveKind, metadata: ObjectMetadata, spec: Value) -> Self {
        Self {
            kind,
            metadata,
            spec,
            settings: ResourceSettings::default(),
        }
    }

    pub fn identity(&self) -> Result<ResourceIdentity> {
        self.metadata.identity(self.kind)
    }

    pub fn desired(&self) -> DesiredState {
        DesiredState::new(self.metadata.clone(), self.spec.clone())
    }

    /// Validate identity and settings without contacting the cluster
    pub fn validate(&self) -> Result<ResourceIdentity> {
        let identity = self.identity()?;
        self.settings.validate()?;
        Ok(identity)
    }
}

/// Parse a YAML stream of resource documents separated by `---`
///
/// Empty and comment-only documents are skipped.
pub fn parse_documents(content: &str) -> Result<Vec<ResourceConfig>> {
    let mut resources = Vec::new();

    for (index, doc) in split_documents(content).enumerate() {
        let doc = doc.trim();
        if doc.is_empty()
            || doc
                .lines()
                .all(|l| l.trim().is_empty() || l.trim().starts_with('#'))
        {
            continue;
        }

        let resource: ResourceConfig =
            serde_yaml::from_str(doc).map_err(|e| CoreError::InvalidDocument {
                index,
                message: e.to_string(),
            })?;
        resources.push(resource);
    }

    Ok(resources)
}

/// Split on separator lines only, so `---` inside a block scalar survives
fn split_documents(content: &str) -> impl Iterator<Item = String> + '_ {
    let mut docs = vec![String::new()];
    for line in content.lines() {
        if line.trim_end() == "---" {
            docs.push(String::new());
        } else if let Some(current) = docs.last_mut() {
            current.push_str(line);
            current.push('\n');
        }
    }
    docs.into_iter()
}

/// State tracked for a managed resource after an operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceState {
    /// `namespace/name` or `name`
    pub id: String,

    pub kind: HiveKind,

    pub metadata: ObjectMetadata,

    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub spec: Value,

    #[serde(flatten)]
    pub settings: ResourceSettings,

    /// Field ownership reported by the server at the last read or write
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub managed_fields: Vec<ManagedFields>,
}

impl ResourceState {
    /// State seeded by an import: only the identity fields are known
    pub fn imported(identity: &ResourceIdentity) -> Self {
        Self {
            id: identity.id(),
            kind: identity.kind,
            metadata: ObjectMetadata::new(identity.namespace.as_deref(), &identity.name),
            spec: Value::Null,
            settings: ResourceSettings::default(),
            managed_fields: Vec::new(),
        }
    }

    /// State after a write or read, echoing what the server reported
    pub fn observed(
        identity: &ResourceIdentity,
        observed: &ObservedState,
        settings: &ResourceSettings,
    ) -> Self {
        Self {
            id: identity.id(),
            kind: identity.kind,
            metadata: observed.metadata.clone(),
            spec: observed.spec.clone(),
            settings: settings.clone(),
            managed_fields: observed.managed_fields.clone(),
        }
    }

    pub fn identity(&self) -> Result<ResourceIdentity> {
        self.metadata.identity(self.kind)
    }

    /// Render the state back into a document a user could apply
    pub fn to_config(&self) -> ResourceConfig {
        ResourceConfig {
            kind: self.kind,
            metadata: self.metadata.clone(),
            spec: self.spec.clone(),
            settings: self.settings.clone(),
        }
    }
}
