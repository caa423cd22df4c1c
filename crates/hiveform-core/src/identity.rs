//! Addressing a single Hive object
//!
//! A [`ResourceIdentity`] is the kind plus the object's name and, for
//! namespaced kinds, its namespace. Identities are validated on construction
//! so a malformed one never reaches the API server.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;

use crate::error::{CoreError, Result};
use crate::kind::HiveKind;

/// DNS-1123 subdomain, the format of `metadata.name`
static DNS_SUBDOMAIN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-z0-9]([-a-z0-9]*[a-z0-9])?(\.[a-z0-9]([-a-z0-9]*[a-z0-9])?)*$")
        .expect("DNS-1123 pattern is valid")
});

/// DNS-1123 label, the format of `metadata.namespace`
static DNS_LABEL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-z0-9]([-a-z0-9]*[a-z0-9])?$")
        .expect("DNS-1123 pattern is valid")
});

const MAX_NAME_LENGTH: usize = 253;
const MAX_NAMESPACE_LENGTH: usize = 63;

/// Identity of one Kubernetes object
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceIdentity {
    pub kind: HiveKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    pub name: String,
}

impl ResourceIdentity {
    /// Build a validated identity
    pub fn new(kind: HiveKind, namespace: Option<&str>, name: &str) -> Result<Self> {
        validate_name(kind, name)?;

        let namespace = match (kind.is_namespaced(), namespace) {
            (true, Some(ns)) => {
                validate_namespace(kind, ns)?;
                Some(ns.to_string())
            }
            (true, None) => {
                return Err(invalid(kind, "metadata.namespace is required"));
            }
            (false, Some(ns)) => {
                return Err(invalid(
                    kind,
                    format!("kind is cluster-scoped but namespace '{ns}' was given"),
                ));
            }
            (false, None) => None,
        };

        Ok(Self {
            kind,
            namespace,
            name: name.to_string(),
        })
    }

    /// Parse an import identifier
    ///
    /// Namespaced kinds take `<namespace>/<name>`, cluster-scoped kinds take
    /// `<name>`. Any other shape is rejected.
    pub fn import(kind: HiveKind, id: &str) -> Result<Self> {
        let segments: Vec<&str> = id.split('/').collect();

        let (namespace, name) = if kind.is_namespaced() {
            match segments.as_slice() {
                [ns, name] if !ns.is_empty() && !name.is_empty() => (Some(*ns), *name),
                _ => {
                    return Err(CoreError::InvalidImportId {
                        id: id.to_string(),
                        reason: "expected the form <namespace>/<name>".to_string(),
                    });
                }
            }
        } else {
            match segments.as_slice() {
                [name] if !name.is_empty() => (None, *name),
                _ => {
                    return Err(CoreError::InvalidImportId {
                        id: id.to_string(),
                        reason: "expected the form <name>".to_string(),
                    });
                }
            }
        };

        Self::new(kind, namespace, name).map_err(|e| CoreError::InvalidImportId {
            id: id.to_string(),
            reason: e.to_string(),
        })
    }

    /// The identifier stored in state, `namespace/name` or `name`
    pub fn id(&self) -> String {
        match &self.namespace {
            Some(ns) => format!("{}/{}", ns, self.name),
            None => self.name.clone(),
        }
    }

    /// REST path of the object on the API server
    pub fn api_path(&self) -> String {
        let d = self.kind.descriptor();
        match &self.namespace {
            Some(ns) => format!(
                "/apis/{}/{}/namespaces/{}/{}/{}",
                d.group, d.version, ns, d.plural, self.name
            ),
            None => format!("/apis/{}/{}/{}/{}", d.group, d.version, d.plural, self.name),
        }
    }

    /// Whether moving from `self` to `other` needs a delete and create
    pub fn requires_replacement(&self, other: &ResourceIdentity) -> bool {
        self != other
    }
}

impl fmt::Display for ResourceIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.kind, self.id())
    }
}

fn invalid(kind: HiveKind, message: impl Into<String>) -> CoreError {
    CoreError::InvalidIdentity {
        kind: kind.kind().to_string(),
        message: message.into(),
    }
}

fn validate_name(kind: HiveKind, name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(invalid(kind, "metadata.name must not be empty"));
    }
    if name.len() > MAX_NAME_LENGTH {
        return Err(invalid(
            kind,
            format!("metadata.name must be at most {MAX_NAME_LENGTH} characters"),
        ));
    }
    if !DNS_SUBDOMAIN.is_match(name) {
        return Err(invalid(
            kind,
            format!("metadata.name '{name}' is not a valid DNS-1123 subdomain"),
        ));
    }
    Ok(())
}

fn validate_namespace(kind: HiveKind, namespace: &str) -> Result<()> {
    if namespace.len() > MAX_NAMESPACE_LENGTH || !DNS_LABEL.is_match(namespace) {
        return Err(invalid(
            kind,
            format!("metadata.namespace '{namespace}' is not a valid DNS-1123 label"),
        ));
    }
    Ok(())
}
