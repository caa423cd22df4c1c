//! Offline manifest rendering
//!
//! The manifest variants of every kind produce the YAML a user would hand to
//! `kubectl apply`, without contacting a cluster.

use serde::Serialize;
use serde_json::Value;

use crate::error::Result;
use crate::identity::ResourceIdentity;
use crate::object::{DesiredState, ObjectMetadata};
use crate::resource::ResourceConfig;

/// Field order of a rendered manifest
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ManifestDocument<'a> {
    api_version: String,
    kind: &'static str,
    metadata: &'a ObjectMetadata,
    #[serde(skip_serializing_if = "Value::is_null")]
    spec: &'a Value,
}

/// Render one object as a YAML document
pub fn render(identity: &ResourceIdentity, desired: &DesiredState) -> Result<String> {
    let metadata = ObjectMetadata {
        name: identity.name.clone(),
        namespace: identity.namespace.clone(),
        labels: desired.metadata.labels.clone(),
        annotations: desired.metadata.annotations.clone(),
    };

    let document = ManifestDocument {
        api_version: identity.kind.api_version(),
        kind: identity.kind.kind(),
        metadata: &metadata,
        spec: &desired.spec,
    };

    Ok(serde_yaml::to_string(&document)?)
}

/// Validate and render a resource document
pub fn render_config(config: &ResourceConfig) -> Result<String> {
    let identity = config.identity()?;
    render(&identity, &config.desired())
}

/// Render several documents into one `---` separated stream
pub fn render_all(configs: &[ResourceConfig]) -> Result<String> {
    let rendered = configs
        .iter()
        .map(render_config)
        .collect::<Result<Vec<_>>>()?;
    Ok(rendered.join("---\n"))
}
