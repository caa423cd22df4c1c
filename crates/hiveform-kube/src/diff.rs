//! Diff engine for detecting drift between desired and live objects
//!
//! Only fields the desired state sets are compared, the way server-side
//! apply ownership works: labels added by controllers, status and other
//! server-populated fields never count as drift.

use hiveform_core::{DesiredState, ManagedFields, ObservedState, ResourceIdentity};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use similar::{ChangeTag, TextDiff};

use crate::error::Result;

/// Diff engine for drift detection
pub struct DiffEngine {
    /// Context lines kept around each change
    pub context_lines: usize,
}

impl DiffEngine {
    /// Create a new diff engine
    pub fn new() -> Self {
        Self { context_lines: 3 }
    }

    /// Compare the desired state with the live object, `None` when absent
    pub fn diff(
        &self,
        identity: &ResourceIdentity,
        desired: &DesiredState,
        live: Option<&ObservedState>,
    ) -> Result<ResourceChange> {
        let desired_value = desired_view(identity, desired)?;
        let desired_yaml = serde_yaml::to_string(&desired_value)?;

        let (change_type, diff) = match live {
            None => (ChangeType::Added, DiffContent::new_addition(&desired_yaml)),
            Some(observed) => {
                let live_value = serde_json::to_value(observed.to_desired())?;
                let projected = project(&live_value, &desired_value);
                let live_yaml = serde_yaml::to_string(&projected)?;

                if live_yaml == desired_yaml {
                    (ChangeType::Unchanged, DiffContent::default())
                } else {
                    (
                        ChangeType::Drifted,
                        self.compute_text_diff(&live_yaml, &desired_yaml),
                    )
                }
            }
        };

        Ok(ResourceChange {
            identity: identity.to_string(),
            change_type,
            diff,
        })
    }

    /// Compute a text diff between two strings
    fn compute_text_diff(&self, old: &str, new: &str) -> DiffContent {
        let diff = TextDiff::from_lines(old, new);
        let mut lines = Vec::new();

        for group in diff.grouped_ops(self.context_lines) {
            for op in group {
                for change in diff.iter_changes(&op) {
                    let line_type = match change.tag() {
                        ChangeTag::Delete => LineType::Removed,
                        ChangeTag::Insert => LineType::Added,
                        ChangeTag::Equal => LineType::Context,
                    };

                    lines.push(DiffLine {
                        line_type,
                        content: change.value().trim_end().to_string(),
                        old_line_no: change.old_index(),
                        new_line_no: change.new_index(),
                    });
                }
            }
        }

        DiffContent { lines }
    }

    /// Generate a human-readable summary
    pub fn summary(&self, result: &DiffResult) -> String {
        let added = result.changes_by_type(ChangeType::Added).len();
        let drifted = result.changes_by_type(ChangeType::Drifted).len();

        let mut parts = Vec::new();
        if added > 0 {
            parts.push(format!("{} to create", added));
        }
        if drifted > 0 {
            parts.push(format!("{} drifted", drifted));
        }

        if parts.is_empty() {
            "No changes".to_string()
        } else {
            parts.join(", ")
        }
    }
}

impl Default for DiffEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Desired state as it would be sent, identity fields included
fn desired_view(identity: &ResourceIdentity, desired: &DesiredState) -> Result<Value> {
    let mut view = desired.clone();
    view.metadata.name = identity.name.clone();
    view.metadata.namespace = identity.namespace.clone();
    Ok(serde_json::to_value(view)?)
}

/// Restrict `live` to the fields present in `desired`
///
/// Objects are projected key by key. Any other value, arrays included, is
/// taken whole from the live side.
pub fn project(live: &Value, desired: &Value) -> Value {
    match (live, desired) {
        (Value::Object(live), Value::Object(desired)) => {
            let projected: Map<String, Value> = desired
                .iter()
                .filter_map(|(key, wanted)| live.get(key).map(|v| (key.clone(), project(v, wanted))))
                .collect();
            Value::Object(projected)
        }
        (live, _) => live.clone(),
    }
}

/// Field set of a value in the `FieldsV1` encoding
///
/// Every object key becomes an `f:` entry; arrays and scalars are leaves.
pub fn field_set(value: &Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(key, child)| (format!("f:{key}"), field_set(child)))
                .collect(),
        ),
        _ => Value::Object(Map::new()),
    }
}

/// Fields applied by `manager`, `None` when it owns nothing on the object
pub fn owned_fields(entries: &[ManagedFields], manager: &str) -> Option<Value> {
    let mut owned: Option<Value> = None;
    for entry in entries.iter().filter(|e| e.is_apply_by(manager)) {
        match owned.as_mut() {
            Some(fields) => union(fields, &entry.fields_v1),
            None => owned = Some(entry.fields_v1.clone()),
        }
    }
    owned
}

fn union(target: &mut Value, other: &Value) {
    if let (Value::Object(target), Value::Object(other)) = (target, other) {
        for (key, child) in other {
            match target.get_mut(key) {
                Some(existing) => union(existing, child),
                None => {
                    target.insert(key.clone(), child.clone());
                }
            }
        }
    }
}

/// Dotted paths of owned fields that `manifest` no longer sets
///
/// Only `f:` keys are followed. List entries (`k:`, `v:`, `i:`) change the
/// list value itself, which the projection comparison already catches.
pub fn removed_fields(owned: &Value, manifest: &Value) -> Vec<String> {
    let mut removed = Vec::new();
    collect_removed(owned, manifest, "", &mut removed);
    removed
}

fn collect_removed(owned: &Value, manifest: &Value, prefix: &str, removed: &mut Vec<String>) {
    let Value::Object(owned) = owned else {
        return;
    };

    for (key, children) in owned {
        let Some(field) = key.strip_prefix("f:") else {
            continue;
        };
        let path = if prefix.is_empty() {
            field.to_string()
        } else {
            format!("{prefix}.{field}")
        };

        match manifest.get(field) {
            None | Some(Value::Null) => removed.push(path),
            Some(child) => collect_removed(children, child, &path, removed),
        }
    }
}

/// Result of diffing a set of resources
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DiffResult {
    pub changes: Vec<ResourceChange>,
}

impl DiffResult {
    /// Check if any resource would change
    pub fn has_changes(&self) -> bool {
        self.changes
            .iter()
            .any(|c| c.change_type != ChangeType::Unchanged)
    }

    /// Get changes by type
    pub fn changes_by_type(&self, change_type: ChangeType) -> Vec<&ResourceChange> {
        self.changes
            .iter()
            .filter(|c| c.change_type == change_type)
            .collect()
    }
}

/// Comparison of a single resource
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceChange {
    /// `Kind/namespace/name`
    pub identity: String,

    pub change_type: ChangeType,

    /// Desired side is `+`, live side is `-`
    pub diff: DiffContent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeType {
    /// Object does not exist yet
    Added,

    /// Live object differs from the desired state
    Drifted,

    Unchanged,
}

impl std::fmt::Display for ChangeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChangeType::Added => write!(f, "added"),
            ChangeType::Drifted => write!(f, "drifted"),
            ChangeType::Unchanged => write!(f, "unchanged"),
        }
    }
}

/// Detailed diff content
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DiffContent {
    pub lines: Vec<DiffLine>,
}

impl DiffContent {
    /// Create a diff showing all lines as additions
    fn new_addition(content: &str) -> Self {
        let lines = content
            .lines()
            .enumerate()
            .map(|(i, line)| DiffLine {
                line_type: LineType::Added,
                content: line.to_string(),
                old_line_no: None,
                new_line_no: Some(i),
            })
            .collect();

        Self { lines }
    }

    /// Generate a unified diff string
    pub fn to_unified_diff(&self) -> String {
        let mut output = String::new();

        for line in &self.lines {
            let prefix = match line.line_type {
                LineType::Added => "+",
                LineType::Removed => "-",
                LineType::Context => " ",
            };
            output.push_str(prefix);
            output.push_str(&line.content);
            output.push('\n');
        }

        output
    }
}

/// A single line in a diff
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiffLine {
    pub line_type: LineType,

    pub content: String,

    /// Line number on the live side
    pub old_line_no: Option<usize>,

    /// Line number on the desired side
    pub new_line_no: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineType {
    Added,
    Removed,
    Context,
}
