//! Hiveform Core - core types for managing Hive custom resources
//!
//! This crate provides the data the lifecycle engine works on:
//! - `HiveKind`: the closed set of Hive kinds and their API coordinates
//! - `ResourceIdentity`: validated kind/namespace/name, import id parsing
//! - `DesiredState` / `ObservedState`: object metadata plus an opaque spec
//! - `ResourceSettings`: field manager, conflicts, propagation, wait conditions
//! - `ProviderConfig`: provider-wide defaults loaded from YAML
//! - `manifest`: offline YAML rendering

pub mod config;
pub mod error;
pub mod identity;
pub mod jsonpath;
pub mod kind;
pub mod manifest;
pub mod object;
pub mod resource;
pub mod settings;

pub use config::{DEFAULT_FIELD_MANAGER, ProviderConfig};
pub use error::{CoreError, Result};
pub use identity::ResourceIdentity;
pub use jsonpath::JsonPath;
pub use kind::{HiveKind, KindDescriptor, Scope};
pub use object::{DesiredState, ManagedFields, ObjectMetadata, ObservedState};
pub use resource::{ResourceConfig, ResourceState, parse_documents};
pub use settings::{DeletionPropagation, ResourceSettings, WaitForDelete, WaitForUpsert};
