//! Hiveform Kube - lifecycle engine for Hive custom resources
//!
//! This crate provides:
//! - **Object API**: GET, server-side apply and DELETE against one object, live or mocked
//! - **Lifecycle Engine**: apply with upsert waits, read, delete with a bounded wait
//! - **Provider**: Terraform-style operations reporting through diagnostics
//! - **Diff Engine**: drift between a document and the live object

pub mod api;
pub mod client;
pub mod diagnostics;
pub mod diff;
pub mod error;
pub mod lifecycle;
pub mod mock;
pub mod provider;
pub mod wait;

pub use api::{ApplyParams, KubeObjectApi, ObjectApi, api_resource};
pub use client::connect;
pub use diagnostics::{Diagnostic, DiagnosticKind, Diagnostics, Severity};
pub use diff::{ChangeType, DiffEngine, DiffResult, ResourceChange};
pub use error::{KubeError, Result};
pub use lifecycle::{LifecycleEngine, ProviderContext};
pub use mock::{DeleteBehavior, MockObjectApi, OperationCounts};
pub use provider::{PlanAction, Provider};
pub use wait::{DeleteOutcome, DeleteState};
