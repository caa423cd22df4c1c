//! Provider façade over the lifecycle engine
//!
//! Every operation reports problems through a `&mut Diagnostics` instead of
//! returning early errors, and yields `None` when nothing usable came out of
//! it. The caller checks [`Diagnostics::has_errors`] and halts for that
//! resource.

use hiveform_core::{
    HiveKind, ObservedState, ProviderConfig, ResourceConfig, ResourceIdentity, ResourceState,
    manifest,
};
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::api::{KubeObjectApi, ObjectApi};
use crate::client;
use crate::diagnostics::{Diagnostic, DiagnosticKind, Diagnostics};
use crate::diff::{DiffEngine, ResourceChange, field_set, owned_fields, project, removed_fields};
use crate::error::KubeError;
use crate::lifecycle::{LifecycleEngine, ProviderContext};
use crate::wait::{DeleteOutcome, DeleteState};

/// What applying a resource document would do
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanAction {
    Create,
    Update,
    /// Identity changed, delete then create
    Replace,
    Noop,
}

impl fmt::Display for PlanAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Replace => "replace",
            Self::Noop => "no-op",
        };
        f.write_str(s)
    }
}

/// Terraform-style operations for every Hive kind
pub struct Provider<A: ObjectApi> {
    context: ProviderContext,
    engine: Option<LifecycleEngine<A>>,
    diff_engine: DiffEngine,
}

impl Provider<KubeObjectApi> {
    /// Build a provider from configuration, connecting unless offline
    pub async fn configure(config: &ProviderConfig, diags: &mut Diagnostics) -> Option<Self> {
        if let Err(e) = config.validate() {
            diags.add_error("Invalid provider configuration", &KubeError::from(e));
            return None;
        }

        let context = ProviderContext::from_config(config);
        if config.offline {
            debug!("provider configured offline");
            return Some(Self::offline(context));
        }

        match client::connect(config).await {
            Ok(client) => Some(Self::with_api(KubeObjectApi::new(client), context)),
            Err(e) => {
                diags.add_error("Failed to configure Kubernetes client", &e);
                None
            }
        }
    }
}

impl<A: ObjectApi> Provider<A> {
    /// Provider that can only render manifests and parse imports
    pub fn offline(context: ProviderContext) -> Self {
        Self {
            context,
            engine: None,
            diff_engine: DiffEngine::new(),
        }
    }

    pub fn with_api(api: A, context: ProviderContext) -> Self {
        Self {
            engine: Some(LifecycleEngine::new(api, context.clone())),
            context,
            diff_engine: DiffEngine::new(),
        }
    }

    pub fn context(&self) -> &ProviderContext {
        &self.context
    }

    pub fn is_offline(&self) -> bool {
        self.engine.is_none()
    }

    pub fn engine(&self) -> Option<&LifecycleEngine<A>> {
        self.engine.as_ref()
    }

    fn online(&self, operation: &str, diags: &mut Diagnostics) -> Option<&LifecycleEngine<A>> {
        if self.engine.is_none() {
            diags.add_error(
                format!("Cannot {operation} in offline mode"),
                &KubeError::Offline {
                    operation: operation.to_string(),
                },
            );
        }
        self.engine.as_ref()
    }

    fn validated(config: &ResourceConfig, diags: &mut Diagnostics) -> Option<ResourceIdentity> {
        match config.validate() {
            Ok(identity) => Some(identity),
            Err(e) => {
                diags.add_error(
                    format!("Invalid {} configuration", config.kind),
                    &KubeError::from(e),
                );
                None
            }
        }
    }

    fn tracked_identity(state: &ResourceState, diags: &mut Diagnostics) -> Option<ResourceIdentity> {
        match state.identity() {
            Ok(identity) => Some(identity),
            Err(e) => {
                diags.add_error(
                    format!("Invalid {} state", state.kind),
                    &KubeError::from(e),
                );
                None
            }
        }
    }

    /// Decide what applying `config` over `prior` would do
    ///
    /// Fields the document sets are compared with the prior state, so server
    /// defaults do not cause updates. Fields the document dropped are an
    /// update when the effective field manager still owns them, or when the
    /// prior state carries no ownership and had them at all.
    pub fn plan(
        &self,
        prior: Option<&ResourceState>,
        config: &ResourceConfig,
        diags: &mut Diagnostics,
    ) -> Option<PlanAction> {
        let identity = Self::validated(config, diags)?;

        let Some(prior) = prior else {
            return Some(PlanAction::Create);
        };

        let prior_identity = Self::tracked_identity(prior, diags)?;
        if prior_identity.requires_replacement(&identity) {
            return Some(PlanAction::Replace);
        }

        let manager = config
            .settings
            .field_manager
            .as_deref()
            .unwrap_or(self.context.field_manager.as_str());
        let owned = owned_fields(&prior.managed_fields, manager).unwrap_or_else(|| {
            field_set(&prior.to_config().desired().to_manifest(&prior_identity))
        });
        let removed = removed_fields(&owned, &config.desired().to_manifest(&identity));
        if !removed.is_empty() {
            debug!(%identity, ?removed, "fields dropped from the document");
            return Some(PlanAction::Update);
        }

        let labels_match = config
            .metadata
            .labels
            .iter()
            .all(|(k, v)| prior.metadata.labels.get(k) == Some(v));
        let annotations_match = config
            .metadata
            .annotations
            .iter()
            .all(|(k, v)| prior.metadata.annotations.get(k) == Some(v));
        let spec_matches = config.spec.is_null() || project(&prior.spec, &config.spec) == config.spec;

        if labels_match && annotations_match && spec_matches {
            Some(PlanAction::Noop)
        } else {
            Some(PlanAction::Update)
        }
    }

    /// Create the object and return the state to track
    pub async fn create(
        &self,
        config: &ResourceConfig,
        cancel: &CancellationToken,
        diags: &mut Diagnostics,
    ) -> Option<ResourceState> {
        let identity = Self::validated(config, diags)?;
        let engine = self.online("create", diags)?;

        match engine
            .apply(&identity, &config.desired(), &config.settings, cancel)
            .await
        {
            Ok(observed) => {
                info!(%identity, "created");
                Some(ResourceState::observed(&identity, &observed, &config.settings))
            }
            Err(e) => {
                diags.add_error(format!("Error creating {}", config.kind), &e);
                None
            }
        }
    }

    /// Apply changes to a tracked object, refusing identity changes
    pub async fn update(
        &self,
        prior: &ResourceState,
        config: &ResourceConfig,
        cancel: &CancellationToken,
        diags: &mut Diagnostics,
    ) -> Option<ResourceState> {
        let identity = Self::validated(config, diags)?;
        let prior_identity = Self::tracked_identity(prior, diags)?;

        if prior_identity.requires_replacement(&identity) {
            diags.push(Diagnostic::error(
                DiagnosticKind::Replacement,
                format!("Cannot update {}", config.kind),
                format!(
                    "{prior_identity} cannot become {identity} in place, delete and create it instead"
                ),
            ));
            return None;
        }

        let engine = self.online("update", diags)?;
        match engine
            .apply(&identity, &config.desired(), &config.settings, cancel)
            .await
        {
            Ok(observed) => {
                info!(%identity, "updated");
                Some(ResourceState::observed(&identity, &observed, &config.settings))
            }
            Err(e) => {
                diags.add_error(format!("Error updating {}", config.kind), &e);
                None
            }
        }
    }

    /// Refresh tracked state from the live object
    pub async fn read(&self, state: &ResourceState, diags: &mut Diagnostics) -> Option<ResourceState> {
        let identity = Self::tracked_identity(state, diags)?;
        let engine = self.online("read", diags)?;

        match engine.read(&identity).await {
            Ok(observed) => Some(ResourceState::observed(&identity, &observed, &state.settings)),
            Err(e) => {
                diags.add_error(format!("Error reading {}", state.kind), &e);
                None
            }
        }
    }

    /// Delete a tracked object, a timed-out wait is a timeout diagnostic
    pub async fn delete(
        &self,
        state: &ResourceState,
        cancel: &CancellationToken,
        diags: &mut Diagnostics,
    ) -> Option<DeleteOutcome> {
        let identity = Self::tracked_identity(state, diags)?;
        let engine = self.online("delete", diags)?;

        match engine.delete(&identity, &state.settings, cancel).await {
            Ok(outcome) if outcome.state == DeleteState::TimedOut => {
                diags.push(Diagnostic::error(
                    DiagnosticKind::Timeout,
                    format!("Timed out deleting {}", state.kind),
                    format!(
                        "{identity} was still present after {:?} ({} checks)",
                        outcome.elapsed, outcome.polls
                    ),
                ));
                Some(outcome)
            }
            Ok(outcome) => Some(outcome),
            Err(e) => {
                diags.add_error(format!("Error deleting {}", state.kind), &e);
                None
            }
        }
    }

    /// Seed state from an import id without contacting the cluster
    pub fn import_state(
        &self,
        kind: HiveKind,
        id: &str,
        diags: &mut Diagnostics,
    ) -> Option<ResourceState> {
        match ResourceIdentity::import(kind, id) {
            Ok(identity) => Some(ResourceState::imported(&identity)),
            Err(e) => {
                diags.add_error(format!("Error importing {kind}"), &KubeError::from(e));
                None
            }
        }
    }

    /// Look up an object by identity without tracking it
    pub async fn read_data_source(
        &self,
        identity: &ResourceIdentity,
        diags: &mut Diagnostics,
    ) -> Option<ObservedState> {
        let engine = self.online("read", diags)?;
        match engine.read(identity).await {
            Ok(observed) => Some(observed),
            Err(e) => {
                diags.add_error(format!("Error reading {}", identity.kind), &e);
                None
            }
        }
    }

    /// Raw live object, server-populated fields included
    pub async fn read_object(
        &self,
        identity: &ResourceIdentity,
        diags: &mut Diagnostics,
    ) -> Option<Value> {
        let engine = self.online("read", diags)?;
        match engine.read_raw(identity).await {
            Ok(object) => Some(object),
            Err(e) => {
                diags.add_error(format!("Error reading {}", identity.kind), &e);
                None
            }
        }
    }

    /// Render the manifest of a document, works offline
    pub fn render_manifest(&self, config: &ResourceConfig, diags: &mut Diagnostics) -> Option<String> {
        match manifest::render_config(config) {
            Ok(yaml) => Some(yaml),
            Err(e) => {
                diags.add_error(
                    format!("Error rendering {} manifest", config.kind),
                    &KubeError::from(e),
                );
                None
            }
        }
    }

    /// Compare a document with the live object
    pub async fn drift(
        &self,
        config: &ResourceConfig,
        diags: &mut Diagnostics,
    ) -> Option<ResourceChange> {
        let identity = Self::validated(config, diags)?;
        let engine = self.online("diff", diags)?;

        let live = match engine.read(&identity).await {
            Ok(observed) => Some(observed),
            Err(e) if e.is_not_found() => None,
            Err(e) => {
                diags.add_error(format!("Error reading {}", config.kind), &e);
                return None;
            }
        };

        match self
            .diff_engine
            .diff(&identity, &config.desired(), live.as_ref())
        {
            Ok(change) => Some(change),
            Err(e) => {
                diags.add_error(format!("Error diffing {}", config.kind), &e);
                None
            }
        }
    }

    pub fn diff_engine(&self) -> &DiffEngine {
        &self.diff_engine
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockObjectApi;
    use hiveform_core::{DEFAULT_FIELD_MANAGER, ManagedFields, ObjectMetadata};
    use serde_json::json;

    fn provider() -> Provider<MockObjectApi> {
        Provider::with_api(MockObjectApi::new(), ProviderContext::default())
    }

    fn config(name: &str, replicas: u32) -> ResourceConfig {
        ResourceConfig::new(
            HiveKind::MachinePool,
            ObjectMetadata::new(Some("ns1"), name),
            json!({"replicas": replicas}),
        )
    }

    #[test]
    fn test_plan_actions() {
        let provider = provider();
        let mut diags = Diagnostics::new();

        assert_eq!(
            provider.plan(None, &config("p", 1), &mut diags),
            Some(PlanAction::Create)
        );

        let mut prior = ResourceState::imported(&config("p", 1).identity().unwrap());
        prior.spec = json!({"replicas": 1, "platform": {"aws": {}}});
        prior
            .metadata
            .labels
            .insert("hive.openshift.io/managed".to_string(), "true".to_string());
        prior.managed_fields = vec![ManagedFields::applied(
            DEFAULT_FIELD_MANAGER,
            json!({"f:spec": {"f:replicas": {}}}),
        )];

        assert_eq!(
            provider.plan(Some(&prior), &config("p", 1), &mut diags),
            Some(PlanAction::Noop)
        );
        assert_eq!(
            provider.plan(Some(&prior), &config("p", 2), &mut diags),
            Some(PlanAction::Update)
        );
        assert_eq!(
            provider.plan(Some(&prior), &config("q", 1), &mut diags),
            Some(PlanAction::Replace)
        );
        assert!(diags.is_empty());
    }

    fn prior_with_team_label() -> ResourceState {
        let mut prior = ResourceState::imported(&config("p", 1).identity().unwrap());
        prior
            .metadata
            .labels
            .insert("team".to_string(), "a".to_string());
        prior.spec = json!({"replicas": 1, "labels": {"x": "y"}});
        prior
    }

    #[test]
    fn test_plan_dropped_fields_without_ownership() {
        let provider = provider();
        let mut diags = Diagnostics::new();
        let prior = prior_with_team_label();

        assert_eq!(
            provider.plan(Some(&prior), &config("p", 1), &mut diags),
            Some(PlanAction::Update)
        );

        let mut label_only = prior.clone();
        label_only.spec = json!({"replicas": 1});
        assert_eq!(
            provider.plan(Some(&label_only), &config("p", 1), &mut diags),
            Some(PlanAction::Update)
        );
        assert!(diags.is_empty());
    }

    #[test]
    fn test_plan_dropped_fields_follow_ownership() {
        let provider = provider();
        let mut diags = Diagnostics::new();
        let mut prior = prior_with_team_label();

        prior.managed_fields = vec![ManagedFields::applied(
            DEFAULT_FIELD_MANAGER,
            json!({
                "f:metadata": {"f:labels": {"f:team": {}}},
                "f:spec": {"f:replicas": {}, "f:labels": {"f:x": {}}}
            }),
        )];
        assert_eq!(
            provider.plan(Some(&prior), &config("p", 1), &mut diags),
            Some(PlanAction::Update)
        );

        // Owned by someone else, so not ours to remove
        prior.managed_fields = vec![
            ManagedFields::applied(DEFAULT_FIELD_MANAGER, json!({"f:spec": {"f:replicas": {}}})),
            ManagedFields::applied(
                "kubectl",
                json!({
                    "f:metadata": {"f:labels": {"f:team": {}}},
                    "f:spec": {"f:labels": {"f:x": {}}}
                }),
            ),
        ];
        assert_eq!(
            provider.plan(Some(&prior), &config("p", 1), &mut diags),
            Some(PlanAction::Noop)
        );

        // The document's own field manager decides whose fields count
        let mut as_kubectl = config("p", 1);
        as_kubectl.settings.field_manager = Some("kubectl".to_string());
        assert_eq!(
            provider.plan(Some(&prior), &as_kubectl, &mut diags),
            Some(PlanAction::Update)
        );
        assert!(diags.is_empty());
    }

    #[test]
    fn test_plan_invalid_config() {
        let mut diags = Diagnostics::new();
        let bad = ResourceConfig::new(
            HiveKind::MachinePool,
            ObjectMetadata::new(None, "p"),
            Value::Null,
        );
        assert_eq!(provider().plan(None, &bad, &mut diags), None);
        assert!(diags.has_error_kind(DiagnosticKind::Validation));
    }

    #[tokio::test]
    async fn test_update_refuses_identity_change() {
        let provider = provider();
        let mut diags = Diagnostics::new();
        let prior = ResourceState::imported(&config("p", 1).identity().unwrap());

        let result = provider
            .update(&prior, &config("q", 1), &CancellationToken::new(), &mut diags)
            .await;

        assert!(result.is_none());
        assert!(diags.has_error_kind(DiagnosticKind::Replacement));
        assert_eq!(provider.engine().unwrap().api().operation_counts().applies, 0);
    }

    #[tokio::test]
    async fn test_offline_rejects_cluster_operations() {
        let provider: Provider<MockObjectApi> = Provider::offline(ProviderContext::default());
        let mut diags = Diagnostics::new();

        assert!(
            provider
                .create(&config("p", 1), &CancellationToken::new(), &mut diags)
                .await
                .is_none()
        );
        assert!(diags.has_error_kind(DiagnosticKind::Validation));

        let mut diags = Diagnostics::new();
        let yaml = provider.render_manifest(&config("p", 1), &mut diags).unwrap();
        assert!(yaml.contains("kind: MachinePool"));
        assert!(diags.is_empty());
    }

    #[tokio::test]
    async fn test_drift_of_missing_object_is_create() {
        let provider = provider();
        let mut diags = Diagnostics::new();

        let change = provider.drift(&config("p", 1), &mut diags).await.unwrap();
        assert_eq!(change.change_type, crate::diff::ChangeType::Added);
        assert!(diags.is_empty());
    }
}
