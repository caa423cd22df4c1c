//! Object API seam between the lifecycle engine and the cluster
//!
//! The engine only ever needs three requests against a single object: GET,
//! server-side apply PATCH and DELETE. [`KubeObjectApi`] issues them through
//! `kube` with an `ApiResource` derived from the kind, so no discovery round
//! trip is needed. The in-memory [`MockObjectApi`](crate::MockObjectApi)
//! implements the same trait for tests.

use async_trait::async_trait;
use hiveform_core::{DeletionPropagation, HiveKind, ResourceIdentity};
use kube::api::{
    Api, ApiResource, DeleteParams, DynamicObject, GroupVersionKind, Patch, PatchParams,
    PropagationPolicy,
};
use serde_json::Value;
use tracing::debug;

use crate::error::{KubeError, Result};

/// Parameters of one server-side apply request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplyParams {
    pub field_manager: String,
    pub force: bool,
}

/// Requests the lifecycle engine issues against a single object
///
/// Implementations must be Send + Sync for use across async tasks.
#[async_trait]
pub trait ObjectApi: Send + Sync {
    /// Fetch the live object, `KubeError::NotFound` when it does not exist
    async fn get(&self, identity: &ResourceIdentity) -> Result<Value>;

    /// Server-side apply the manifest and return the patched object
    async fn apply(
        &self,
        identity: &ResourceIdentity,
        manifest: &Value,
        params: &ApplyParams,
    ) -> Result<Value>;

    /// Request deletion, `KubeError::NotFound` when it does not exist
    async fn delete(
        &self,
        identity: &ResourceIdentity,
        propagation: Option<DeletionPropagation>,
    ) -> Result<()>;

    /// Check if the object exists
    async fn exists(&self, identity: &ResourceIdentity) -> Result<bool> {
        match self.get(identity).await {
            Ok(_) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }
}

/// `ApiResource` for a kind, built from its compiled-in coordinates
pub fn api_resource(kind: HiveKind) -> ApiResource {
    let descriptor = kind.descriptor();
    let gvk = GroupVersionKind::gvk(descriptor.group, descriptor.version, descriptor.kind);
    ApiResource::from_gvk_with_plural(&gvk, descriptor.plural)
}

fn propagation_policy(policy: DeletionPropagation) -> PropagationPolicy {
    match policy {
        DeletionPropagation::Orphan => PropagationPolicy::Orphan,
        DeletionPropagation::Background => PropagationPolicy::Background,
        DeletionPropagation::Foreground => PropagationPolicy::Foreground,
    }
}

/// Object API backed by a live Kubernetes client
#[derive(Clone)]
pub struct KubeObjectApi {
    client: kube::Client,
}

impl KubeObjectApi {
    pub fn new(client: kube::Client) -> Self {
        Self { client }
    }

    /// Get the underlying Kubernetes client
    pub fn client(&self) -> &kube::Client {
        &self.client
    }

    fn api(&self, identity: &ResourceIdentity) -> Api<DynamicObject> {
        let resource = api_resource(identity.kind);
        match &identity.namespace {
            Some(ns) => Api::namespaced_with(self.client.clone(), ns, &resource),
            None => Api::all_with(self.client.clone(), &resource),
        }
    }
}

/// Map a raw 404 onto the identity that was asked for
fn map_not_found(identity: &ResourceIdentity, error: kube::Error) -> KubeError {
    match error {
        kube::Error::Api(resp) if resp.code == 404 => KubeError::NotFound {
            identity: identity.clone(),
        },
        other => KubeError::Api(other),
    }
}

#[async_trait]
impl ObjectApi for KubeObjectApi {
    async fn get(&self, identity: &ResourceIdentity) -> Result<Value> {
        debug!(path = %identity.api_path(), "GET");
        let object = self
            .api(identity)
            .get(&identity.name)
            .await
            .map_err(|e| map_not_found(identity, e))?;
        Ok(serde_json::to_value(object)?)
    }

    async fn apply(
        &self,
        identity: &ResourceIdentity,
        manifest: &Value,
        params: &ApplyParams,
    ) -> Result<Value> {
        debug!(
            path = %identity.api_path(),
            field_manager = %params.field_manager,
            force = params.force,
            "PATCH (server-side apply)"
        );

        let patch_params = PatchParams {
            field_manager: Some(params.field_manager.clone()),
            force: params.force,
            ..Default::default()
        };

        let object = self
            .api(identity)
            .patch(&identity.name, &patch_params, &Patch::Apply(manifest))
            .await?;
        Ok(serde_json::to_value(object)?)
    }

    async fn delete(
        &self,
        identity: &ResourceIdentity,
        propagation: Option<DeletionPropagation>,
    ) -> Result<()> {
        debug!(path = %identity.api_path(), ?propagation, "DELETE");

        let dp = DeleteParams {
            propagation_policy: propagation.map(propagation_policy),
            ..Default::default()
        };

        self.api(identity)
            .delete(&identity.name, &dp)
            .await
            .map_err(|e| map_not_found(identity, e))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_resource_from_kind() {
        let resource = api_resource(HiveKind::ClusterDeployment);
        assert_eq!(resource.group, "hive.openshift.io");
        assert_eq!(resource.version, "v1");
        assert_eq!(resource.api_version, "hive.openshift.io/v1");
        assert_eq!(resource.kind, "ClusterDeployment");
        assert_eq!(resource.plural, "clusterdeployments");
    }

    #[test]
    fn test_api_resource_internal_group() {
        let resource = api_resource(HiveKind::ClusterSync);
        assert_eq!(resource.api_version, "hiveinternal.openshift.io/v1alpha1");
        assert_eq!(resource.plural, "clustersyncs");
    }

    #[test]
    fn test_propagation_policy_mapping() {
        assert!(matches!(
            propagation_policy(DeletionPropagation::Foreground),
            PropagationPolicy::Foreground
        ));
        assert!(matches!(
            propagation_policy(DeletionPropagation::Orphan),
            PropagationPolicy::Orphan
        ));
    }
}
