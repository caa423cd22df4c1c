//! Resource lifecycle engine
//!
//! One engine serves every Hive kind: apply through server-side apply, read
//! through GET and delete with a bounded wait. The provider context carrying
//! the defaults is built once and passed in explicitly.

use hiveform_core::{
    DEFAULT_FIELD_MANAGER, DesiredState, ObservedState, ProviderConfig, ResourceIdentity,
    ResourceSettings, WaitForUpsert,
};
use serde_json::Value;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument};

use crate::api::{ApplyParams, ObjectApi};
use crate::error::Result;
use crate::wait::{self, DeleteOutcome, DeleteState};

/// Provider-wide defaults shared read-only by every operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderContext {
    pub field_manager: String,
    pub force_conflicts: bool,
}

impl ProviderContext {
    pub fn new(field_manager: impl Into<String>, force_conflicts: bool) -> Self {
        Self {
            field_manager: field_manager.into(),
            force_conflicts,
        }
    }

    pub fn from_config(config: &ProviderConfig) -> Self {
        Self::new(config.field_manager.clone(), config.force_conflicts)
    }
}

impl Default for ProviderContext {
    fn default() -> Self {
        Self::new(DEFAULT_FIELD_MANAGER, false)
    }
}

/// Generic apply/read/delete engine over an object API
pub struct LifecycleEngine<A: ObjectApi> {
    api: A,
    context: ProviderContext,
}

impl<A: ObjectApi> LifecycleEngine<A> {
    pub fn new(api: A, context: ProviderContext) -> Self {
        Self { api, context }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn context(&self) -> &ProviderContext {
        &self.context
    }

    /// Effective apply parameters, resource settings win over provider defaults
    pub fn apply_params(&self, settings: &ResourceSettings) -> ApplyParams {
        ApplyParams {
            field_manager: settings
                .field_manager
                .clone()
                .unwrap_or_else(|| self.context.field_manager.clone()),
            force: settings
                .force_conflicts
                .unwrap_or(self.context.force_conflicts),
        }
    }

    /// Create or update the object, then wait for its upsert conditions
    ///
    /// Settings are validated before anything is sent. The returned state is
    /// the object as the server reports it after the last wait, so fields
    /// defaulted by the server reach the caller.
    #[instrument(skip_all, fields(identity = %identity))]
    pub async fn apply(
        &self,
        identity: &ResourceIdentity,
        desired: &DesiredState,
        settings: &ResourceSettings,
        cancel: &CancellationToken,
    ) -> Result<ObservedState> {
        settings.validate()?;

        let params = self.apply_params(settings);
        let manifest = desired.to_manifest(identity);
        let mut object = self.api.apply(identity, &manifest, &params).await?;
        info!(
            field_manager = %params.field_manager,
            force = params.force,
            "applied"
        );

        if let Some(latest) = self
            .wait_for_upsert(identity, &settings.wait_for_upsert, cancel)
            .await?
        {
            object = latest;
        }

        Ok(ObservedState::from_object(&object)?)
    }

    /// Read the live object
    #[instrument(skip_all, fields(identity = %identity))]
    pub async fn read(&self, identity: &ResourceIdentity) -> Result<ObservedState> {
        let object = self.api.get(identity).await?;
        Ok(ObservedState::from_object(&object)?)
    }

    /// Read the live object as raw JSON, server fields included
    pub async fn read_raw(&self, identity: &ResourceIdentity) -> Result<Value> {
        self.api.get(identity).await
    }

    /// Delete the object and wait for it to disappear
    ///
    /// An object that is already gone counts as confirmed absent without any
    /// wait. A timed-out wait is reported through the outcome, not as an error.
    #[instrument(skip_all, fields(identity = %identity))]
    pub async fn delete(
        &self,
        identity: &ResourceIdentity,
        settings: &ResourceSettings,
        cancel: &CancellationToken,
    ) -> Result<DeleteOutcome> {
        settings.validate()?;

        let started = Instant::now();
        match self
            .api
            .delete(identity, settings.deletion_propagation)
            .await
        {
            Ok(()) => {}
            Err(e) if e.is_not_found() => {
                info!("already absent");
                return Ok(DeleteOutcome {
                    state: DeleteState::ConfirmedAbsent,
                    polls: 0,
                    elapsed: started.elapsed(),
                });
            }
            Err(e) => return Err(e),
        }
        info!(propagation = ?settings.deletion_propagation, "delete requested");

        wait::wait_for_absence(&self.api, identity, &settings.delete_wait(), started, cancel).await
    }

    /// Poll each condition in order, returning the last object read
    pub async fn wait_for_upsert(
        &self,
        identity: &ResourceIdentity,
        conditions: &[WaitForUpsert],
        cancel: &CancellationToken,
    ) -> Result<Option<Value>> {
        let mut latest = None;
        for condition in conditions {
            if let Some(object) =
                wait::wait_for_condition(&self.api, identity, condition, cancel).await?
            {
                latest = Some(object);
            }
        }
        Ok(latest)
    }
}
