//! Error types for hiveform-kube

use std::time::Duration;

use hiveform_core::ResourceIdentity;
use thiserror::Error;

/// Result type for hiveform-kube operations
pub type Result<T> = std::result::Result<T, KubeError>;

/// Errors that can occur during lifecycle operations
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum KubeError {
    /// Kubernetes API or transport error, message kept verbatim
    #[error("Kubernetes API error: {0}")]
    Api(#[from] kube::Error),

    /// The object does not exist
    #[error("{identity} not found")]
    NotFound { identity: ResourceIdentity },

    /// Input rejected before any request was made
    #[error("validation failed: {0}")]
    Validation(#[from] hiveform_core::CoreError),

    /// The provider is configured for offline use only
    #[error("provider is in offline mode, {operation} needs a cluster connection")]
    Offline { operation: String },

    /// A wait condition did not hold within its budget
    #[error("timed out after {elapsed:?} waiting for {identity} {waiting_for}")]
    Timeout {
        identity: ResourceIdentity,
        waiting_for: String,
        elapsed: Duration,
    },

    /// The caller cancelled the operation
    #[error("operation on {identity} was cancelled")]
    Cancelled { identity: ResourceIdentity },

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Invalid client configuration
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl From<serde_json::Error> for KubeError {
    fn from(e: serde_json::Error) -> Self {
        KubeError::Serialization(e.to_string())
    }
}

impl From<serde_yaml::Error> for KubeError {
    fn from(e: serde_yaml::Error) -> Self {
        KubeError::Serialization(e.to_string())
    }
}

impl KubeError {
    /// Check if this is a missing object, either mapped or a raw 404
    pub fn is_not_found(&self) -> bool {
        match self {
            KubeError::NotFound { .. } => true,
            KubeError::Api(kube::Error::Api(resp)) => resp.code == 404,
            _ => false,
        }
    }

    /// Check if this is a conflict error (409)
    pub fn is_conflict(&self) -> bool {
        matches!(self, KubeError::Api(kube::Error::Api(resp)) if resp.code == 409)
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, KubeError::Timeout { .. })
    }

    /// Check if this was rejected before reaching the cluster
    pub fn is_validation(&self) -> bool {
        matches!(self, KubeError::Validation(_) | KubeError::Offline { .. })
    }
}
