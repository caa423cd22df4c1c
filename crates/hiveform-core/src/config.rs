//! Provider configuration
//!
//! Stored in `~/.config/hiveform/provider.yaml`. Every field is optional in
//! the file; command line flags override what the file says.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{CoreError, Result};

/// Field manager used for server-side apply unless a resource overrides it
pub const DEFAULT_FIELD_MANAGER: &str = "hiveform";

/// Provider-wide configuration, shared read-only by every operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Kubeconfig file; the usual discovery rules apply when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kubeconfig: Option<PathBuf>,

    /// Kubeconfig context to use instead of the current one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,

    #[serde(default = "default_field_manager")]
    pub field_manager: String,

    #[serde(default)]
    pub force_conflicts: bool,

    /// Only offline operations (manifest rendering, import parsing) are allowed
    #[serde(default)]
    pub offline: bool,
}

fn default_field_manager() -> String {
    DEFAULT_FIELD_MANAGER.to_string()
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            kubeconfig: None,
            context: None,
            field_manager: default_field_manager(),
            force_conflicts: false,
            offline: false,
        }
    }
}

impl ProviderConfig {
    /// Load configuration from the default location, or defaults if absent
    pub fn load() -> Result<Self> {
        match Self::default_path() {
            Ok(path) if path.exists() => Self::load_from(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to a specific path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_yaml::to_string(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get default configuration path
    pub fn default_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir().ok_or_else(|| CoreError::InvalidConfig {
            message: "Could not determine config directory".to_string(),
        })?;
        Ok(config_dir.join("hiveform").join("provider.yaml"))
    }

    pub fn validate(&self) -> Result<()> {
        if self.field_manager.trim().is_empty() {
            return Err(CoreError::InvalidConfig {
                message: "field_manager must be at least 1 character long".to_string(),
            });
        }
        if self.offline && (self.kubeconfig.is_some() || self.context.is_some()) {
            return Err(CoreError::InvalidConfig {
                message: "kubeconfig and context cannot be combined with offline mode"
                    .to_string(),
            });
        }
        Ok(())
    }
}
