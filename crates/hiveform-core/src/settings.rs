//! Per-resource lifecycle settings
//!
//! These are the knobs a resource document may set next to its metadata and
//! spec: conflict handling, field manager, deletion propagation and the
//! optional wait conditions after apply and delete.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{CoreError, Result};
use crate::jsonpath::JsonPath;

/// Deletion propagation policy sent with DELETE
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum DeletionPropagation {
    Orphan,
    Background,
    Foreground,
}

impl DeletionPropagation {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Orphan => "Orphan",
            Self::Background => "Background",
            Self::Foreground => "Foreground",
        }
    }
}

impl fmt::Display for DeletionPropagation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeletionPropagation {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "orphan" => Ok(Self::Orphan),
            "background" => Ok(Self::Background),
            "foreground" => Ok(Self::Foreground),
            _ => Err(CoreError::setting(
                "deletion_propagation",
                format!("'{s}' is not one of Orphan, Background, Foreground"),
            )),
        }
    }
}

impl TryFrom<String> for DeletionPropagation {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<DeletionPropagation> for String {
    fn from(policy: DeletionPropagation) -> Self {
        policy.as_str().to_string()
    }
}

/// Condition polled after an apply until it holds or times out
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaitForUpsert {
    pub jsonpath: String,

    /// Expected value; when unset the path only has to be present
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,

    #[serde(default = "default_upsert_timeout", with = "humantime_serde")]
    pub timeout: Duration,

    #[serde(default = "default_poll_interval", with = "humantime_serde")]
    pub poll_interval: Duration,
}

impl WaitForUpsert {
    pub fn new(jsonpath: impl Into<String>) -> Self {
        Self {
            jsonpath: jsonpath.into(),
            value: None,
            timeout: default_upsert_timeout(),
            poll_interval: default_poll_interval(),
        }
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    pub fn with_timing(mut self, timeout: Duration, poll_interval: Duration) -> Self {
        self.timeout = timeout;
        self.poll_interval = poll_interval;
        self
    }

    /// Parse the path expression
    pub fn path(&self) -> Result<JsonPath> {
        JsonPath::parse(&self.jsonpath)
    }

    fn validate(&self) -> Result<()> {
        self.path()?;
        validate_timing("wait_for_upsert", self.timeout, self.poll_interval)
    }
}

/// Bounded wait for the object to disappear after DELETE
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaitForDelete {
    #[serde(default = "default_delete_timeout", with = "humantime_serde")]
    pub timeout: Duration,

    #[serde(default = "default_poll_interval", with = "humantime_serde")]
    pub poll_interval: Duration,
}

impl WaitForDelete {
    pub fn new(timeout: Duration, poll_interval: Duration) -> Self {
        Self {
            timeout,
            poll_interval,
        }
    }

    /// Zero timeout: check once, never block
    pub fn no_wait() -> Self {
        Self::new(Duration::ZERO, default_poll_interval())
    }
}

impl Default for WaitForDelete {
    fn default() -> Self {
        Self::new(default_delete_timeout(), default_poll_interval())
    }
}

fn default_upsert_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_delete_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_poll_interval() -> Duration {
    Duration::from_secs(5)
}

fn validate_timing(field: &str, timeout: Duration, poll_interval: Duration) -> Result<()> {
    if !timeout.is_zero() && poll_interval.is_zero() {
        return Err(CoreError::setting(
            field,
            "poll_interval must be greater than zero when a timeout is set",
        ));
    }
    Ok(())
}

/// Lifecycle settings of one resource
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceSettings {
    /// Overrides the provider-wide force-conflicts default
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub force_conflicts: Option<bool>,

    /// Overrides the provider-wide field manager
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field_manager: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deletion_propagation: Option<DeletionPropagation>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub wait_for_upsert: Vec<WaitForUpsert>,

    /// Defaults to a 30s timeout polled every 5s when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wait_for_delete: Option<WaitForDelete>,
}

impl ResourceSettings {
    /// Check everything that can be checked without talking to the cluster
    pub fn validate(&self) -> Result<()> {
        if let Some(manager) = &self.field_manager {
            if manager.trim().is_empty() {
                return Err(CoreError::setting(
                    "field_manager",
                    "must be at least 1 character long",
                ));
            }
        }

        for wait in &self.wait_for_upsert {
            wait.validate()?;
        }

        if let Some(wait) = &self.wait_for_delete {
            validate_timing("wait_for_delete", wait.timeout, wait.poll_interval)?;
        }

        Ok(())
    }

    /// Effective delete wait, with defaults applied
    pub fn delete_wait(&self) -> WaitForDelete {
        self.wait_for_delete.unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_propagation_case_insensitive() {
        assert_eq!(
            "foreground".parse::<DeletionPropagation>().unwrap(),
            DeletionPropagation::Foreground
        );
        assert_eq!(
            "ORPHAN".parse::<DeletionPropagation>().unwrap(),
            DeletionPropagation::Orphan
        );
        assert_eq!(
            "Background".parse::<DeletionPropagation>().unwrap(),
            DeletionPropagation::Background
        );
        assert!("cascade".parse::<DeletionPropagation>().is_err());
    }

    #[test]
    fn test_wait_for_delete_defaults() {
        let wait = WaitForDelete::default();
        assert_eq!(wait.timeout, Duration::from_secs(30));
        assert_eq!(wait.poll_interval, Duration::from_secs(5));

        let settings = ResourceSettings::default();
        assert_eq!(settings.delete_wait(), wait);
    }

    #[test]
    fn test_deserialize_settings() {
        let yaml = r#"
force_conflicts: true
field_manager: tf
deletion_propagation: foreground
wait_for_upsert:
  - jsonpath: .status.installed
    value: "true"
    timeout: 10m
    poll_interval: 10s
wait_for_delete:
  timeout: 0s
"#;
        let settings: ResourceSettings = serde_yaml::from_str(yaml).unwrap();

        assert_eq!(settings.force_conflicts, Some(true));
        assert_eq!(settings.field_manager.as_deref(), Some("tf"));
        assert_eq!(
            settings.deletion_propagation,
            Some(DeletionPropagation::Foreground)
        );
        assert_eq!(settings.wait_for_upsert.len(), 1);
        assert_eq!(settings.wait_for_upsert[0].timeout, Duration::from_secs(600));
        assert_eq!(settings.wait_for_upsert[0].value.as_deref(), Some("true"));

        let delete = settings.delete_wait();
        assert!(delete.timeout.is_zero());
        assert_eq!(delete.poll_interval, Duration::from_secs(5));
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_validate_empty_field_manager() {
        let settings = ResourceSettings {
            field_manager: Some(String::new()),
            ..Default::default()
        };
        let err = settings.validate().unwrap_err();
        assert!(err.to_string().contains("field_manager"));
    }

    #[test]
    fn test_validate_bad_jsonpath() {
        let settings = ResourceSettings {
            wait_for_upsert: vec![WaitForUpsert::new(".status[")],
            ..Default::default()
        };
        assert!(matches!(
            settings.validate(),
            Err(CoreError::InvalidJsonPath { .. })
        ));
    }

    #[test]
    fn test_validate_zero_poll_interval() {
        let settings = ResourceSettings {
            wait_for_delete: Some(WaitForDelete::new(Duration::from_secs(5), Duration::ZERO)),
            ..Default::default()
        };
        assert!(settings.validate().is_err());

        let no_wait = ResourceSettings {
            wait_for_delete: Some(WaitForDelete::new(Duration::ZERO, Duration::ZERO)),
            ..Default::default()
        };
        assert!(no_wait.validate().is_ok());
    }
}
