//! Core error types

use thiserror::Error;

#[derive(Error, Debug)]
#[non_exhaustive]
pub enum CoreError {
    #[error("unknown Hive kind '{name}'")]
    UnknownKind { name: String },

    #[error("invalid import identifier '{id}': {reason}")]
    InvalidImportId { id: String, reason: String },

    #[error("invalid identity for {kind}: {message}")]
    InvalidIdentity { kind: String, message: String },

    #[error("invalid setting '{field}': {message}")]
    InvalidSetting { field: String, message: String },

    #[error("invalid JSONPath '{expression}': {message}")]
    InvalidJsonPath { expression: String, message: String },

    #[error("invalid provider configuration: {message}")]
    InvalidConfig { message: String },

    #[error("invalid object: {message}")]
    InvalidObject { message: String },

    #[error("failed to parse document {index}: {message}")]
    InvalidDocument { index: usize, message: String },

    #[error("Failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CoreError {
    pub(crate) fn setting(field: &str, message: impl Into<String>) -> Self {
        Self::InvalidSetting {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;
