//! CLI error types with exit code handling
//!
//! Provider operations report through diagnostics. Once those are printed
//! the command fails with one of these errors, which carries the exit code.

use hiveform_kube::{DiagnosticKind, Diagnostics};
use miette::Diagnostic;
use std::path::Path;
use thiserror::Error;

use crate::exit_codes;

/// CLI-specific error type that includes exit code information
#[derive(Error, Debug, Diagnostic, Clone)]
pub enum CliError {
    /// Bad input caught before contacting the cluster
    #[error("Validation failed: {message}")]
    #[diagnostic(code(hiveform::cli::validation))]
    Validation {
        message: String,
        #[help]
        help: Option<String>,
    },

    /// Provider configuration could not be loaded
    #[error("Configuration error: {message}")]
    #[diagnostic(
        code(hiveform::cli::config),
        help("check --config, --kubeconfig and --context")
    )]
    Config { message: String },

    #[error("{count} resource(s) not found")]
    #[diagnostic(code(hiveform::cli::not_found))]
    NotFound { count: usize },

    #[error("Timed out waiting on {count} resource(s)")]
    #[diagnostic(
        code(hiveform::cli::timeout),
        help("raise wait_for_delete.timeout or wait_for_upsert.timeout")
    )]
    Timeout { count: usize },

    #[error("Field manager conflict on {count} resource(s)")]
    #[diagnostic(
        code(hiveform::cli::conflict),
        help("set force_conflicts: true or pass --force-conflicts to take ownership")
    )]
    Conflict { count: usize },

    #[error("Operation cancelled")]
    #[diagnostic(code(hiveform::cli::cancelled))]
    Cancelled,

    /// Provider operations failed, details already printed
    #[error("{count} operation(s) failed")]
    #[diagnostic(code(hiveform::cli::failed))]
    Failed { count: usize },

    /// IO error (file not found, permissions, etc.)
    #[error("IO error: {message}")]
    #[diagnostic(code(hiveform::cli::io))]
    Io { message: String },

    /// Internal error (serialization, unexpected failure)
    #[error("Internal error: {message}")]
    #[diagnostic(code(hiveform::cli::internal))]
    Internal { message: String },
}

impl CliError {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Validation { .. } | CliError::Config { .. } => exit_codes::VALIDATION_ERROR,
            CliError::NotFound { .. } => exit_codes::NOT_FOUND,
            CliError::Timeout { .. } => exit_codes::TIMEOUT,
            CliError::Conflict { .. } => exit_codes::CONFLICT,
            CliError::Cancelled => exit_codes::CANCELLED,
            CliError::Io { .. } => exit_codes::IO_ERROR,
            CliError::Failed { .. } | CliError::Internal { .. } => exit_codes::ERROR,
        }
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            help: None,
        }
    }

    /// Create a validation error with help text
    pub fn validation_with_help(message: impl Into<String>, help: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            help: Some(help.into()),
        }
    }

    /// Create an IO error naming the file involved
    pub fn io(path: &Path, err: std::io::Error) -> Self {
        Self::Io {
            message: format!("{}: {}", path.display(), err),
        }
    }

    /// Summarize the errors in a diagnostics collection
    ///
    /// The most specific kind wins so the exit code says what went wrong.
    pub fn from_diagnostics(diags: &Diagnostics) -> Self {
        let count = |kind: DiagnosticKind| diags.errors().filter(|d| d.kind == kind).count();
        let total = diags.errors().count();

        if count(DiagnosticKind::Cancelled) > 0 {
            return CliError::Cancelled;
        }
        if count(DiagnosticKind::Validation) == total {
            let message = diags
                .errors()
                .map(|d| d.detail.clone())
                .collect::<Vec<_>>()
                .join("; ");
            return CliError::validation(message);
        }

        match (
            count(DiagnosticKind::NotFound),
            count(DiagnosticKind::Timeout),
            count(DiagnosticKind::Conflict),
        ) {
            (n, 0, 0) if n == total => CliError::NotFound { count: n },
            (0, n, 0) if n == total => CliError::Timeout { count: n },
            (0, 0, n) if n == total => CliError::Conflict { count: n },
            _ => CliError::Failed { count: total },
        }
    }
}

impl From<serde_json::Error> for CliError {
    fn from(err: serde_json::Error) -> Self {
        CliError::internal(err.to_string())
    }
}

impl From<serde_yaml::Error> for CliError {
    fn from(err: serde_yaml::Error) -> Self {
        CliError::internal(err.to_string())
    }
}

impl From<hiveform_core::CoreError> for CliError {
    fn from(err: hiveform_core::CoreError) -> Self {
        CliError::validation(err.to_string())
    }
}

/// Result type for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;
