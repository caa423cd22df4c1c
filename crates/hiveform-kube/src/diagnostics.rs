//! Diagnostics collected by provider operations
//!
//! Provider operations never return early errors. Every problem is appended
//! to a [`Diagnostics`] collection and the caller checks
//! [`Diagnostics::has_errors`] to decide whether to halt.

use serde::Serialize;
use std::fmt;

use crate::error::KubeError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

/// What went wrong, independent of the message text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// Transport or API server failure
    Api,
    /// Rejected by server-side apply field ownership
    Conflict,
    NotFound,
    /// Caught before any request was made
    Validation,
    Timeout,
    Cancelled,
    /// Identity change that needs delete and create
    Replacement,
}

impl From<&KubeError> for DiagnosticKind {
    fn from(error: &KubeError) -> Self {
        match error {
            e if e.is_not_found() => Self::NotFound,
            e if e.is_conflict() => Self::Conflict,
            KubeError::Validation(_) | KubeError::Offline { .. } | KubeError::InvalidConfig(_) => {
                Self::Validation
            }
            KubeError::Timeout { .. } => Self::Timeout,
            KubeError::Cancelled { .. } => Self::Cancelled,
            _ => Self::Api,
        }
    }
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Api => "api",
            Self::Conflict => "conflict",
            Self::NotFound => "not found",
            Self::Validation => "validation",
            Self::Timeout => "timeout",
            Self::Cancelled => "cancelled",
            Self::Replacement => "replacement",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub kind: DiagnosticKind,
    pub summary: String,
    pub detail: String,
}

impl Diagnostic {
    pub fn error(kind: DiagnosticKind, summary: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            kind,
            summary: summary.into(),
            detail: detail.into(),
        }
    }

    pub fn warning(
        kind: DiagnosticKind,
        summary: impl Into<String>,
        detail: impl Into<String>,
    ) -> Self {
        Self {
            severity: Severity::Warning,
            kind,
            summary: summary.into(),
            detail: detail.into(),
        }
    }

    /// Error diagnostic carrying the error text verbatim as detail
    pub fn from_error(summary: impl Into<String>, error: &KubeError) -> Self {
        Self::error(DiagnosticKind::from(error), summary, error.to_string())
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.summary, self.detail)
    }
}

/// Ordered collection of diagnostics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Diagnostics {
    items: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.items.push(diagnostic);
    }

    pub fn add_error(&mut self, summary: impl Into<String>, error: &KubeError) {
        self.push(Diagnostic::from_error(summary, error));
    }

    pub fn add_warning(
        &mut self,
        kind: DiagnosticKind,
        summary: impl Into<String>,
        detail: impl Into<String>,
    ) {
        self.push(Diagnostic::warning(kind, summary, detail));
    }

    pub fn extend(&mut self, other: Diagnostics) {
        self.items.extend(other.items);
    }

    pub fn has_errors(&self) -> bool {
        self.items.iter().any(Diagnostic::is_error)
    }

    /// Check if any error is of the given kind
    pub fn has_error_kind(&self, kind: DiagnosticKind) -> bool {
        self.errors().any(|d| d.kind == kind)
    }

    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.items.iter().filter(|d| d.is_error())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl<'a> IntoIterator for &'a Diagnostics {
    type Item = &'a Diagnostic;
    type IntoIter = std::slice::Iter<'a, Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}
