//! CLI commands

pub mod apply;
pub mod delete;
pub mod diff;
pub mod get;
pub mod import;
pub mod kinds;
pub mod manifest;

use clap::ValueEnum;
use hiveform_core::{ProviderConfig, ResourceConfig, parse_documents};
use hiveform_kube::{Diagnostics, KubeObjectApi, Provider, ProviderContext};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;

use crate::display;
use crate::error::{CliError, Result};

/// Output format for commands printing objects
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Yaml,
    Json,
}

impl OutputFormat {
    pub fn render<T: Serialize>(self, value: &T) -> Result<String> {
        match self {
            OutputFormat::Yaml => Ok(serde_yaml::to_string(value)?),
            OutputFormat::Json => Ok(serde_json::to_string_pretty(value)? + "\n"),
        }
    }
}

/// What every command shares: resolved configuration and the Ctrl-C token
pub struct Session {
    pub config: ProviderConfig,
    pub cancel: CancellationToken,
}

impl Session {
    pub fn new(config: ProviderConfig, cancel: CancellationToken) -> Self {
        Self { config, cancel }
    }

    /// Provider that never contacts the cluster
    pub fn offline_provider(&self) -> Provider<KubeObjectApi> {
        Provider::offline(ProviderContext::from_config(&self.config))
    }

    /// Connected provider, or the offline one when configured offline
    pub async fn provider(&self) -> Result<Provider<KubeObjectApi>> {
        let mut diags = Diagnostics::new();
        match Provider::configure(&self.config, &mut diags).await {
            Some(provider) => Ok(provider),
            None => {
                display::display_diagnostics("provider", &diags);
                Err(CliError::Config {
                    message: diags
                        .errors()
                        .map(|d| d.detail.clone())
                        .collect::<Vec<_>>()
                        .join("; "),
                })
            }
        }
    }
}

/// Load every resource document from the given files
pub fn load_documents(files: &[PathBuf]) -> Result<Vec<ResourceConfig>> {
    let mut resources = Vec::new();
    for file in files {
        resources.extend(load_file(file)?);
    }

    if resources.is_empty() {
        return Err(CliError::validation_with_help(
            "no resource documents found",
            "each document needs at least `kind` and `metadata.name`",
        ));
    }
    Ok(resources)
}

fn load_file(path: &Path) -> Result<Vec<ResourceConfig>> {
    let content = std::fs::read_to_string(path).map_err(|e| CliError::io(path, e))?;
    parse_documents(&content).map_err(|e| {
        CliError::validation_with_help(
            format!("{}: {}", path.display(), e),
            "documents are separated by `---`, see `hiveform kinds` for valid kinds",
        )
    })
}

/// Heading used when printing diagnostics for one document
pub fn heading(config: &ResourceConfig) -> String {
    match &config.metadata.namespace {
        Some(ns) => format!("{}/{}/{}", config.kind, ns, config.metadata.name),
        None => format!("{}/{}", config.kind, config.metadata.name),
    }
}

/// Fail when any collected diagnostic is an error
pub fn finish(all: Diagnostics) -> Result<()> {
    if all.has_errors() {
        return Err(CliError::from_diagnostics(&all));
    }
    Ok(())
}
