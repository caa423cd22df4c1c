//! Manifest command - render documents without contacting the cluster

use hiveform_kube::Diagnostics;
use std::path::{Path, PathBuf};

use super::{Session, finish, heading, load_documents};
use crate::display;
use crate::error::{CliError, Result};

/// Run the manifest command, writing to `output` or stdout
pub fn run(session: &Session, files: &[PathBuf], output: Option<&Path>) -> Result<()> {
    let configs = load_documents(files)?;
    let provider = session.offline_provider();

    let mut rendered = Vec::new();
    let mut all = Diagnostics::new();
    for config in &configs {
        let mut diags = Diagnostics::new();
        if let Some(yaml) = provider.render_manifest(config, &mut diags) {
            rendered.push(yaml);
        }
        display::display_diagnostics(&heading(config), &diags);
        all.extend(diags);
    }
    finish(all)?;

    let content = rendered.join("---\n");
    match output {
        Some(path) => std::fs::write(path, content).map_err(|e| CliError::io(path, e)),
        None => {
            print!("{content}");
            Ok(())
        }
    }
}
