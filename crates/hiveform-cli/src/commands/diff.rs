//! Diff command - compare documents with live objects

use hiveform_kube::{ChangeType, Diagnostics, DiffResult};
use std::path::PathBuf;

use super::{Session, finish, heading, load_documents};
use crate::display;
use crate::error::{CliError, Result};

/// Run the diff command
///
/// With `exit_code`, drift makes the command exit with status 1.
pub async fn run(session: &Session, files: &[PathBuf], exit_code: bool) -> Result<()> {
    let configs = load_documents(files)?;
    let provider = session.provider().await?;

    let mut result = DiffResult::default();
    let mut all = Diagnostics::new();

    for config in &configs {
        let mut diags = Diagnostics::new();
        if let Some(change) = provider.drift(config, &mut diags).await {
            display::display_change(&change);
            result.changes.push(change);
        }
        display::display_diagnostics(&heading(config), &diags);
        all.extend(diags);
    }

    println!("\n{}", provider.diff_engine().summary(&result));
    finish(all)?;

    if exit_code && result.has_changes() {
        let drifted = result.changes.len() - result.changes_by_type(ChangeType::Unchanged).len();
        return Err(CliError::Failed { count: drifted });
    }
    Ok(())
}
