//! Delete command - delete resources and wait for them to disappear

use hiveform_core::{DeletionPropagation, HiveKind, ResourceState, WaitForDelete};
use hiveform_kube::{Diagnostics, KubeError};
use std::path::PathBuf;
use std::time::Duration;

use super::{Session, finish, heading, load_documents};
use crate::display;
use crate::error::{CliError, Result};

/// Command-line overrides of the per-resource delete settings
#[derive(Debug, Default, Clone)]
pub struct DeleteOptions {
    pub timeout: Option<u64>,
    pub poll_interval: Option<u64>,
    pub propagation: Option<DeletionPropagation>,
    pub no_wait: bool,
}

impl DeleteOptions {
    fn apply_to(&self, state: &mut ResourceState) {
        if let Some(propagation) = self.propagation {
            state.settings.deletion_propagation = Some(propagation);
        }

        if self.no_wait {
            state.settings.wait_for_delete = Some(WaitForDelete::no_wait());
            return;
        }

        if self.timeout.is_some() || self.poll_interval.is_some() {
            let mut wait = state.settings.delete_wait();
            if let Some(secs) = self.timeout {
                wait.timeout = Duration::from_secs(secs);
            }
            if let Some(secs) = self.poll_interval {
                wait.poll_interval = Duration::from_secs(secs);
            }
            state.settings.wait_for_delete = Some(wait);
        }
    }
}

/// Run the delete command
///
/// Targets are either every document in `files` or a single `kind`/`id` pair.
pub async fn run(
    session: &Session,
    files: &[PathBuf],
    target: Option<(HiveKind, String)>,
    options: &DeleteOptions,
) -> Result<()> {
    let mut states = Vec::new();
    let mut all = Diagnostics::new();

    if let Some((kind, id)) = target {
        let mut diags = Diagnostics::new();
        match session.offline_provider().import_state(kind, &id, &mut diags) {
            Some(state) => states.push(state),
            None => {
                display::display_diagnostics(&format!("{kind}/{id}"), &diags);
                return finish(diags);
            }
        }
    } else {
        for config in load_documents(files)? {
            match config.validate() {
                Ok(identity) => {
                    let mut state = ResourceState::imported(&identity);
                    state.settings = config.settings.clone();
                    states.push(state);
                }
                Err(e) => all.add_error(
                    format!("Invalid {} configuration", config.kind),
                    &KubeError::from(e),
                ),
            }
        }
    }

    if all.has_errors() {
        display::display_diagnostics("documents", &all);
        return finish(all);
    }
    if states.is_empty() {
        return Err(CliError::validation("nothing to delete"));
    }

    let provider = session.provider().await?;

    // Documents are deleted in reverse so dependents go before what they reference
    for mut state in states.into_iter().rev() {
        options.apply_to(&mut state);
        let name = heading(&state.to_config());

        let spinner = display::wait_spinner(format!("deleting {name}"));
        let mut diags = Diagnostics::new();
        let outcome = provider.delete(&state, &session.cancel, &mut diags).await;
        spinner.finish_and_clear();

        if let Some(outcome) = outcome {
            println!("{}", display::format_delete_outcome(&name, &outcome));
        }
        display::display_diagnostics(&name, &diags);
        all.extend(diags);

        if session.cancel.is_cancelled() {
            break;
        }
    }

    finish(all)
}
