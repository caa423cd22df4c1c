//! Apply command - create or update resources from documents

use console::style;
use hiveform_core::{ResourceConfig, ResourceState};
use hiveform_kube::{
    DiagnosticKind, Diagnostics, KubeError, KubeObjectApi, PlanAction, Provider,
};
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;

use super::{Session, finish, heading, load_documents};
use crate::display;
use crate::error::Result;

/// Run the apply command
pub async fn run(session: &Session, files: &[PathBuf]) -> Result<()> {
    let configs = load_documents(files)?;
    let provider = session.provider().await?;

    let mut all = Diagnostics::new();
    let mut applied = 0;
    let mut unchanged = 0;

    for config in &configs {
        let mut diags = Diagnostics::new();
        let name = heading(config);

        if let Some(action) = apply_one(&provider, config, &session.cancel, &mut diags).await {
            let verb = match action {
                PlanAction::Create => style("created").green(),
                PlanAction::Update | PlanAction::Replace => style("updated").yellow(),
                PlanAction::Noop => style("unchanged").dim(),
            };
            println!("{} {} {}", style("✓").green().bold(), style(&name).cyan(), verb);

            if action == PlanAction::Noop {
                unchanged += 1;
            } else {
                applied += 1;
            }
        }

        display::display_diagnostics(&name, &diags);
        all.extend(diags);

        if session.cancel.is_cancelled() {
            break;
        }
    }

    println!(
        "\n{} applied, {} unchanged",
        display::pluralize(applied, "resource", "resources"),
        unchanged
    );
    finish(all)
}

/// Plan against the live object, then create or update
async fn apply_one(
    provider: &Provider<KubeObjectApi>,
    config: &ResourceConfig,
    cancel: &CancellationToken,
    diags: &mut Diagnostics,
) -> Option<PlanAction> {
    let identity = match config.validate() {
        Ok(identity) => identity,
        Err(e) => {
            diags.add_error(
                format!("Invalid {} configuration", config.kind),
                &KubeError::from(e),
            );
            return None;
        }
    };

    let mut lookup = Diagnostics::new();
    let prior = provider
        .read(&ResourceState::imported(&identity), &mut lookup)
        .await;
    if lookup.has_errors() && !lookup.has_error_kind(DiagnosticKind::NotFound) {
        diags.extend(lookup);
        return None;
    }

    let action = provider.plan(prior.as_ref(), config, diags)?;

    let spinner = (!config.settings.wait_for_upsert.is_empty())
        .then(|| display::wait_spinner(format!("applying {identity}")));

    let result = match (action, &prior) {
        (PlanAction::Noop, _) => Some(action),
        (PlanAction::Create, _) | (_, None) => provider
            .create(config, cancel, diags)
            .await
            .map(|_| PlanAction::Create),
        (_, Some(prior)) => provider
            .update(prior, config, cancel, diags)
            .await
            .map(|_| action),
    };

    if let Some(spinner) = spinner {
        spinner.finish_and_clear();
    }
    result
}
