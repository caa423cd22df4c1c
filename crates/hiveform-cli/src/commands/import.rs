//! Import command - turn an existing object into a resource document

use hiveform_core::HiveKind;
use hiveform_kube::{Diagnostic, DiagnosticKind, Diagnostics};

use super::{OutputFormat, Session, finish};
use crate::display;
use crate::error::Result;

/// Run the import command
///
/// The id is `namespace/name` for namespaced kinds and `name` otherwise.
/// Offline, only the identity fields are printed.
pub async fn run(session: &Session, kind: HiveKind, id: &str, output: OutputFormat) -> Result<()> {
    let heading = format!("{kind}/{id}");
    let mut diags = Diagnostics::new();

    let Some(seeded) = session.offline_provider().import_state(kind, id, &mut diags) else {
        display::display_diagnostics(&heading, &diags);
        return finish(diags);
    };

    let provider = session.provider().await?;

    let state = if provider.is_offline() {
        diags.push(Diagnostic::warning(
            DiagnosticKind::Validation,
            "Imported without reading",
            "offline mode, metadata and spec were not read from the cluster",
        ));
        Some(seeded)
    } else {
        provider.read(&seeded, &mut diags).await
    };

    if let Some(state) = state {
        print!("{}", output.render(&state.to_config())?);
    }
    display::display_diagnostics(&heading, &diags);
    finish(diags)
}
