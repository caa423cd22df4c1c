//! Get command - look up a live object by kind and id

use hiveform_core::{HiveKind, ResourceIdentity};
use hiveform_kube::{Diagnostics, KubeError};

use super::{OutputFormat, Session, finish};
use crate::display;
use crate::error::Result;

/// Run the get command
///
/// `raw` prints the object as the server returned it instead of the
/// metadata/spec/status view.
pub async fn run(
    session: &Session,
    kind: HiveKind,
    id: &str,
    output: OutputFormat,
    raw: bool,
) -> Result<()> {
    let heading = format!("{kind}/{id}");
    let mut diags = Diagnostics::new();

    let identity = match ResourceIdentity::import(kind, id) {
        Ok(identity) => identity,
        Err(e) => {
            diags.add_error(format!("Invalid {kind} id"), &KubeError::from(e));
            display::display_diagnostics(&heading, &diags);
            return finish(diags);
        }
    };

    let provider = session.provider().await?;
    let rendered = if raw {
        match provider.read_object(&identity, &mut diags).await {
            Some(object) => Some(output.render(&object)?),
            None => None,
        }
    } else {
        match provider.read_data_source(&identity, &mut diags).await {
            Some(observed) => Some(output.render(&observed)?),
            None => None,
        }
    };

    if let Some(rendered) = rendered {
        print!("{rendered}");
    }
    display::display_diagnostics(&heading, &diags);
    finish(diags)
}
