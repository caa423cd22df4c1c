//! Kinds command - list the supported Hive kinds

use hiveform_core::{HiveKind, Scope};
use serde::Serialize;

use super::OutputFormat;
use crate::display;
use crate::error::Result;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct KindEntry {
    kind: &'static str,
    api_version: String,
    plural: &'static str,
    namespaced: bool,
    type_name: String,
}

impl From<HiveKind> for KindEntry {
    fn from(kind: HiveKind) -> Self {
        Self {
            kind: kind.kind(),
            api_version: kind.api_version(),
            plural: kind.plural(),
            namespaced: kind.scope() == Scope::Namespaced,
            type_name: kind.type_name(),
        }
    }
}

/// Print the kind table, or the catalogue in a structured format
pub fn run(output: Option<OutputFormat>) -> Result<()> {
    match output {
        Some(format) => {
            let entries: Vec<KindEntry> = HiveKind::ALL.into_iter().map(KindEntry::from).collect();
            print!("{}", format.render(&entries)?);
        }
        None => print!("{}", display::format_kinds_table()),
    }
    Ok(())
}
