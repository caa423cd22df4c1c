//! Display formatting for CLI output
//!
//! Provides structured display for:
//! - Provider diagnostics grouped by resource document
//! - The kind catalogue
//! - Drift diffs and delete outcomes

use console::style;
use hiveform_core::{HiveKind, Scope};
use hiveform_kube::{
    ChangeType, DeleteOutcome, DeleteState, Diagnostics, ResourceChange, Severity,
};
use hiveform_kube::diff::LineType;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Print diagnostics to stderr under a heading naming the resource
pub fn display_diagnostics(heading: &str, diags: &Diagnostics) {
    if diags.is_empty() {
        return;
    }

    eprintln!("{}", style(heading).cyan().bold());
    for diag in diags {
        let icon = match diag.severity {
            Severity::Error => style("✗").red(),
            Severity::Warning => style("⚠").yellow(),
        };
        eprintln!("  {} {} {}", icon, diag.summary, style(format!("[{}]", diag.kind)).dim());
        eprintln!("    {}", diag.detail);
    }
}

/// Render the kind catalogue as an aligned table
pub fn format_kinds_table() -> String {
    let rows: Vec<[String; 4]> = HiveKind::ALL
        .iter()
        .map(|kind| {
            [
                kind.kind().to_string(),
                kind.api_version(),
                match kind.scope() {
                    Scope::Namespaced => "Namespaced".to_string(),
                    Scope::Cluster => "Cluster".to_string(),
                },
                kind.type_name(),
            ]
        })
        .collect();

    let headers = ["KIND", "API VERSION", "SCOPE", "TYPE"];
    let mut widths = headers.map(str::len);
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.len());
        }
    }

    let mut output = String::new();
    let mut push_row = |cells: [&str; 4]| {
        let line = cells
            .iter()
            .zip(widths)
            .map(|(cell, width)| format!("{cell:<width$}"))
            .collect::<Vec<_>>()
            .join("  ");
        output.push_str(line.trim_end());
        output.push('\n');
    };

    push_row(headers);
    for row in &rows {
        push_row([&row[0], &row[1], &row[2], &row[3]]);
    }
    output
}

/// Print one drift result with a coloured diff
pub fn display_change(change: &ResourceChange) {
    let label = match change.change_type {
        ChangeType::Added => style("+ create").green().bold(),
        ChangeType::Drifted => style("~ drifted").yellow().bold(),
        ChangeType::Unchanged => style("= unchanged").dim(),
    };
    println!("{} {}", label, style(&change.identity).cyan());

    for line in &change.diff.lines {
        let rendered = match line.line_type {
            LineType::Added => style(format!("+{}", line.content)).green(),
            LineType::Removed => style(format!("-{}", line.content)).red(),
            LineType::Context => style(format!(" {}", line.content)).dim(),
        };
        println!("    {}", rendered);
    }
}

pub fn format_delete_outcome(identity: &str, outcome: &DeleteOutcome) -> String {
    match outcome.state {
        DeleteState::ConfirmedAbsent => format!(
            "{} {} deleted",
            style("✓").green().bold(),
            style(identity).cyan()
        ),
        DeleteState::Requested | DeleteState::Polling => format!(
            "{} {} deletion requested, not waiting",
            style("→").blue().bold(),
            style(identity).cyan()
        ),
        DeleteState::TimedOut => format!(
            "{} {} still present after {}",
            style("✗").red().bold(),
            style(identity).cyan(),
            humanize(outcome.elapsed)
        ),
    }
}

/// Spinner on stderr while a wait is in progress
pub fn wait_spinner(message: impl Into<String>) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    let template = ProgressStyle::with_template("{spinner:.blue} {msg} {elapsed:.dim}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner());
    spinner.set_style(template);
    spinner.set_message(message.into());
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner
}

/// Duration as whole seconds, or milliseconds below one second
pub fn humanize(duration: Duration) -> String {
    if duration < Duration::from_secs(1) {
        format!("{}ms", duration.as_millis())
    } else {
        format!("{}s", duration.as_secs())
    }
}

/// Pluralize a word based on count
pub fn pluralize(count: usize, singular: &str, plural: &str) -> String {
    if count == 1 {
        format!("{} {}", count, singular)
    } else {
        format!("{} {}", count, plural)
    }
}
