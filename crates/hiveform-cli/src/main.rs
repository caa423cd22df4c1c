//! Hiveform CLI - manage Hive custom resources with server-side apply

use clap::{Parser, Subcommand};
use hiveform_core::{DeletionPropagation, HiveKind, ProviderConfig};
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

mod commands;
mod display;
mod error;
mod exit_codes;

use commands::{OutputFormat, Session, delete::DeleteOptions};
use error::{CliError, Result};

#[derive(Parser)]
#[command(name = "hiveform")]
#[command(author = "Hiveform Contributors")]
#[command(version)]
#[command(about = "Manage Hive custom resources with server-side apply", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Provider configuration file
    #[arg(long, global = true, env = "HIVEFORM_CONFIG")]
    config: Option<PathBuf>,

    /// Kubeconfig file
    #[arg(long, global = true, env = "HIVEFORM_KUBECONFIG")]
    kubeconfig: Option<PathBuf>,

    /// Kubeconfig context
    #[arg(long, global = true, env = "HIVEFORM_CONTEXT")]
    context: Option<String>,

    /// Field manager for server-side apply
    #[arg(long, global = true, env = "HIVEFORM_FIELD_MANAGER")]
    field_manager: Option<String>,

    /// Take ownership of fields managed by others
    #[arg(long, global = true, env = "HIVEFORM_FORCE_CONFLICTS")]
    force_conflicts: bool,

    /// Never contact the cluster
    #[arg(long, global = true, env = "HIVEFORM_OFFLINE")]
    offline: bool,

    /// Enable debug output
    #[arg(long, global = true)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or update resources from documents
    Apply {
        /// Resource document file(s)
        #[arg(short = 'f', long = "filename", required = true)]
        files: Vec<PathBuf>,
    },

    /// Show a live object
    Get {
        /// Kind, plural or type name
        kind: HiveKind,

        /// `namespace/name`, or `name` for cluster-scoped kinds
        id: String,

        /// Output format
        #[arg(short, long, value_enum, default_value = "yaml")]
        output: OutputFormat,

        /// Print the object as returned by the server
        #[arg(long)]
        raw: bool,
    },

    /// Delete resources and wait until they are gone
    Delete {
        /// Resource document file(s)
        #[arg(short = 'f', long = "filename", conflicts_with = "kind")]
        files: Vec<PathBuf>,

        /// Kind, plural or type name
        #[arg(requires = "id")]
        kind: Option<HiveKind>,

        /// `namespace/name`, or `name` for cluster-scoped kinds
        id: Option<String>,

        /// Seconds to wait for the object to disappear
        #[arg(long)]
        timeout: Option<u64>,

        /// Seconds between existence checks
        #[arg(long)]
        poll_interval: Option<u64>,

        /// Deletion propagation (Orphan, Background, Foreground)
        #[arg(long)]
        propagation: Option<DeletionPropagation>,

        /// Check once after DELETE instead of waiting
        #[arg(long, conflicts_with_all = ["timeout", "poll_interval"])]
        no_wait: bool,
    },

    /// Print an existing object as a resource document
    Import {
        /// Kind, plural or type name
        kind: HiveKind,

        /// `namespace/name`, or `name` for cluster-scoped kinds
        id: String,

        /// Output format
        #[arg(short, long, value_enum, default_value = "yaml")]
        output: OutputFormat,
    },

    /// Show how live objects differ from documents
    Diff {
        /// Resource document file(s)
        #[arg(short = 'f', long = "filename", required = true)]
        files: Vec<PathBuf>,

        /// Exit with status 1 when anything drifted
        #[arg(long)]
        exit_code: bool,
    },

    /// Render documents as manifests without contacting the cluster
    Manifest {
        /// Resource document file(s)
        #[arg(short = 'f', long = "filename", required = true)]
        files: Vec<PathBuf>,

        /// Write to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// List supported kinds
    Kinds {
        /// Structured output instead of a table
        #[arg(short, long, value_enum)]
        output: Option<OutputFormat>,
    },
}

#[tokio::main]
async fn main() {
    // Setup miette for nice error display
    miette::set_panic_hook();

    let cli = Cli::parse();
    init_tracing(cli.debug);

    if let Err(err) = run(cli).await {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }
}

fn init_tracing(debug: bool) {
    let default = if debug {
        "hiveform=debug,hiveform_kube=debug,hiveform_core=debug,warn"
    } else {
        "warn"
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)))
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Config file (explicit or default location) with command-line overrides
fn resolve_config(cli: &Cli) -> Result<ProviderConfig> {
    let loaded = match &cli.config {
        Some(path) => ProviderConfig::load_from(path),
        None => ProviderConfig::load(),
    };
    let mut config = loaded.map_err(|e| CliError::Config {
        message: e.to_string(),
    })?;

    if let Some(kubeconfig) = &cli.kubeconfig {
        config.kubeconfig = Some(kubeconfig.clone());
    }
    if let Some(context) = &cli.context {
        config.context = Some(context.clone());
    }
    if let Some(manager) = &cli.field_manager {
        config.field_manager = manager.clone();
    }
    config.force_conflicts |= cli.force_conflicts;
    config.offline |= cli.offline;

    debug!(?config, "resolved provider configuration");
    Ok(config)
}

async fn run(cli: Cli) -> Result<()> {
    let config = resolve_config(&cli)?;

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            debug!("interrupted, cancelling");
            on_signal.cancel();
        }
    });

    let session = Session::new(config, cancel);

    match cli.command {
        Commands::Apply { files } => commands::apply::run(&session, &files).await,

        Commands::Get {
            kind,
            id,
            output,
            raw,
        } => commands::get::run(&session, kind, &id, output, raw).await,

        Commands::Delete {
            files,
            kind,
            id,
            timeout,
            poll_interval,
            propagation,
            no_wait,
        } => {
            let target = kind.zip(id);
            if files.is_empty() && target.is_none() {
                return Err(CliError::validation_with_help(
                    "nothing to delete",
                    "pass -f FILE or KIND ID",
                ));
            }

            let options = DeleteOptions {
                timeout,
                poll_interval,
                propagation,
                no_wait,
            };
            commands::delete::run(&session, &files, target, &options).await
        }

        Commands::Import { kind, id, output } => {
            commands::import::run(&session, kind, &id, output).await
        }

        Commands::Diff { files, exit_code } => {
            commands::diff::run(&session, &files, exit_code).await
        }

        Commands::Manifest { files, output } => {
            commands::manifest::run(&session, &files, output.as_deref())
        }

        Commands::Kinds { output } => commands::kinds::run(output),
    }
}
