//! Stowage CLI - Velero backups and restores driven by release values

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use stowage_core::OperationKind;
use stowage_kube::HookPhase;
use tracing_subscriber::EnvFilter;

mod commands;
mod error;
mod exit_codes;

#[derive(Parser)]
#[command(name = "stowage")]
#[command(author = "Stowage Contributors")]
#[command(version)]
#[command(about = "Backup and restore deployment hooks driven by release values", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug output
    #[arg(long, global = true)]
    debug: bool,

    /// Settings file (defaults apply when unset)
    #[arg(long, global = true, env = "STOWAGE_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show what a hook would do for the given values, without a cluster
    Plan {
        /// Hook phase (post-install, post-upgrade, pre-upgrade, pre-delete)
        phase: HookPhase,

        /// Release name
        name: String,

        /// Values file(s) to merge
        #[arg(short = 'f', long = "values")]
        values: Vec<PathBuf>,

        /// Set values on command line (key=value)
        #[arg(long = "set")]
        set: Vec<String>,

        /// Release namespace
        #[arg(short, long, default_value = "default")]
        namespace: String,

        /// Release revision
        #[arg(long, default_value_t = 1)]
        revision: u32,

        /// Output the resources that would be submitted as JSON
        #[arg(long)]
        json: bool,
    },

    /// Run a hook for a stored release against the cluster
    Run {
        /// Hook phase (post-install, post-upgrade, pre-upgrade, pre-delete)
        phase: HookPhase,

        /// Release name
        release: String,

        /// Release namespace
        #[arg(short, long, default_value = "default")]
        namespace: String,

        /// Directory holding release records
        #[arg(long, env = "STOWAGE_STORAGE_DIR")]
        storage_dir: Option<PathBuf>,
    },

    /// Show the phase of a Backup or Restore
    Status {
        /// Resource kind (backup or restore)
        kind: OperationKind,

        /// Resource name
        name: String,

        /// Namespace of the resource (defaults to the settings namespace)
        #[arg(short, long)]
        namespace: Option<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

fn init_tracing(debug: bool) {
    let default = if debug { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    // Setup miette for nice error display
    miette::set_panic_hook();

    let cli = Cli::parse();
    init_tracing(cli.debug);

    let config = cli.config.as_deref();
    let result = match cli.command {
        Commands::Plan {
            phase,
            name,
            values,
            set,
            namespace,
            revision,
            json,
        } => commands::plan::run(
            phase, &name, &values, &set, &namespace, revision, config, json,
        ),

        Commands::Run {
            phase,
            release,
            namespace,
            storage_dir,
        } => commands::run::run(phase, &release, &namespace, storage_dir, config).await,

        Commands::Status {
            kind,
            name,
            namespace,
            json,
        } => commands::status::run(kind, &name, namespace.as_deref(), config, json).await,
    };

    match result {
        Ok(()) => ExitCode::from(exit_codes::SUCCESS as u8),
        Err(e) => {
            let code = e.exit_code();
            eprintln!("{:?}", miette::Report::new(e));
            ExitCode::from(code as u8)
        }
    }
}
