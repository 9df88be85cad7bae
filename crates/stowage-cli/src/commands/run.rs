//! Run command - drive a hook for a stored release against the cluster

use console::style;
use std::path::{Path, PathBuf};
use stowage_core::OperationSettings;
use stowage_kube::{
    FileDriver, HookOutcome, HookPhase, KubeObjectStore, Orchestrator, StorageDriver,
    StorageReleaseMutator,
};
use tokio_util::sync::CancellationToken;

use super::default_storage_dir;
use crate::error::Result;

/// Run the run command
pub async fn run(
    phase: HookPhase,
    name: &str,
    namespace: &str,
    storage_dir: Option<PathBuf>,
    config: Option<&Path>,
) -> Result<()> {
    let settings = OperationSettings::resolve(config)?;

    let storage = FileDriver::new(storage_dir.unwrap_or_else(default_storage_dir))?;
    let release = storage.get_latest(namespace, name).await?;

    println!(
        "{} Running {} hook for {} (revision {})",
        style("→").blue().bold(),
        style(phase).cyan(),
        style(release.qualified_name()).cyan(),
        style(release.revision).yellow()
    );

    let store = KubeObjectStore::try_default(&settings).await?;
    let orchestrator = Orchestrator::new(store, StorageReleaseMutator::new(storage), settings);

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupt received, cancelling");
            on_interrupt.cancel();
        }
    });

    let outcomes = orchestrator.run(phase, &release, &cancel).await?;

    for outcome in outcomes {
        match outcome {
            HookOutcome::Skipped(reason) => {
                println!("  {} skipped: {}", style("·").dim(), style(reason).dim());
            }
            HookOutcome::Completed { resource, release } => {
                let phase = resource
                    .phase()
                    .map(|p| p.to_string())
                    .unwrap_or_else(|| "submitted".to_string());
                println!(
                    "{} {} {}",
                    style("✓").green().bold(),
                    style(resource.display_name()).cyan(),
                    style(phase).green()
                );
                if let Some(updated) = release {
                    println!(
                        "  release {} now at revision {}",
                        style(updated.qualified_name()).cyan(),
                        style(updated.revision).yellow()
                    );
                }
            }
        }
    }

    Ok(())
}
