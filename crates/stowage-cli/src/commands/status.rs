//! Status command - show the phase of a Backup or Restore

use console::style;
use std::path::Path;
use stowage_core::{OperationKind, OperationSettings, Phase};
use stowage_kube::{KubeObjectStore, ObjectStore, ResourceKey};

use crate::error::Result;

/// Run the status command
pub async fn run(
    kind: OperationKind,
    name: &str,
    namespace: Option<&str>,
    config: Option<&Path>,
    output_json: bool,
) -> Result<()> {
    let settings = OperationSettings::resolve(config)?;
    let namespace = namespace.unwrap_or(&settings.namespace).to_string();

    let store = KubeObjectStore::try_default(&settings).await?;
    let resource = store.get(&ResourceKey::new(kind, namespace, name)).await?;

    if output_json {
        println!("{}", serde_json::to_string_pretty(&resource)?);
        return Ok(());
    }

    println!("{}", style(format!("{} INFO", kind.as_str().to_uppercase())).bold().underlined());
    println!("  Name:       {}", style(&resource.metadata.name).cyan());
    println!("  Namespace:  {}", style(&resource.metadata.namespace).yellow());

    let phase = resource.phase();
    let phase_style = match phase {
        Some(Phase::Completed) => style("Completed".to_string()).green(),
        Some(p) if p.is_failure() => style(p.to_string()).red(),
        Some(p) => style(p.to_string()).yellow(),
        None => style("not reconciled yet".to_string()).dim(),
    };
    println!("  Phase:      {}", phase_style);

    if let Some(status) = &resource.status {
        if let Some(started) = status.start_timestamp {
            println!("  Started:    {}", started.format("%Y-%m-%d %H:%M:%S"));
        }
        if let Some(completed) = status.completion_timestamp {
            println!("  Completed:  {}", completed.format("%Y-%m-%d %H:%M:%S"));
        }
        if phase.is_some_and(|p| p.is_failure()) {
            println!("  Details:    {}", style(status.diagnostics()).red());
        } else if status.warnings.is_some_and(|w| w > 0) {
            println!("  Details:    {}", style(status.diagnostics()).yellow());
        }
    }

    match kind {
        OperationKind::Backup => {
            if let Ok(spec) = resource.backup_spec() {
                println!("\n{}", style("SPEC").bold().underlined());
                println!("  Storage:    {}", spec.storage_location);
                println!("  TTL:        {}", spec.ttl);
                println!("  Namespaces: {}", spec.include_namespaces.join(", "));
            }
        }
        OperationKind::Restore => {
            if let Ok(spec) = resource.restore_spec() {
                println!("\n{}", style("SPEC").bold().underlined());
                println!("  Backup:     {}", spec.backup_name);
                println!("  Restore PVs: {}", spec.restore_pvs);
                println!("  Excluded:   {}", spec.excluded_resources.join(", "));
            }
        }
    }

    Ok(())
}
