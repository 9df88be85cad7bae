//! Plan command - show what a hook would do, without a cluster

use console::style;
use serde_json::Value as JsonValue;
use std::path::{Path, PathBuf};
use stowage_core::resource::go_duration;
use stowage_core::{ChartRef, OperationSettings, Release, Values, parse_set_values};
use stowage_kube::{HookPhase, PlannedStep, plan};

use crate::error::Result;

/// Run the plan command
#[allow(clippy::too_many_arguments)]
pub fn run(
    phase: HookPhase,
    name: &str,
    values_files: &[PathBuf],
    set_values: &[String],
    namespace: &str,
    revision: u32,
    config: Option<&Path>,
    output_json: bool,
) -> Result<()> {
    let settings = OperationSettings::resolve(config)?;

    let mut values = Values::new();
    for vf in values_files {
        let overlay = Values::from_file(vf)?;
        values.merge(&overlay);
    }
    if !set_values.is_empty() {
        values.merge(&parse_set_values(set_values)?);
    }

    let mut release = Release::new(
        name,
        namespace,
        ChartRef::new(name, semver::Version::new(0, 0, 0)),
        values,
    );
    release.revision = revision;

    let steps = plan(phase, &release, &settings)?;

    if output_json {
        let resources: Vec<_> = steps
            .iter()
            .filter_map(|step| match step {
                PlannedStep::Submit(resource) => Some(resource),
                _ => None,
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&resources)?);
        return Ok(());
    }

    println!(
        "{} Plan for {} of {} (revision {})",
        style("→").blue().bold(),
        style(phase).cyan(),
        style(release.qualified_name()).cyan(),
        style(revision).yellow()
    );

    if steps.is_empty() {
        println!("{} Nothing to do", style("✓").green().bold());
        return Ok(());
    }

    for (i, step) in steps.iter().enumerate() {
        let n = style(format!("{}.", i + 1)).dim();
        match step {
            PlannedStep::Patch(patch) => {
                println!("  {} Update release: {}", n, dotted(patch).join(", "));
            }
            PlannedStep::Submit(resource) => {
                println!("  {} Submit {}", n, style(resource.display_name()).cyan());
                let yaml = serde_yaml::to_string(resource)?;
                for line in yaml.lines() {
                    println!("       {}", style(line).dim());
                }
            }
            PlannedStep::Wait(schedule) => {
                println!(
                    "  {} Wait up to {} ({} polls)",
                    n,
                    go_duration(schedule.total),
                    schedule.polls
                );
            }
            PlannedStep::Reconcile(patch) => {
                println!("  {} On success, update release: {}", n, dotted(patch).join(", "));
            }
            PlannedStep::Delete(key) => {
                println!("  {} Once finished, delete {}", n, key);
            }
        }
    }

    Ok(())
}

/// Flatten a patch into `a.b=value` pairs
fn dotted(values: &Values) -> Vec<String> {
    fn walk(prefix: &str, value: &JsonValue, out: &mut Vec<String>) {
        match value {
            JsonValue::Object(map) => {
                for (key, child) in map {
                    let path = if prefix.is_empty() {
                        key.clone()
                    } else {
                        format!("{}.{}", prefix, key)
                    };
                    walk(&path, child, out);
                }
            }
            leaf => out.push(format!("{}={}", prefix, leaf)),
        }
    }

    let mut out = Vec::new();
    walk("", values.inner(), &mut out);
    out
}
