//! Check command implementation
//!
//! Implements `plinth check` to validate a manifest without generating:
//! phases are built and extensions attached (so capability mismatches
//! surface), then the generation order is printed. References to phases
//! missing from the project are reported as warnings, since generation
//! treats their outputs as empty.

use std::path::Path;

use anyhow::{Context, Result};

use crate::cli::output::status;
use crate::core::project::Project;

/// Execute the check command
pub fn execute(project_dir: &Path, manifest: Option<&Path>, json: bool) -> Result<()> {
    let (manifest, root) = super::load_manifest(project_dir, manifest)?;
    tracing::info!("Checking project: {}", manifest.project.name);

    let project = manifest
        .into_project(&root)
        .context("Invalid project definition")?;
    let order = project
        .build_order()
        .context("Cannot order phases")?;
    let warnings = unknown_references(&project);

    if json {
        let phases: Vec<serde_json::Value> = order
            .iter()
            .map(|phase| {
                serde_json::json!({
                    "name": phase.name(),
                    "kinds": phase.executor().kinds(),
                    "extensions": phase
                        .extensions()
                        .iter()
                        .map(|extension| extension.name())
                        .collect::<Vec<_>>(),
                    "rebuild_on_from": phase.rebuild_on_from(),
                })
            })
            .collect();
        let report = serde_json::json!({
            "project": project.name(),
            "phases": phases,
            "warnings": warnings,
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("{} Project '{}' is valid", status::SUCCESS, project.name());
    for warning in &warnings {
        println!("{} {warning}", status::WARNING);
    }
    println!("\nGeneration order:");
    if order.is_empty() {
        println!("  (none)");
    }
    for (index, phase) in order.iter().enumerate() {
        let kinds: Vec<String> = phase
            .executor()
            .kinds()
            .iter()
            .map(ToString::to_string)
            .collect();
        println!("  {}. {} [{}]", index + 1, phase.name(), kinds.join(", "));
    }
    Ok(())
}

/// Local input and rebuild-on references naming no phase of `project`
fn unknown_references(project: &Project) -> Vec<String> {
    let mut warnings = Vec::new();
    for phase in project.phases() {
        let references = phase.inputs_from().iter().chain(phase.rebuild_on_from());
        for reference in references {
            if reference.is_within(project.name()) && project.phase(reference.phase()).is_none() {
                let warning = format!(
                    "Phase '{}' references unknown phase '{}'",
                    phase.name(),
                    reference.phase()
                );
                if !warnings.contains(&warning) {
                    warnings.push(warning);
                }
            }
        }
    }
    warnings
}
