//! Ninja build-file writer
//!
//! Lowers resolved phases into a `build.ninja`: one `rule` per phase and one
//! `build` statement per resolved build. Rebuild-on files and the recorded
//! outputs of rebuild-on phases become implicit dependencies (`| ...`), so
//! ninja's staleness rule covers them.

use std::collections::BTreeSet;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use crate::core::generate::ResolvedPhase;
use crate::error::FilesystemError;
use crate::infra::filesystem;

/// Emits a persisted build file from resolved phases
pub trait BuildFileWriter {
    /// Render the build file
    fn render(&self, phases: &[ResolvedPhase]) -> String;

    /// Render and write the build file to `path`, creating parent directories
    fn write_to(&self, phases: &[ResolvedPhase], path: &Path) -> Result<(), FilesystemError> {
        tracing::info!("Writing build file: {}", path.display());
        filesystem::write_file(path, &self.render(phases))
    }
}

/// Writer for the ninja format
#[derive(Debug, Clone, Default)]
pub struct NinjaWriter {
    header: Option<String>,
}

impl NinjaWriter {
    /// Create a writer
    pub fn new() -> Self {
        Self::default()
    }

    /// Comment written at the top of the file
    #[must_use]
    pub fn with_header(mut self, header: impl Into<String>) -> Self {
        self.header = Some(header.into());
        self
    }
}

impl BuildFileWriter for NinjaWriter {
    fn render(&self, phases: &[ResolvedPhase]) -> String {
        let mut out = String::new();
        if let Some(header) = &self.header {
            for line in header.lines() {
                let _ = writeln!(out, "# {line}");
            }
            out.push('\n');
        }

        let mut rules = BTreeSet::new();
        for phase in phases {
            let rule = unique_rule_name(&mut rules, &phase.project, &phase.phase);
            let _ = writeln!(out, "rule {rule}");
            let _ = writeln!(out, "  command = {}", phase.command);
            let _ = writeln!(out, "  description = {}/{} $out", phase.project, phase.phase);
            out.push('\n');

            let implicit = join_paths(&phase.implicit);
            for build in &phase.builds {
                let _ = write!(out, "build {}: {rule}", join_paths(&build.outputs));
                if !build.inputs.is_empty() {
                    let _ = write!(out, " {}", join_paths(&build.inputs));
                }
                if !implicit.is_empty() {
                    let _ = write!(out, " | {implicit}");
                }
                out.push('\n');
                for (name, value) in &build.vars {
                    let _ = writeln!(out, "  {name} = {value}");
                }
            }
            if !phase.builds.is_empty() {
                out.push('\n');
            }
        }
        out
    }
}

/// Rule name for a phase; anything outside `[A-Za-z0-9_-]` becomes `_`
fn rule_name(project: &str, phase: &str) -> String {
    format!("{project}_{phase}")
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// [`rule_name`], suffixed with `_2`, `_3`, ... when already taken
fn unique_rule_name(taken: &mut BTreeSet<String>, project: &str, phase: &str) -> String {
    let base = rule_name(project, phase);
    let mut name = base.clone();
    let mut suffix = 2;
    while taken.contains(&name) {
        name = format!("{base}_{suffix}");
        suffix += 1;
    }
    taken.insert(name.clone());
    name
}

/// Escape a path for a `build` line
fn escape_path(path: &Path) -> String {
    path.display()
        .to_string()
        .replace('$', "$$")
        .replace(' ', "$ ")
        .replace(':', "$:")
}

fn join_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| escape_path(p))
        .collect::<Vec<_>>()
        .join(" ")
}
