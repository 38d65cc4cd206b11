//! Generate command implementation
//!
//! Implements `plinth generate`: seeds the configuration store from the
//! manifest and the command line, runs a generation pass and writes
//! `build.ninja` into the output directory (or prints the resolved phases
//! as JSON).

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::cli::output::status;
use crate::config::defaults::{DEFAULT_BUILD_FILE, DEFAULT_OUTPUT_DIR, ROOT_SCOPE};
use crate::config::keys::{BUILD_DEBUG, BUILD_VARIANT, PATHS_OUTPUT};
use crate::core::generate::generate;
use crate::core::manifest::Manifest;
use crate::core::store::{parse_override, ConfigStore, Scope};
use crate::infra::executables::PathResolver;
use crate::infra::glob::FsGlob;
use crate::infra::ninja::{BuildFileWriter, NinjaWriter};

/// Options for `plinth generate`
#[derive(Debug, Clone, Default)]
pub struct GenerateOptions {
    /// Manifest path, relative to the working directory
    pub manifest: Option<PathBuf>,
    /// Extra configuration file
    pub config: Option<PathBuf>,
    /// `KEY=VALUE` overrides
    pub set: Vec<String>,
    /// `--debug`
    pub debug: bool,
    /// `--output`
    pub output: Option<PathBuf>,
    /// `--variant`
    pub variant: Option<String>,
    /// Print resolved phases as JSON instead of writing the build file
    pub json: bool,
    /// Suppress the summary line
    pub quiet: bool,
}

/// Execute the generate command
pub fn execute(project_dir: &Path, options: &GenerateOptions) -> Result<()> {
    let (manifest, root) = super::load_manifest(project_dir, options.manifest.as_deref())?;

    let mut store = ConfigStore::from_root(seed_root_scope(&manifest, &root, options)?);
    let project = manifest
        .into_project(&root)
        .context("Invalid project definition")?;

    let phases = generate(&project, &mut store, &PathResolver, &FsGlob::new(&root))
        .with_context(|| format!("Failed to generate project '{}'", project.name()))?;

    if options.json {
        println!("{}", serde_json::to_string_pretty(&phases)?);
        return Ok(());
    }

    let output_dir = PathBuf::from(store.get_str(PATHS_OUTPUT).unwrap_or(DEFAULT_OUTPUT_DIR));
    let build_file = output_dir.join(DEFAULT_BUILD_FILE);
    NinjaWriter::new()
        .with_header(format!(
            "Generated by plinth {} for project '{}'; do not edit",
            env!("CARGO_PKG_VERSION"),
            project.name()
        ))
        .write_to(&phases, &build_file)?;

    if !options.quiet {
        println!(
            "{} Wrote {} ({} phase(s))",
            status::SUCCESS,
            build_file.display(),
            phases.len()
        );
    }
    Ok(())
}

/// Root scope, in increasing priority: defaults, manifest `[config]`,
/// `--config` file, `--set` pairs, flags
fn seed_root_scope(manifest: &Manifest, root: &Path, options: &GenerateOptions) -> Result<Scope> {
    let mut scope = Scope::new(ROOT_SCOPE);
    scope.set(PATHS_OUTPUT, DEFAULT_OUTPUT_DIR);
    scope.merge_table(&manifest.config);

    if let Some(path) = &options.config {
        let file = Scope::load_from_path("config-file", path)
            .with_context(|| format!("Failed to load configuration file {}", path.display()))?;
        for (key, value) in file.entries() {
            scope.set(key.clone(), value.clone());
        }
    }
    for input in &options.set {
        let (key, value) = parse_override(input)?;
        tracing::debug!("Override {} = {}", key, value);
        scope.set(key, value);
    }

    if options.debug {
        scope.set(BUILD_DEBUG, true);
    }
    if let Some(output) = &options.output {
        scope.set(PATHS_OUTPUT, output.display().to_string());
    }
    if let Some(variant) = &options.variant {
        scope.set(BUILD_VARIANT, variant.as_str());
    }

    // Relative output directories are relative to the project root
    let output = scope
        .get(PATHS_OUTPUT)
        .and_then(toml::Value::as_str)
        .map(PathBuf::from)
        .filter(|path| path.is_relative());
    if let Some(output) = output {
        scope.set(PATHS_OUTPUT, root.join(output).display().to_string());
    }
    Ok(scope)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manifest() -> Manifest {
        Manifest::from_toml(
            r#"
[project]
name = "hello"

[config]
paths = { output = "out" }
java = { javac_command = "javac" }
"#,
        )
        .unwrap()
    }

    #[test]
    fn test_flags_override_manifest_config() {
        let options = GenerateOptions {
            set: vec!["java.javac_command=custom-javac".to_string()],
            debug: true,
            variant: Some("release".to_string()),
            ..GenerateOptions::default()
        };
        let scope = seed_root_scope(&manifest(), Path::new("/work"), &options).unwrap();

        assert_eq!(
            scope.get("java.javac_command").and_then(toml::Value::as_str),
            Some("custom-javac")
        );
        assert_eq!(
            scope.get(BUILD_DEBUG).and_then(toml::Value::as_bool),
            Some(true)
        );
        assert_eq!(
            scope.get(BUILD_VARIANT).and_then(toml::Value::as_str),
            Some("release")
        );
        assert_eq!(
            scope.get(PATHS_OUTPUT).and_then(toml::Value::as_str),
            Some("/work/out")
        );
    }

    #[test]
    fn test_output_flag_wins() {
        let options = GenerateOptions {
            output: Some(PathBuf::from("/tmp/elsewhere")),
            ..GenerateOptions::default()
        };
        let scope = seed_root_scope(&manifest(), Path::new("/work"), &options).unwrap();
        assert_eq!(
            scope.get(PATHS_OUTPUT).and_then(toml::Value::as_str),
            Some("/tmp/elsewhere")
        );
    }

    #[test]
    fn test_malformed_override_is_rejected() {
        let options = GenerateOptions {
            set: vec!["no-equals-sign".to_string()],
            ..GenerateOptions::default()
        };
        assert!(seed_root_scope(&manifest(), Path::new("/work"), &options).is_err());
    }
}
