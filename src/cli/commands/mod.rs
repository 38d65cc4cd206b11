//! CLI command implementations
//!
//! Each command is implemented in its own submodule.

pub mod check;
pub mod generate;

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Subcommand;

use crate::config::defaults::DEFAULT_MANIFEST;
use crate::core::manifest::Manifest;

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Generate the build file for a project
    Generate {
        /// Path to the project manifest
        #[arg(short, long)]
        manifest: Option<PathBuf>,

        /// Extra configuration file merged over the manifest's [config]
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Set a configuration value (KEY=VALUE), may be repeated
        #[arg(short, long = "set", value_name = "KEY=VALUE")]
        set: Vec<String>,

        /// Enable debug flags (sets build.debug)
        #[arg(long)]
        debug: bool,

        /// Output directory (sets paths.output)
        #[arg(short, long, env = "PLINTH_OUTPUT")]
        output: Option<PathBuf>,

        /// Build variant (sets build.variant)
        #[arg(long)]
        variant: Option<String>,
    },

    /// Validate the manifest and show the phase generation order
    Check {
        /// Path to the project manifest
        #[arg(short, long)]
        manifest: Option<PathBuf>,
    },
}

impl Commands {
    /// Execute the command
    pub fn run(self, json: bool, quiet: bool) -> Result<()> {
        let current_dir = std::env::current_dir()?;
        match self {
            Self::Generate {
                manifest,
                config,
                set,
                debug,
                output,
                variant,
            } => {
                let options = generate::GenerateOptions {
                    manifest,
                    config,
                    set,
                    debug,
                    output,
                    variant,
                    json,
                    quiet,
                };
                generate::execute(&current_dir, &options)
            }
            Self::Check { manifest } => check::execute(&current_dir, manifest.as_deref(), json),
        }
    }
}

/// Locate and load the manifest; returns it with the project root directory
pub(crate) fn load_manifest(
    project_dir: &Path,
    manifest: Option<&Path>,
) -> Result<(Manifest, PathBuf)> {
    let manifest_path = match manifest {
        Some(path) => project_dir.join(path),
        None => project_dir.join(DEFAULT_MANIFEST),
    };
    if !manifest_path.exists() {
        bail!(
            "No {} found at {}",
            DEFAULT_MANIFEST,
            manifest_path.display()
        );
    }

    let manifest = Manifest::load(&manifest_path)
        .with_context(|| format!("Failed to load manifest at {}", manifest_path.display()))?;
    let root = manifest_path
        .parent()
        .map_or_else(|| project_dir.to_path_buf(), Path::to_path_buf);
    tracing::info!("Loaded project '{}' from {}", manifest.project.name, manifest_path.display());
    Ok((manifest, root))
}
