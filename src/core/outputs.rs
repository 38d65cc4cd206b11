//! Output registry
//!
//! Records which artifacts each phase produced during a generation pass, keyed
//! by (project, phase name). Later phases and extensions look outputs up by
//! key instead of holding references to other phases.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::error::GenerateError;

/// A file plus the directory it lives under
///
/// The directory is the glob base for inputs and the output directory for
/// outputs; consumers use it to render paths relative to where the artifact
/// was produced.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Artifact {
    /// Path to the file
    pub file: PathBuf,
    /// Containing directory the file was found or generated under
    pub dir: PathBuf,
}

impl Artifact {
    /// Create an artifact
    pub fn new(file: impl Into<PathBuf>, dir: impl Into<PathBuf>) -> Self {
        Self {
            file: file.into(),
            dir: dir.into(),
        }
    }

    /// Artifact whose directory is the file's parent
    pub fn from_file(file: impl Into<PathBuf>) -> Self {
        let file = file.into();
        let dir = file.parent().map(Path::to_path_buf).unwrap_or_default();
        Self { file, dir }
    }

    /// File path relative to `dir`, or `None` when the file is not under it
    pub fn relative(&self) -> Option<&Path> {
        if self.dir.as_os_str().is_empty() {
            return Some(&self.file);
        }
        self.file.strip_prefix(&self.dir).ok()
    }
}

/// Per-pass record of phase outputs
#[derive(Debug, Clone, Default)]
pub struct OutputRegistry {
    entries: BTreeMap<(String, String), Vec<Artifact>>,
}

impl OutputRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a phase's outputs. Each phase is recorded once per pass.
    ///
    /// # Errors
    ///
    /// Returns `GenerateError::OutputsAlreadyRecorded` if the phase already has
    /// an entry; the existing entry is left untouched.
    pub fn record(
        &mut self,
        project: &str,
        phase: &str,
        outputs: Vec<Artifact>,
    ) -> Result<(), GenerateError> {
        let key = (project.to_string(), phase.to_string());
        if self.entries.contains_key(&key) {
            return Err(GenerateError::OutputsAlreadyRecorded {
                project: project.to_string(),
                phase: phase.to_string(),
            });
        }
        tracing::debug!(
            "Recorded {} output(s) for {}/{}",
            outputs.len(),
            project,
            phase
        );
        self.entries.insert(key, outputs);
        Ok(())
    }

    /// Outputs of a phase; empty when the phase is unknown or not generated yet
    pub fn get(&self, project: &str, phase: &str) -> &[Artifact] {
        self.entries
            .get(&(project.to_string(), phase.to_string()))
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Whether the phase has been recorded
    pub fn contains(&self, project: &str, phase: &str) -> bool {
        self.entries
            .contains_key(&(project.to_string(), phase.to_string()))
    }

    /// Recorded phase names of a project, in name order
    pub fn phases(&self, project: &str) -> Vec<&str> {
        self.entries
            .keys()
            .filter(|(p, _)| p == project)
            .map(|(_, phase)| phase.as_str())
            .collect()
    }

    /// Number of recorded phases across all projects
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing has been recorded
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_phase_is_empty() {
        let registry = OutputRegistry::new();
        assert!(registry.get("app", "compile").is_empty());
        assert!(!registry.contains("app", "compile"));
    }

    #[test]
    fn test_record_preserves_order() {
        let mut registry = OutputRegistry::new();
        let outputs = vec![
            Artifact::new("build/obj/b.class", "build/obj"),
            Artifact::new("build/obj/a.class", "build/obj"),
        ];
        registry.record("app", "compile", outputs.clone()).unwrap();

        assert_eq!(registry.get("app", "compile"), outputs.as_slice());
        assert!(registry.get("other", "compile").is_empty());
        assert_eq!(registry.phases("app"), vec!["compile"]);
    }

    #[test]
    fn test_second_record_is_rejected() {
        let mut registry = OutputRegistry::new();
        registry
            .record("app", "jar", vec![Artifact::from_file("build/bin/app.jar")])
            .unwrap();
        let err = registry.record("app", "jar", Vec::new()).unwrap_err();

        assert!(matches!(err, GenerateError::OutputsAlreadyRecorded { .. }));
        assert_eq!(registry.get("app", "jar").len(), 1);
    }

    #[test]
    fn test_relative_path() {
        let inside = Artifact::new("build/obj/com/x/A.class", "build/obj");
        assert_eq!(inside.relative(), Some(Path::new("com/x/A.class")));

        let outside = Artifact::new("lib/dep.jar", "build/obj");
        assert_eq!(outside.relative(), None);
    }
}
