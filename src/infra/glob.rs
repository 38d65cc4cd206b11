//! Input globbing
//!
//! Materializes a phase's input patterns into artifacts. Each artifact's
//! directory is the phase's `input_path` when set, else the literal prefix of
//! the pattern (`src/**/*.java` -> `src`), so relative paths keep their
//! package structure.

use std::path::{Component, Path, PathBuf};

use crate::core::outputs::Artifact;
use crate::error::GenerateError;

/// Expands input patterns
pub trait GlobResolver {
    /// Matching artifacts in a stable order
    fn resolve(&self, pattern: &str, base: Option<&Path>)
        -> Result<Vec<Artifact>, GenerateError>;
}

/// Globs against the filesystem, relative to a root directory
#[derive(Debug, Clone)]
pub struct FsGlob {
    root: PathBuf,
}

impl FsGlob {
    /// Resolve relative patterns against `root`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root directory
    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl GlobResolver for FsGlob {
    fn resolve(
        &self,
        pattern: &str,
        base: Option<&Path>,
    ) -> Result<Vec<Artifact>, GenerateError> {
        let full = self.root.join(pattern);
        let full_str = full.to_string_lossy();
        let dir = match base {
            Some(base) => self.root.join(base),
            None => literal_prefix(&full),
        };

        let entries = glob::glob(&full_str).map_err(|e| GenerateError::Glob {
            pattern: pattern.to_string(),
            error: e.to_string(),
        })?;

        let mut artifacts = Vec::new();
        for entry in entries {
            let path = entry.map_err(|e| GenerateError::Glob {
                pattern: pattern.to_string(),
                error: e.to_string(),
            })?;
            if path.is_file() {
                artifacts.push(Artifact::new(path, dir.clone()));
            }
        }
        artifacts.sort();
        tracing::debug!("Pattern '{}' matched {} file(s)", pattern, artifacts.len());
        Ok(artifacts)
    }
}

/// Leading components of `pattern` that contain no glob metacharacters
fn literal_prefix(pattern: &Path) -> PathBuf {
    let mut prefix = PathBuf::new();
    let components: Vec<Component<'_>> = pattern.components().collect();
    for (i, component) in components.iter().enumerate() {
        let text = component.as_os_str().to_string_lossy();
        if text.contains(['*', '?', '[']) {
            break;
        }
        // the last component names a file, not a directory
        if i + 1 == components.len() {
            break;
        }
        prefix.push(component);
    }
    prefix
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn touch(root: &Path, rel: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "").unwrap();
    }

    #[test]
    fn test_literal_prefix() {
        assert_eq!(literal_prefix(Path::new("src/**/*.java")), PathBuf::from("src"));
        assert_eq!(literal_prefix(Path::new("src/main/A.java")), PathBuf::from("src/main"));
        assert_eq!(literal_prefix(Path::new("*.c")), PathBuf::new());
    }

    #[test]
    fn test_recursive_glob_is_sorted_and_based() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "src/com/b/B.java");
        touch(dir.path(), "src/com/a/A.java");
        touch(dir.path(), "src/README.md");

        let artifacts = FsGlob::new(dir.path())
            .resolve("src/**/*.java", None)
            .unwrap();

        assert_eq!(artifacts.len(), 2);
        assert!(artifacts[0].file.ends_with("com/a/A.java"));
        assert_eq!(artifacts[0].dir, dir.path().join("src"));
        assert_eq!(artifacts[0].relative(), Some(Path::new("com/a/A.java")));
    }

    #[test]
    fn test_explicit_base_wins() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "src/main/java/A.java");

        let artifacts = FsGlob::new(dir.path())
            .resolve("src/main/java/*.java", Some(Path::new("src")))
            .unwrap();
        assert_eq!(artifacts[0].relative(), Some(Path::new("main/java/A.java")));
    }

    #[test]
    fn test_invalid_pattern_is_error() {
        let dir = TempDir::new().unwrap();
        let err = FsGlob::new(dir.path()).resolve("src/[", None).unwrap_err();
        assert!(matches!(err, GenerateError::Glob { .. }));
    }
}
