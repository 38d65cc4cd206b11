//! Executable resolution
//!
//! Turns a bare command name into an invocable path. The system resolver
//! searches `PATH`; the map resolver gives hermetic results for tests and
//! for embedders that pin their toolchains.

use std::collections::BTreeMap;
use std::path::PathBuf;

/// Resolves bare command names to paths
pub trait ExecutableResolver {
    /// Absolute path of `command`, or `None` when it cannot be found
    fn resolve(&self, command: &str) -> Option<PathBuf>;
}

/// Searches the process `PATH`
#[derive(Debug, Clone, Copy, Default)]
pub struct PathResolver;

impl ExecutableResolver for PathResolver {
    fn resolve(&self, command: &str) -> Option<PathBuf> {
        which::which(command).ok()
    }
}

/// Fixed name -> path table
#[derive(Debug, Clone, Default)]
pub struct MapResolver {
    commands: BTreeMap<String, PathBuf>,
}

impl MapResolver {
    /// Create an empty resolver; every lookup fails
    pub fn new() -> Self {
        Self::default()
    }

    /// Map `command` to `path`
    #[must_use]
    pub fn with(mut self, command: &str, path: impl Into<PathBuf>) -> Self {
        self.commands.insert(command.to_string(), path.into());
        self
    }
}

impl ExecutableResolver for MapResolver {
    fn resolve(&self, command: &str) -> Option<PathBuf> {
        self.commands.get(command).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_resolver() {
        let resolver = MapResolver::new().with("javac", "/opt/jdk/bin/javac");
        assert_eq!(
            resolver.resolve("javac"),
            Some(PathBuf::from("/opt/jdk/bin/javac"))
        );
        assert!(resolver.resolve("jar").is_none());
    }

    #[test]
    fn test_path_resolver_misses_unknown_command() {
        assert!(PathResolver
            .resolve("plinth-surely-not-a-real-command")
            .is_none());
    }
}
