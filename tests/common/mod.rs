//! Common test utilities and helpers
//!
//! This module provides shared utilities for integration tests.

use std::path::PathBuf;
use tempfile::TempDir;

/// Test project context
///
/// Creates a temporary directory for test projects and provides
/// utilities for setting up test scenarios.
pub struct TestProject {
    /// Temporary directory for the test project
    pub dir: TempDir,
}

#[allow(dead_code)]
impl TestProject {
    /// Create a new test project in a temporary directory
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("Failed to create temp directory"),
        }
    }

    /// Get the path to the test project directory
    pub fn path(&self) -> PathBuf {
        self.dir.path().to_path_buf()
    }

    /// Create a file in the test project
    pub fn create_file(&self, name: &str, content: &str) {
        let path = self.dir.path().join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("Failed to create parent directories");
        }
        std::fs::write(path, content).expect("Failed to write file");
    }

    /// Create a directory in the test project
    pub fn create_dir(&self, name: &str) {
        let path = self.dir.path().join(name);
        std::fs::create_dir_all(path).expect("Failed to create directory");
    }

    /// Check if a file exists in the test project
    pub fn file_exists(&self, name: &str) -> bool {
        self.dir.path().join(name).exists()
    }

    /// Read a file from the test project
    pub fn read_file(&self, name: &str) -> String {
        std::fs::read_to_string(self.dir.path().join(name)).expect("Failed to read file")
    }

    /// Lay out the sample Java sources used by [`SAMPLE_MANIFEST`]
    pub fn with_java_sources(self) -> Self {
        self.create_file(
            "src/com/example/app/Main.java",
            "package com.example.app;\n\npublic class Main {}\n",
        );
        self.create_file(
            "src/com/example/util/Strings.java",
            "package com.example.util;\n\npublic class Strings {}\n",
        );
        self.create_file("src/README.md", "not a source file\n");
        self
    }
}

impl Default for TestProject {
    fn default() -> Self {
        Self::new()
    }
}

/// Sample manifest: compile Java sources, then jar the classes.
///
/// Commands contain a path separator so no `PATH` lookup happens.
#[allow(dead_code)]
pub const SAMPLE_MANIFEST: &str = r#"
[project]
name = "hello"

[config.java]
javac_command = "/usr/bin/javac"
jar_command = "/usr/bin/jar"

[[phase]]
name = "compile"
executor = "java_compile"
inputs = ["src/**/*.java"]
input_path = "src"

[[phase]]
name = "jar"
executor = "jar"
classes_from = ["compile"]
output = "${phase}-app"
"#;
