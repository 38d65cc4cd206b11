//! Error types for plinth
//!
//! Domain-specific error types using thiserror.

use std::path::PathBuf;
use thiserror::Error;

/// Configuration store errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A scope was popped without a matching push
    #[error("Scope stack underflow: pop_scope called with only the root scope active")]
    ScopeUnderflow,

    /// Required key missing and no default supplied
    #[error("Missing required configuration key '{key}'")]
    MissingKey { key: String },

    /// Value present but of the wrong type
    #[error("Configuration key '{key}' has invalid type: expected {expected}, got {got}")]
    InvalidType {
        key: String,
        expected: String,
        got: String,
    },

    /// Failed to read a configuration file
    #[error("Failed to read config file '{path}': {error}")]
    ReadError { path: String, error: String },

    /// Failed to parse a configuration file
    #[error("Failed to parse config file '{path}': {error}")]
    ParseError { path: String, error: String },

    /// Malformed `key=value` override
    #[error("Invalid override '{input}': expected KEY=VALUE")]
    InvalidOverride { input: String },
}

/// Extension/executor capability errors
#[derive(Error, Debug)]
pub enum CapabilityError {
    /// Executor does not declare a kind the extension needs
    #[error(
        "Extension '{extension}' requires executor kind '{kind}', but phase '{phase}' declares [{}]",
        declared.join(", ")
    )]
    KindMismatch {
        extension: String,
        kind: String,
        phase: String,
        declared: Vec<String>,
    },

    /// Executor has no argument list of the given name
    #[error("Executor has no '{capability}' capability required by extension '{extension}'")]
    MissingCapability {
        extension: String,
        capability: String,
    },
}

/// Command resolution errors
#[derive(Error, Debug)]
pub enum ResolveError {
    /// Executable resolver could not find the command
    #[error("Command '{command}' not found in PATH{}", configured_by(key.as_deref()))]
    CommandNotFound {
        command: String,
        key: Option<String>,
    },

    /// The command source resolved to an empty string
    #[error("Command resolved to an empty value{}", configured_by(key.as_deref()))]
    EmptyCommand { key: Option<String> },
}

fn configured_by(key: Option<&str>) -> String {
    key.map(|k| format!(" (configured by '{k}')"))
        .unwrap_or_default()
}

/// Generation pipeline errors
#[derive(Error, Debug)]
pub enum GenerateError {
    /// Two phases with the same name in one project
    #[error("Phase '{phase}' is already defined in project '{project}'")]
    DuplicatePhase { project: String, phase: String },

    /// Circular phase dependency
    #[error("Circular phase dependency detected: {}", cycle.join(" -> "))]
    CircularDependency { cycle: Vec<String> },

    /// Outputs recorded twice for the same phase in one pass
    #[error("Outputs for phase '{phase}' of project '{project}' were already recorded")]
    OutputsAlreadyRecorded { project: String, phase: String },

    /// Glob pattern could not be evaluated
    #[error("Invalid input pattern '{pattern}': {error}")]
    Glob { pattern: String, error: String },

    /// A deferred variable failed
    #[error("Failed to evaluate variable '{name}' of phase '{phase}': {error}")]
    Variable {
        phase: String,
        name: String,
        error: String,
    },

    /// Output template references an unknown name
    #[error("Output template '{template}' of phase '{phase}' references unknown name '{name}'")]
    Template {
        phase: String,
        template: String,
        name: String,
    },
}

/// Project manifest errors
#[derive(Error, Debug)]
pub enum ManifestError {
    /// Manifest file missing
    #[error("Manifest not found at '{path}'")]
    NotFound { path: PathBuf },

    /// Manifest could not be read
    #[error("Failed to read manifest '{path}': {error}")]
    ReadError { path: PathBuf, error: String },

    /// Manifest TOML is invalid
    #[error("Failed to parse manifest: {0}")]
    ParseError(String),

    /// Unknown executor family
    #[error("Phase '{phase}' uses unknown executor '{executor}'")]
    UnknownExecutor { phase: String, executor: String },

    /// Field not valid for the chosen executor
    #[error("Phase '{phase}': {message}")]
    InvalidPhase { phase: String, message: String },
}

/// Filesystem errors
#[derive(Error, Debug)]
pub enum FilesystemError {
    /// Failed to create directory
    #[error("Failed to create directory '{path}': {error}")]
    CreateDir { path: PathBuf, error: String },

    /// Failed to write file
    #[error("Failed to write file '{path}': {error}")]
    WriteFile { path: PathBuf, error: String },
}

/// Top-level plinth error type
#[derive(Error, Debug)]
pub enum PlinthError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Capability error
    #[error("Capability error: {0}")]
    Capability(#[from] CapabilityError),

    /// Resolution error
    #[error("Resolution error: {0}")]
    Resolve(#[from] ResolveError),

    /// Generation error
    #[error("Generation error: {0}")]
    Generate(#[from] GenerateError),

    /// Manifest error
    #[error("Manifest error: {0}")]
    Manifest(#[from] ManifestError),

    /// Filesystem error
    #[error("Filesystem error: {0}")]
    Filesystem(#[from] FilesystemError),

    /// Generic error
    #[error("{0}")]
    Generic(String),
}

/// Result alias used across the library
pub type Result<T, E = PlinthError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_not_found_mentions_key() {
        let err = ResolveError::CommandNotFound {
            command: "javac".to_string(),
            key: Some("java.javac_command".to_string()),
        };
        let msg = err.to_string();
        assert!(msg.contains("'javac'"));
        assert!(msg.contains("java.javac_command"));
    }

    #[test]
    fn test_command_not_found_without_key() {
        let err = ResolveError::CommandNotFound {
            command: "cp".to_string(),
            key: None,
        };
        assert_eq!(err.to_string(), "Command 'cp' not found in PATH");
    }

    #[test]
    fn test_kind_mismatch_lists_declared_kinds() {
        let err = CapabilityError::KindMismatch {
            extension: "java.classes".to_string(),
            kind: "java_jar".to_string(),
            phase: "compile".to_string(),
            declared: vec!["java_compile".to_string()],
        };
        assert!(err.to_string().contains("[java_compile]"));
    }

    #[test]
    fn test_wrapping_into_top_level() {
        let err: PlinthError = ConfigError::ScopeUnderflow.into();
        assert!(matches!(err, PlinthError::Config(ConfigError::ScopeUnderflow)));
    }
}
