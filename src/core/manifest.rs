//! Manifest (plinth.toml) parsing
//!
//! The manifest declares one project: its name, root-scope configuration and
//! an ordered list of phases. Paths in the manifest are relative to the
//! manifest's directory.
//!
//! ```toml
//! [project]
//! name = "hello"
//!
//! [config.java]
//! javac_command = "javac"
//!
//! [[phase]]
//! name = "compile"
//! executor = "java_compile"
//! inputs = ["src/**/*.java"]
//! input_path = "src"
//!
//! [[phase]]
//! name = "jar"
//! executor = "jar"
//! classes_from = ["compile"]
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::core::executor::{CommandSource, Executor, OutputType};
use crate::core::phase::{Phase, PhaseRef};
use crate::core::project::Project;
use crate::core::store::Scope;
use crate::error::{ManifestError, Result};
use crate::toolchains::java::{Classpath, ClasspathFrom, Jar, JavaClasses, JavaCompile};

/// The project manifest (plinth.toml)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Manifest {
    /// Project configuration
    pub project: ProjectConfig,

    /// Root-scope configuration; nested tables become dotted keys
    #[serde(default)]
    pub config: toml::Table,

    /// Phases in declaration order
    #[serde(default, rename = "phase")]
    pub phases: Vec<PhaseConfig>,
}

/// Project-level configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProjectConfig {
    /// Project name
    pub name: String,

    /// Build variant (e.g. `debug`, `release`)
    #[serde(default)]
    pub variant: Option<String>,
}

/// One `[[phase]]` entry
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PhaseConfig {
    /// Phase name, unique within the project
    pub name: String,

    /// Executor family: `java_compile`, `jar` or `command`
    #[serde(default = "default_executor")]
    pub executor: String,

    /// Command; required for `command`, overrides the configured tool otherwise
    #[serde(default)]
    pub command: Option<String>,

    /// Extra arguments, passed through verbatim (`$in`, `$out`, ...)
    #[serde(default)]
    pub args: Vec<String>,

    /// Input glob patterns
    #[serde(default)]
    pub inputs: Vec<String>,

    /// Base directory of the inputs
    #[serde(default)]
    pub input_path: Option<PathBuf>,

    /// Phases whose outputs become inputs (`phase` or `project/phase`)
    #[serde(default)]
    pub inputs_from: Vec<String>,

    /// Output name template
    #[serde(default)]
    pub output: Option<String>,

    /// Explicit output directory
    #[serde(default)]
    pub output_path: Option<PathBuf>,

    /// `object`, `binary`, `library` or `source`
    #[serde(default)]
    pub output_type: Option<String>,

    /// Output file extension, without the dot
    #[serde(default)]
    pub output_extension: Option<String>,

    /// Extra kind tags for the executor
    #[serde(default)]
    pub kinds: Vec<String>,

    /// Literal variables
    #[serde(default)]
    pub vars: BTreeMap<String, String>,

    /// Files that trigger a rebuild
    #[serde(default)]
    pub rebuild_on: Vec<PathBuf>,

    /// Phases whose outputs trigger a rebuild
    #[serde(default)]
    pub rebuild_on_from: Vec<String>,

    /// Extra classpath entries (`java_compile`)
    #[serde(default)]
    pub classpath: Vec<String>,

    /// Phases whose classes are bundled (`jar`)
    #[serde(default)]
    pub classes_from: Vec<String>,

    /// Phases whose outputs join the classpath (`java_compile`)
    #[serde(default)]
    pub classpath_from: Vec<String>,

    /// Jar manifest file (`jar`)
    #[serde(default)]
    pub manifest: Option<PathBuf>,

    /// Store without compression (`jar`)
    #[serde(default)]
    pub store_only: bool,
}

fn default_executor() -> String {
    "command".to_string()
}

impl Manifest {
    /// Load a manifest from a file
    pub fn load(path: &Path) -> Result<Self, ManifestError> {
        if !path.exists() {
            return Err(ManifestError::NotFound {
                path: path.to_path_buf(),
            });
        }
        let content = std::fs::read_to_string(path).map_err(|e| ManifestError::ReadError {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;
        Self::from_toml(&content)
    }

    /// Parse a manifest from TOML text
    pub fn from_toml(content: &str) -> Result<Self, ManifestError> {
        toml::from_str(content).map_err(|e| ManifestError::ParseError(e.to_string()))
    }

    /// Serialize the manifest to TOML
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    /// The `[config]` table as a scope named after the manifest
    pub fn config_scope(&self) -> Scope {
        let mut scope = Scope::new("manifest");
        scope.merge_table(&self.config);
        scope
    }

    /// Build the project. Relative paths are resolved against `root`.
    pub fn into_project(&self, root: &Path) -> Result<Project> {
        let mut project = Project::new(&self.project.name);
        if let Some(variant) = &self.project.variant {
            project = project.with_variant(variant);
        }
        for config in &self.phases {
            project.add_phase(config.to_phase(root)?)?;
        }
        Ok(project)
    }
}

impl PhaseConfig {
    /// Build the phase, attaching the extensions its options call for
    pub fn to_phase(&self, root: &Path) -> Result<Phase> {
        let mut phase = Phase::new(&self.name, self.build_executor(root)?);

        for pattern in &self.inputs {
            phase = phase.with_input_pattern(pattern);
        }
        if let Some(input_path) = &self.input_path {
            phase = phase.with_input_path(root.join(input_path));
        }
        for reference in &self.inputs_from {
            phase = phase.with_inputs_from(parse_phase_ref(reference));
        }
        if let Some(output) = &self.output {
            phase = phase.with_output(output);
        }
        if let Some(output_path) = &self.output_path {
            phase = phase.with_output_path(root.join(output_path));
        }
        for (name, value) in &self.vars {
            phase = phase.with_var(name, value.as_str());
        }
        for file in &self.rebuild_on {
            phase = phase.with_rebuild_on(root.join(file));
        }
        for reference in &self.rebuild_on_from {
            phase = phase.with_rebuild_on_from(parse_phase_ref(reference));
        }

        if !self.classpath.is_empty() {
            let entries = self.classpath.iter().map(|entry| root.join(entry));
            phase = phase.with_extension(Arc::new(Classpath::new(entries)))?;
        }
        for reference in &self.classpath_from {
            phase = phase.with_extension(Arc::new(ClasspathFrom::new(parse_phase_ref(reference))))?;
        }
        for reference in &self.classes_from {
            phase = phase.with_extension(Arc::new(JavaClasses::new(parse_phase_ref(reference))))?;
        }
        Ok(phase)
    }

    fn build_executor(&self, root: &Path) -> Result<Executor, ManifestError> {
        let mut executor = match self.executor.as_str() {
            "java_compile" => {
                self.reject_jar_options()?;
                let mut compile = JavaCompile::new();
                if let Some(command) = &self.command {
                    compile = compile.with_command(command);
                }
                compile.into_executor()
            }
            "jar" => {
                let mut jar = Jar::new();
                if let Some(command) = &self.command {
                    jar = jar.with_command(command);
                }
                if let Some(manifest) = &self.manifest {
                    jar = jar.with_manifest(root.join(manifest));
                }
                if self.store_only {
                    jar = jar.store_only();
                }
                jar.into_executor()
            }
            "command" => {
                self.reject_jar_options()?;
                let command = self
                    .command
                    .as_deref()
                    .filter(|c| !c.is_empty())
                    .ok_or_else(|| self.invalid("executor 'command' requires a 'command'"))?;
                Executor::new(CommandSource::literal(command))
            }
            other => {
                return Err(ManifestError::UnknownExecutor {
                    phase: self.name.clone(),
                    executor: other.to_string(),
                })
            }
        };

        for kind in &self.kinds {
            executor = executor.with_kind(kind.as_str());
        }
        for arg in &self.args {
            executor.add_argument_unfiltered(arg.as_str());
        }

        if self.output_type.is_some() || self.output_extension.is_some() {
            let output_type = match &self.output_type {
                Some(name) => name
                    .parse::<OutputType>()
                    .map_err(|message| self.invalid(&message))?,
                None => executor.output_type(),
            };
            let extension = self
                .output_extension
                .clone()
                .or_else(|| executor.output_extension().map(str::to_string));
            executor = executor.with_output(output_type, extension.as_deref());
        }
        Ok(executor)
    }

    fn reject_jar_options(&self) -> Result<(), ManifestError> {
        if self.manifest.is_some() || self.store_only {
            return Err(self.invalid(&format!(
                "'manifest' and 'store_only' only apply to the 'jar' executor, not '{}'",
                self.executor
            )));
        }
        Ok(())
    }

    fn invalid(&self, message: &str) -> ManifestError {
        ManifestError::InvalidPhase {
            phase: self.name.clone(),
            message: message.to_string(),
        }
    }
}

/// `phase` or `project/phase`
pub fn parse_phase_ref(value: &str) -> PhaseRef {
    match value.split_once('/') {
        Some((project, phase)) if !project.is_empty() => PhaseRef::in_project(project, phase),
        Some((_, phase)) => PhaseRef::local(phase),
        None => PhaseRef::local(value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::defaults::MIN_PROPTEST_ITERATIONS;
    use crate::error::{CapabilityError, PlinthError};
    use crate::test_utils::generators::phase_ref;
    use proptest::prelude::*;

    const HELLO: &str = r#"
[project]
name = "hello"

[config]
build = { debug = true }

[config.java]
javac_command = "custom-javac"

[[phase]]
name = "compile"
executor = "java_compile"
inputs = ["src/**/*.java"]
input_path = "src"
classpath = ["lib/dep.jar"]

[[phase]]
name = "jar"
executor = "jar"
classes_from = ["compile"]
output = "${phase}-app"
"#;

    #[test]
    fn test_manifest_parses() {
        let manifest = Manifest::from_toml(HELLO).unwrap();
        assert_eq!(manifest.project.name, "hello");
        assert_eq!(manifest.phases.len(), 2);
        assert_eq!(manifest.phases[0].executor, "java_compile");
        assert_eq!(manifest.phases[1].classes_from, vec!["compile"]);
    }

    #[test]
    fn test_config_flattens_to_dotted_keys() {
        let scope = Manifest::from_toml(HELLO).unwrap().config_scope();
        assert_eq!(
            scope.get("java.javac_command").and_then(toml::Value::as_str),
            Some("custom-javac")
        );
        assert_eq!(
            scope.get("build.debug").and_then(toml::Value::as_bool),
            Some(true)
        );
    }

    #[test]
    fn test_into_project() {
        let manifest = Manifest::from_toml(HELLO).unwrap();
        let project = manifest.into_project(Path::new("/work/hello")).unwrap();

        let compile = project.phase("compile").unwrap();
        assert_eq!(compile.input_path(), Some(Path::new("/work/hello/src")));
        assert_eq!(compile.extensions().len(), 1);

        let jar = project.phase("jar").unwrap();
        assert_eq!(jar.rebuild_on_from(), [PhaseRef::local("compile")]);
        assert!(jar.vars().contains_key("inputs"));
        assert_eq!(jar.executor().output_extension(), Some("jar"));
    }

    #[test]
    fn test_missing_project_name_fails() {
        let err = Manifest::from_toml("[project]\nversion = \"1\"\n").unwrap_err();
        assert!(matches!(err, ManifestError::ParseError(_)));
    }

    #[test]
    fn test_unknown_executor() {
        let manifest = Manifest::from_toml(
            "[project]\nname = \"x\"\n\n[[phase]]\nname = \"p\"\nexecutor = \"gcc\"\n",
        )
        .unwrap();
        let err = manifest.into_project(Path::new(".")).unwrap_err();
        assert!(matches!(
            err,
            PlinthError::Manifest(ManifestError::UnknownExecutor { .. })
        ));
    }

    #[test]
    fn test_command_executor_requires_command() {
        let manifest =
            Manifest::from_toml("[project]\nname = \"x\"\n\n[[phase]]\nname = \"p\"\n").unwrap();
        let err = manifest.into_project(Path::new(".")).unwrap_err();
        assert!(matches!(
            err,
            PlinthError::Manifest(ManifestError::InvalidPhase { .. })
        ));
    }

    #[test]
    fn test_command_executor_options() {
        let manifest = Manifest::from_toml(
            r#"
[project]
name = "x"

[[phase]]
name = "copy"
command = "cp"
args = ["$in", "$out"]
kinds = ["copy"]
output_type = "object"
output_extension = "bak"
vars = { mode = "fast" }
"#,
        )
        .unwrap();
        let project = manifest.into_project(Path::new(".")).unwrap();
        let executor = project.phase("copy").unwrap().executor();

        assert_eq!(executor.arguments().len(), 2);
        assert_eq!(executor.kinds()[0].as_str(), "copy");
        assert_eq!(executor.output_type(), OutputType::Object);
        assert_eq!(executor.output_extension(), Some("bak"));
    }

    #[test]
    fn test_bad_output_type() {
        let manifest = Manifest::from_toml(
            "[project]\nname = \"x\"\n\n[[phase]]\nname = \"p\"\ncommand = \"cp\"\noutput_type = \"archive\"\n",
        )
        .unwrap();
        assert!(manifest.into_project(Path::new(".")).is_err());
    }

    #[test]
    fn test_classes_from_on_compile_is_a_capability_error() {
        let manifest = Manifest::from_toml(
            "[project]\nname = \"x\"\n\n[[phase]]\nname = \"p\"\nexecutor = \"java_compile\"\nclasses_from = [\"q\"]\n",
        )
        .unwrap();
        let err = manifest.into_project(Path::new(".")).unwrap_err();
        assert!(matches!(
            err,
            PlinthError::Capability(CapabilityError::KindMismatch { .. })
        ));
    }

    #[test]
    fn test_parse_phase_ref() {
        assert_eq!(parse_phase_ref("compile"), PhaseRef::local("compile"));
        assert_eq!(
            parse_phase_ref("lib/compile"),
            PhaseRef::in_project("lib", "compile")
        );
        assert_eq!(parse_phase_ref("/compile"), PhaseRef::local("compile"));
    }

    #[test]
    fn test_manifest_roundtrip() {
        let manifest = Manifest::from_toml(HELLO).unwrap();
        let text = manifest.to_toml().unwrap();
        assert_eq!(Manifest::from_toml(&text).unwrap(), manifest);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(MIN_PROPTEST_ITERATIONS))]

        /// Qualified references keep their project, bare ones stay local
        #[test]
        fn prop_parse_phase_ref((project, phase) in phase_ref()) {
            let text = match &project {
                Some(project) => format!("{project}/{phase}"),
                None => phase.clone(),
            };
            let parsed = parse_phase_ref(&text);
            prop_assert_eq!(parsed.project(), project.as_deref());
            prop_assert_eq!(parsed.phase(), phase.as_str());
        }
    }
}
