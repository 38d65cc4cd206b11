//! Phases
//!
//! A phase is one build step: inputs (literal, globbed, or taken from other
//! phases' recorded outputs), an executor, variable bindings, rebuild-on
//! edges and attached extensions.
//!
//! Phases refer to each other by [`PhaseRef`] (project + phase name), resolved
//! through the output registry at generation time.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

use regex::Regex;
use serde::Serialize;

use crate::config::defaults::DEFAULT_OUTPUT_DIR;
use crate::config::keys::{BUILD_VARIANT, PATHS_OUTPUT};
use crate::core::executor::Executor;
use crate::core::extension::{check_required_kinds, Extension, ExtensionState, KindDispatch};
use crate::core::outputs::{Artifact, OutputRegistry};
use crate::core::store::ConfigStore;
use crate::core::value::{EvalContext, Var};
use crate::error::{GenerateError, PlinthError, Result};
use crate::infra::glob::GlobResolver;

/// `${name}` placeholders in output templates, compiled once
fn template_pattern() -> Result<&'static Regex> {
    static PATTERN: OnceLock<Result<Regex, regex::Error>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_.]*)\}"))
        .as_ref()
        .map_err(|e| PlinthError::Generic(format!("Invalid template pattern: {e}")))
}

/// Reference to a phase by name, optionally in another project
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct PhaseRef {
    project: Option<String>,
    phase: String,
}

impl PhaseRef {
    /// Phase in the same project as the referrer
    pub fn local(phase: impl Into<String>) -> Self {
        Self {
            project: None,
            phase: phase.into(),
        }
    }

    /// Phase in a named project
    pub fn in_project(project: impl Into<String>, phase: impl Into<String>) -> Self {
        Self {
            project: Some(project.into()),
            phase: phase.into(),
        }
    }

    /// Referenced phase name
    pub fn phase(&self) -> &str {
        &self.phase
    }

    /// Explicit project, if any
    pub fn project(&self) -> Option<&str> {
        self.project.as_deref()
    }

    /// Project name, defaulting to `current`
    pub fn project_or<'a>(&'a self, current: &'a str) -> &'a str {
        self.project.as_deref().unwrap_or(current)
    }

    /// Whether the reference points into `project`
    pub fn is_within(&self, project: &str) -> bool {
        self.project.as_deref().map_or(true, |p| p == project)
    }
}

impl From<&str> for PhaseRef {
    fn from(phase: &str) -> Self {
        Self::local(phase)
    }
}

/// One build statement before variables are resolved
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildTarget {
    /// Primary output
    pub output: Artifact,
    /// Inputs feeding this output
    pub inputs: Vec<Artifact>,
}

/// A named build step
#[derive(Debug)]
pub struct Phase {
    name: String,
    executor: Executor,
    inputs: Vec<Artifact>,
    input_patterns: Vec<String>,
    inputs_from: Vec<PhaseRef>,
    input_path: Option<PathBuf>,
    output_path: Option<PathBuf>,
    output: Option<String>,
    vars: BTreeMap<String, Var>,
    rebuild_on: Vec<PathBuf>,
    rebuild_on_from: Vec<PhaseRef>,
    extensions: Vec<Arc<dyn Extension>>,
    dispatch: KindDispatch,
    extension_state: BTreeMap<String, ExtensionState>,
}

impl Phase {
    /// Create a phase with no inputs
    pub fn new(name: impl Into<String>, executor: Executor) -> Self {
        Self {
            name: name.into(),
            executor,
            inputs: Vec::new(),
            input_patterns: Vec::new(),
            inputs_from: Vec::new(),
            input_path: None,
            output_path: None,
            output: None,
            vars: BTreeMap::new(),
            rebuild_on: Vec::new(),
            rebuild_on_from: Vec::new(),
            extensions: Vec::new(),
            dispatch: KindDispatch::default(),
            extension_state: BTreeMap::new(),
        }
    }

    /// Add literal input artifacts
    #[must_use]
    pub fn with_inputs(mut self, inputs: Vec<Artifact>) -> Self {
        self.inputs.extend(inputs);
        self
    }

    /// Add a glob pattern, expanded at generation time
    #[must_use]
    pub fn with_input_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.input_patterns.push(pattern.into());
        self
    }

    /// Take the outputs of another phase as inputs
    #[must_use]
    pub fn with_inputs_from(mut self, reference: impl Into<PhaseRef>) -> Self {
        self.inputs_from.push(reference.into());
        self
    }

    /// Base directory for literal inputs
    #[must_use]
    pub fn with_input_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.input_path = Some(path.into());
        self
    }

    /// Explicit output directory
    #[must_use]
    pub fn with_output_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_path = Some(path.into());
        self
    }

    /// Output name template (`${name}` placeholders)
    #[must_use]
    pub fn with_output(mut self, template: impl Into<String>) -> Self {
        self.output = Some(template.into());
        self
    }

    /// Bind a variable
    #[must_use]
    pub fn with_var(mut self, name: impl Into<String>, var: impl Into<Var>) -> Self {
        self.bind_variable(name, var);
        self
    }

    /// Rebuild when a file changes
    #[must_use]
    pub fn with_rebuild_on(mut self, path: impl Into<PathBuf>) -> Self {
        self.rebuild_on.push(path.into());
        self
    }

    /// Rebuild when another phase's outputs change
    #[must_use]
    pub fn with_rebuild_on_from(mut self, reference: impl Into<PhaseRef>) -> Self {
        self.add_rebuild_on_from(reference);
        self
    }

    /// Attach an extension
    pub fn with_extension(mut self, extension: Arc<dyn Extension>) -> Result<Self> {
        self.add_extension(extension)?;
        Ok(self)
    }

    /// Phase name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The phase's executor
    pub fn executor(&self) -> &Executor {
        &self.executor
    }

    /// Replace the executor. Extension requirements are re-checked at dispatch.
    pub fn set_executor(&mut self, executor: Executor) {
        self.executor = executor;
    }

    /// Literal inputs
    pub fn inputs(&self) -> &[Artifact] {
        &self.inputs
    }

    /// Input glob patterns
    pub fn input_patterns(&self) -> &[String] {
        &self.input_patterns
    }

    /// Phases whose outputs become inputs
    pub fn inputs_from(&self) -> &[PhaseRef] {
        &self.inputs_from
    }

    /// Base directory of literal inputs
    pub fn input_path(&self) -> Option<&Path> {
        self.input_path.as_deref()
    }

    /// Variable bindings
    pub fn vars(&self) -> &BTreeMap<String, Var> {
        &self.vars
    }

    /// Bind a variable; a later binding for the same name replaces it
    pub fn bind_variable(&mut self, name: impl Into<String>, var: impl Into<Var>) {
        self.vars.insert(name.into(), var.into());
    }

    /// Files that trigger a rebuild
    pub fn rebuild_on(&self) -> &[PathBuf] {
        &self.rebuild_on
    }

    /// Phases whose outputs trigger a rebuild
    pub fn rebuild_on_from(&self) -> &[PhaseRef] {
        &self.rebuild_on_from
    }

    /// Add a rebuild-on edge, ignoring duplicates
    pub fn add_rebuild_on_from(&mut self, reference: impl Into<PhaseRef>) {
        let reference = reference.into();
        if !self.rebuild_on_from.contains(&reference) {
            self.rebuild_on_from.push(reference);
        }
    }

    /// Attached extensions, in attachment order
    pub fn extensions(&self) -> &[Arc<dyn Extension>] {
        &self.extensions
    }

    /// Attach an extension: check its kind requirements, let it modify the
    /// phase, then register its executor actions.
    pub fn add_extension(&mut self, extension: Arc<dyn Extension>) -> Result<()> {
        check_required_kinds(extension.as_ref(), &self.executor, &self.name)?;
        extension.apply_to_phase(self)?;

        let index = self.extensions.len();
        self.dispatch.register(index, extension.executor_kinds());
        tracing::debug!(
            "Attached extension '{}' to phase '{}'",
            extension.name(),
            self.name
        );
        self.extensions.push(extension);
        Ok(())
    }

    /// Private state of an extension
    pub fn extension_state(&self, extension: &str) -> Option<&ExtensionState> {
        self.extension_state.get(extension)
    }

    /// Private state of an extension, created on first access
    pub fn extension_state_mut(&mut self, extension: &str) -> &mut ExtensionState {
        self.extension_state
            .entry(extension.to_string())
            .or_default()
    }

    /// Run every applicable extension action against `executor`
    pub fn dispatch_to_executor(
        &self,
        executor: &mut Executor,
        ctx: &EvalContext<'_>,
    ) -> Result<()> {
        for extension in &self.extensions {
            check_required_kinds(extension.as_ref(), executor, &self.name)?;
        }
        for (index, kind) in self.dispatch.actions_for(executor.kinds()) {
            self.extensions[index].apply_to_executor(&kind, executor, ctx)?;
        }
        Ok(())
    }

    /// Inputs for this pass: referenced phases' outputs in reference order,
    /// then globbed inputs, then literal inputs
    pub fn resolve_inputs(
        &self,
        project: &str,
        outputs: &OutputRegistry,
        globber: &dyn GlobResolver,
    ) -> Result<Vec<Artifact>> {
        let mut inputs = Vec::new();
        for reference in &self.inputs_from {
            let from_project = reference.project_or(project);
            if !outputs.contains(from_project, reference.phase()) {
                tracing::debug!(
                    "Phase '{}' takes inputs from {}/{} which has not been generated",
                    self.name,
                    from_project,
                    reference.phase()
                );
            }
            inputs.extend_from_slice(outputs.get(from_project, reference.phase()));
        }
        for pattern in &self.input_patterns {
            inputs.extend(globber.resolve(pattern, self.input_path.as_deref())?);
        }
        inputs.extend(self.inputs.iter().cloned());
        Ok(inputs)
    }

    /// Output directory: explicit `output_path`, else
    /// `<paths.output>[/<variant>]/<type dir>[/<phase>]`
    pub fn output_dir(&self, store: &ConfigStore) -> PathBuf {
        if let Some(path) = &self.output_path {
            return path.clone();
        }
        let mut dir = PathBuf::from(
            store
                .get_str(PATHS_OUTPUT)
                .unwrap_or(DEFAULT_OUTPUT_DIR),
        );
        if let Some(variant) = store.get_str(BUILD_VARIANT).filter(|v| !v.is_empty()) {
            dir.push(variant);
        }
        let output_type = self.executor.output_type();
        dir.push(output_type.dir_name());
        if output_type.per_input() {
            dir.push(&self.name);
        }
        dir
    }

    /// Output name from the template, defaulting to the phase name
    pub fn compute_output_path(&self, store: &ConfigStore) -> Result<String> {
        let Some(template) = &self.output else {
            return Ok(self.name.clone());
        };

        let re = template_pattern()?;

        let mut last_end = 0;
        let mut output = String::new();
        for cap in re.captures_iter(template) {
            let (Some(full_match), Some(name)) = (cap.get(0), cap.get(1)) else {
                continue;
            };
            output.push_str(&template[last_end..full_match.start()]);
            output.push_str(&self.template_value(name.as_str(), template, store)?);
            last_end = full_match.end();
        }
        output.push_str(&template[last_end..]);
        Ok(output)
    }

    fn template_value(&self, name: &str, template: &str, store: &ConfigStore) -> Result<String> {
        let literal = self
            .vars
            .get(name)
            .or_else(|| self.executor.vars().get(name))
            .and_then(Var::as_literal);
        if let Some(value) = literal {
            return Ok(value.to_string());
        }
        if name == "phase" {
            return Ok(self.name.clone());
        }
        if let Some(value) = store.get(name) {
            return Ok(value.as_str().map_or_else(|| value.to_string(), str::to_string));
        }
        Err(GenerateError::Template {
            phase: self.name.clone(),
            template: template.to_string(),
            name: name.to_string(),
        }
        .into())
    }

    /// Build statements for resolved inputs: one per input for per-input
    /// executors, otherwise a single statement over all inputs
    pub fn plan_builds(
        &self,
        store: &ConfigStore,
        inputs: &[Artifact],
        output_dir: &Path,
    ) -> Result<Vec<BuildTarget>> {
        let extension = self.executor.output_extension();

        if self.executor.output_type().per_input() {
            return Ok(inputs
                .iter()
                .map(|input| {
                    let relative = input
                        .relative()
                        .map(Path::to_path_buf)
                        .or_else(|| input.file.file_name().map(PathBuf::from))
                        .unwrap_or_else(|| input.file.clone());
                    let mut file = output_dir.join(relative);
                    if let Some(ext) = extension {
                        file.set_extension(ext);
                    }
                    BuildTarget {
                        output: Artifact::new(file, output_dir),
                        inputs: vec![input.clone()],
                    }
                })
                .collect());
        }

        let name = self.compute_output_path(store)?;
        let file_name = match extension {
            Some(ext) if !name.ends_with(&format!(".{ext}")) => format!("{name}.{ext}"),
            _ => name,
        };
        Ok(vec![BuildTarget {
            output: Artifact::new(output_dir.join(file_name), output_dir),
            inputs: inputs.to_vec(),
        }])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::executor::{CommandSource, OutputType};

    struct NoGlob;

    impl GlobResolver for NoGlob {
        fn resolve(
            &self,
            pattern: &str,
            _base: Option<&Path>,
        ) -> std::result::Result<Vec<Artifact>, GenerateError> {
            Ok(vec![Artifact::new(format!("src/{pattern}"), "src")])
        }
    }

    fn object_executor() -> Executor {
        Executor::new(CommandSource::literal("cc")).with_output(OutputType::Object, Some("o"))
    }

    fn binary_executor() -> Executor {
        Executor::new(CommandSource::literal("ld")).with_output(OutputType::Binary, None)
    }

    #[test]
    fn test_inputs_from_come_first_in_recorded_order() {
        let mut outputs = OutputRegistry::new();
        outputs
            .record(
                "app",
                "compile",
                vec![
                    Artifact::new("build/obj/b.o", "build/obj"),
                    Artifact::new("build/obj/a.o", "build/obj"),
                ],
            )
            .unwrap();

        let phase = Phase::new("link", binary_executor())
            .with_inputs_from("compile")
            .with_input_pattern("main.o")
            .with_inputs(vec![Artifact::from_file("lib/extra.o")]);
        let inputs = phase.resolve_inputs("app", &outputs, &NoGlob).unwrap();

        let files: Vec<_> = inputs.iter().map(|a| a.file.display().to_string()).collect();
        assert_eq!(
            files,
            vec!["build/obj/b.o", "build/obj/a.o", "src/main.o", "lib/extra.o"]
        );
    }

    #[test]
    fn test_unresolved_reference_contributes_nothing() {
        let phase = Phase::new("link", binary_executor()).with_inputs_from("compile");
        let inputs = phase
            .resolve_inputs("app", &OutputRegistry::new(), &NoGlob)
            .unwrap();
        assert!(inputs.is_empty());
    }

    #[test]
    fn test_last_binding_wins() {
        let phase = Phase::new("p", binary_executor())
            .with_var("flags", "-O0")
            .with_var("flags", "-O2");
        assert_eq!(phase.vars()["flags"].as_literal(), Some("-O2"));
    }

    #[test]
    fn test_output_dir_layout() {
        let mut store = ConfigStore::new();
        let compile = Phase::new("compile", object_executor());
        let link = Phase::new("link", binary_executor());
        assert_eq!(compile.output_dir(&store), PathBuf::from("build/obj/compile"));
        assert_eq!(link.output_dir(&store), PathBuf::from("build/bin"));

        store.set(PATHS_OUTPUT, "out");
        store.set(BUILD_VARIANT, "debug");
        assert_eq!(link.output_dir(&store), PathBuf::from("out/debug/bin"));

        let explicit = Phase::new("x", binary_executor()).with_output_path("dist");
        assert_eq!(explicit.output_dir(&store), PathBuf::from("dist"));
    }

    #[test]
    fn test_output_template() {
        let mut store = ConfigStore::new();
        store.set("project.version", "1.2");
        let phase = Phase::new("jar", binary_executor())
            .with_output("${name}-${project.version}")
            .with_var("name", "hello");
        assert_eq!(phase.compute_output_path(&store).unwrap(), "hello-1.2");

        let unnamed = Phase::new("jar", binary_executor());
        assert_eq!(unnamed.compute_output_path(&store).unwrap(), "jar");

        let broken = Phase::new("jar", binary_executor()).with_output("${missing}");
        assert!(matches!(
            broken.compute_output_path(&store),
            Err(PlinthError::Generate(GenerateError::Template { .. }))
        ));
    }

    #[test]
    fn test_template_pattern_is_shared() {
        let first = template_pattern().unwrap();
        let second = template_pattern().unwrap();
        assert!(std::ptr::eq(first, second));
        assert!(first.is_match("${phase}-app"));
        assert!(!first.is_match("$phase"));
    }

    #[test]
    fn test_plan_per_input_builds() {
        let store = ConfigStore::new();
        let phase = Phase::new("compile", object_executor());
        let inputs = vec![
            Artifact::new("src/x/a.c", "src"),
            Artifact::new("src/b.c", "src"),
        ];
        let builds = phase
            .plan_builds(&store, &inputs, Path::new("build/obj/compile"))
            .unwrap();

        assert_eq!(builds.len(), 2);
        assert_eq!(builds[0].output.file, PathBuf::from("build/obj/compile/x/a.o"));
        assert_eq!(builds[0].output.dir, PathBuf::from("build/obj/compile"));
        assert_eq!(builds[1].inputs, vec![inputs[1].clone()]);
    }

    #[test]
    fn test_plan_single_build() {
        let store = ConfigStore::new();
        let exec = Executor::new(CommandSource::literal("jar"))
            .with_output(OutputType::Binary, Some("jar"));
        let phase = Phase::new("jar", exec).with_output("hello");
        let builds = phase.plan_builds(&store, &[], Path::new("build/bin")).unwrap();

        assert_eq!(builds.len(), 1);
        assert_eq!(builds[0].output.file, PathBuf::from("build/bin/hello.jar"));
        assert!(builds[0].inputs.is_empty());
    }

    #[test]
    fn test_rebuild_on_from_is_deduplicated() {
        let phase = Phase::new("jar", binary_executor())
            .with_rebuild_on_from("compile")
            .with_rebuild_on_from("compile")
            .with_rebuild_on_from(PhaseRef::in_project("lib", "compile"));
        assert_eq!(phase.rebuild_on_from().len(), 2);
    }
}
