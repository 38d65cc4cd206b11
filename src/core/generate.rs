//! Generation pipeline
//!
//! Walks a project's phases in dependency order and turns each into a
//! [`ResolvedPhase`]: the finalized command, one [`ResolvedBuild`] per build
//! statement, and the rebuild-on edges a build-file writer needs.
//!
//! Per phase:
//! 1. push a `phase:<name>` scope and set the `current.*` keys
//! 2. resolve inputs (recorded outputs of referenced phases first)
//! 3. fix the output directory and plan build statements
//! 4. evaluate variables per statement
//! 5. dispatch extensions and run hooks on a copy of the executor
//! 6. record the phase's outputs
//!
//! The scope is popped on every exit path. Outputs recorded before a failure
//! stay in the registry.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::Serialize;

use crate::config::keys::{BUILD_VARIANT, CURRENT_OUTPUT_PATH, CURRENT_PHASE, CURRENT_PROJECT};
use crate::core::executor::{CommandLine, HookContext};
use crate::core::outputs::{Artifact, OutputRegistry};
use crate::core::phase::Phase;
use crate::core::project::Project;
use crate::core::store::ConfigStore;
use crate::core::value::{resolve_vars, EvalContext, Var};
use crate::error::Result;
use crate::infra::executables::ExecutableResolver;
use crate::infra::glob::GlobResolver;

/// One build statement with its variables evaluated
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedBuild {
    /// Input paths
    pub inputs: Vec<PathBuf>,
    /// Output paths
    pub outputs: Vec<PathBuf>,
    /// Variables for this statement
    pub vars: BTreeMap<String, String>,
}

/// Everything a build-file writer needs for one phase
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedPhase {
    /// Project name
    pub project: String,
    /// Phase name
    pub phase: String,
    /// Finalized command line
    pub command: CommandLine,
    /// Build statements
    pub builds: Vec<ResolvedBuild>,
    /// Phases this phase rebuilds on (`phase` or `project/phase`)
    pub rebuild_on: Vec<String>,
    /// Extra files whose change triggers a rebuild: literal rebuild-on files,
    /// then the recorded outputs of rebuild-on phases
    pub implicit: Vec<PathBuf>,
    /// Output directory
    pub output_dir: PathBuf,
}

impl ResolvedPhase {
    /// All outputs of the phase, in statement order
    pub fn outputs(&self) -> impl Iterator<Item = &PathBuf> {
        self.builds.iter().flat_map(|build| build.outputs.iter())
    }
}

/// Drives generation passes against a configuration store
pub struct Generator<'a> {
    store: &'a mut ConfigStore,
    executables: &'a dyn ExecutableResolver,
    globber: &'a dyn GlobResolver,
    outputs: OutputRegistry,
}

impl<'a> Generator<'a> {
    /// Create a generator with an empty output registry
    pub fn new(
        store: &'a mut ConfigStore,
        executables: &'a dyn ExecutableResolver,
        globber: &'a dyn GlobResolver,
    ) -> Self {
        Self {
            store,
            executables,
            globber,
            outputs: OutputRegistry::new(),
        }
    }

    /// Generate every phase of `project` in build order.
    ///
    /// Several projects may be generated with one generator; later projects
    /// can then reference earlier projects' outputs.
    pub fn generate(&mut self, project: &Project) -> Result<Vec<ResolvedPhase>> {
        tracing::info!("Generating project: {}", project.name());
        let order = project.build_order()?;

        let Self {
            store,
            executables,
            globber,
            outputs,
        } = self;

        let mut scope = store.push_scope(format!("project:{}", project.name()));
        scope.set(CURRENT_PROJECT, project.name());
        // A variant already configured (`--set build.variant=..`) wins
        let configured = scope.get_str(BUILD_VARIANT).is_some_and(|v| !v.is_empty());
        if let Some(variant) = project.variant().filter(|_| !configured) {
            scope.set(BUILD_VARIANT, variant);
        }

        let mut resolved = Vec::with_capacity(order.len());
        for phase in order {
            resolved.push(generate_phase(
                &mut scope,
                *executables,
                *globber,
                outputs,
                project.name(),
                phase,
            )?);
        }

        tracing::info!(
            "Generated {} phase(s) for project '{}'",
            resolved.len(),
            project.name()
        );
        Ok(resolved)
    }

    /// Outputs recorded so far
    pub fn outputs(&self) -> &OutputRegistry {
        &self.outputs
    }

    /// Consume the generator, keeping the recorded outputs
    pub fn into_outputs(self) -> OutputRegistry {
        self.outputs
    }
}

/// Generate a single project with a fresh output registry
pub fn generate(
    project: &Project,
    store: &mut ConfigStore,
    executables: &dyn ExecutableResolver,
    globber: &dyn GlobResolver,
) -> Result<Vec<ResolvedPhase>> {
    Generator::new(store, executables, globber).generate(project)
}

fn generate_phase(
    store: &mut ConfigStore,
    executables: &dyn ExecutableResolver,
    globber: &dyn GlobResolver,
    outputs: &mut OutputRegistry,
    project: &str,
    phase: &Phase,
) -> Result<ResolvedPhase> {
    tracing::debug!("Generating phase: {}/{}", project, phase.name());

    let mut scope = store.push_scope(format!("phase:{}", phase.name()));
    scope.set(CURRENT_PHASE, phase.name());

    let inputs = phase.resolve_inputs(project, outputs, globber)?;
    let output_dir = phase.output_dir(&scope);
    scope.set(CURRENT_OUTPUT_PATH, output_dir.display().to_string());
    let targets = phase.plan_builds(&scope, &inputs, &output_dir)?;

    let store: &ConfigStore = &scope;
    let ctx = EvalContext {
        store,
        outputs,
        project,
        phase,
        output_dir: &output_dir,
    };

    let bindings: BTreeMap<String, Var> = phase
        .executor()
        .vars()
        .iter()
        .chain(phase.vars())
        .map(|(name, var)| (name.clone(), var.clone()))
        .collect();

    let builds = targets
        .iter()
        .map(|target| {
            Ok(ResolvedBuild {
                inputs: target.inputs.iter().map(|a| a.file.clone()).collect(),
                outputs: vec![target.output.file.clone()],
                vars: resolve_vars(&bindings, &ctx, &target.output, &target.inputs)?,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let mut executor = phase.executor().clone();
    phase.dispatch_to_executor(&mut executor, &ctx)?;
    let hook_ctx = HookContext {
        store,
        project,
        phase: phase.name(),
        input_path: phase.input_path(),
        output_dir: &output_dir,
        builds: &builds,
    };
    let command = executor.finalize(&hook_ctx, executables)?;
    tracing::debug!("Phase '{}' command: {}", phase.name(), command);

    let mut implicit: Vec<PathBuf> = phase.rebuild_on().to_vec();
    let mut rebuild_on = Vec::with_capacity(phase.rebuild_on_from().len());
    for reference in phase.rebuild_on_from() {
        implicit.extend(ctx.outputs_of(reference).iter().map(|a| a.file.clone()));
        rebuild_on.push(if reference.is_within(project) {
            reference.phase().to_string()
        } else {
            format!("{}/{}", reference.project_or(project), reference.phase())
        });
    }

    let recorded: Vec<Artifact> = targets.into_iter().map(|target| target.output).collect();
    outputs.record(project, phase.name(), recorded)?;

    Ok(ResolvedPhase {
        project: project.to_string(),
        phase: phase.name().to_string(),
        command,
        builds,
        rebuild_on,
        implicit,
        output_dir,
    })
}
