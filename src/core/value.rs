//! Literal-or-deferred values
//!
//! Two flavours of lazy value exist:
//!
//! - [`Lazy`] is a function of the configuration store only. Commands,
//!   arguments and classpath entries use it.
//! - [`Var`] is a phase variable, a function of the statement's output and
//!   inputs evaluated with an [`EvalContext`] at generation time.
//!
//! Neither is memoized: every generation pass evaluates again against the
//! configuration active at that point.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::core::outputs::{Artifact, OutputRegistry};
use crate::core::phase::{Phase, PhaseRef};
use crate::core::store::ConfigStore;
use crate::error::{GenerateError, Result};

/// Deferred function of the configuration store
pub type LazyFn = Arc<dyn Fn(&ConfigStore) -> String + Send + Sync>;

/// Deferred function of `(output, inputs)` for a phase variable
pub type VarFn =
    Arc<dyn Fn(&EvalContext<'_>, &Artifact, &[Artifact]) -> Result<String> + Send + Sync>;

/// A string known now or computed from the configuration later
#[derive(Clone)]
pub enum Lazy {
    /// Literal value
    Literal(String),
    /// Computed from the active configuration
    Deferred(LazyFn),
}

impl Lazy {
    /// Wrap a function of the configuration store
    pub fn deferred(f: impl Fn(&ConfigStore) -> String + Send + Sync + 'static) -> Self {
        Self::Deferred(Arc::new(f))
    }

    /// Evaluate against the active configuration
    pub fn resolve(&self, store: &ConfigStore) -> String {
        match self {
            Self::Literal(value) => value.clone(),
            Self::Deferred(f) => f(store),
        }
    }

    /// The literal value, if this is not deferred
    pub fn as_literal(&self) -> Option<&str> {
        match self {
            Self::Literal(value) => Some(value),
            Self::Deferred(_) => None,
        }
    }
}

impl fmt::Debug for Lazy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(value) => f.debug_tuple("Literal").field(value).finish(),
            Self::Deferred(_) => f.write_str("Deferred(..)"),
        }
    }
}

impl From<&str> for Lazy {
    fn from(value: &str) -> Self {
        Self::Literal(value.to_string())
    }
}

impl From<String> for Lazy {
    fn from(value: String) -> Self {
        Self::Literal(value)
    }
}

impl From<&Path> for Lazy {
    fn from(value: &Path) -> Self {
        Self::Literal(value.display().to_string())
    }
}

impl From<PathBuf> for Lazy {
    fn from(value: PathBuf) -> Self {
        Self::Literal(value.display().to_string())
    }
}

/// A phase variable binding
#[derive(Clone)]
pub enum Var {
    /// Literal value
    Literal(String),
    /// Computed per build statement
    Deferred(VarFn),
}

impl Var {
    /// Wrap a function of `(context, output, inputs)`
    pub fn deferred<F>(f: F) -> Self
    where
        F: Fn(&EvalContext<'_>, &Artifact, &[Artifact]) -> Result<String> + Send + Sync + 'static,
    {
        Self::Deferred(Arc::new(f))
    }

    /// The literal value, if this is not deferred
    pub fn as_literal(&self) -> Option<&str> {
        match self {
            Self::Literal(value) => Some(value),
            Self::Deferred(_) => None,
        }
    }

    /// Evaluate for one build statement
    pub fn resolve(
        &self,
        ctx: &EvalContext<'_>,
        output: &Artifact,
        inputs: &[Artifact],
    ) -> Result<String> {
        match self {
            Self::Literal(value) => Ok(value.clone()),
            Self::Deferred(f) => f(ctx, output, inputs),
        }
    }
}

impl fmt::Debug for Var {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(value) => f.debug_tuple("Literal").field(value).finish(),
            Self::Deferred(_) => f.write_str("Deferred(..)"),
        }
    }
}

impl From<&str> for Var {
    fn from(value: &str) -> Self {
        Self::Literal(value.to_string())
    }
}

impl From<String> for Var {
    fn from(value: String) -> Self {
        Self::Literal(value)
    }
}

/// What a deferred variable can see while it is evaluated
#[derive(Debug, Clone, Copy)]
pub struct EvalContext<'a> {
    /// Configuration, with the phase scope active
    pub store: &'a ConfigStore,
    /// Outputs recorded so far in this pass
    pub outputs: &'a OutputRegistry,
    /// Name of the project being generated
    pub project: &'a str,
    /// The phase being generated
    pub phase: &'a Phase,
    /// The phase's output directory
    pub output_dir: &'a Path,
}

impl<'a> EvalContext<'a> {
    /// Outputs of a referenced phase. A phase that has not been generated yet
    /// contributes nothing.
    pub fn outputs_of(&self, reference: &PhaseRef) -> &'a [Artifact] {
        let project = reference.project_or(self.project);
        let outputs = self.outputs.get(project, reference.phase());
        if !self.outputs.contains(project, reference.phase()) {
            tracing::debug!(
                "Phase '{}' references {}/{} before it was generated; using no outputs",
                self.phase.name(),
                project,
                reference.phase()
            );
        }
        outputs
    }
}

/// Evaluate every binding for one build statement, in name order
pub fn resolve_vars(
    bindings: &BTreeMap<String, Var>,
    ctx: &EvalContext<'_>,
    output: &Artifact,
    inputs: &[Artifact],
) -> Result<BTreeMap<String, String>> {
    bindings
        .iter()
        .map(|(name, var)| {
            let value = var.resolve(ctx, output, inputs).map_err(|e| GenerateError::Variable {
                phase: ctx.phase.name().to_string(),
                name: name.clone(),
                error: e.to_string(),
            })?;
            Ok((name.clone(), value))
        })
        .collect()
}
