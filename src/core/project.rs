//! Projects
//!
//! A project is a named, ordered collection of phases. Its name is the
//! project half of every output registry key.

use crate::core::phase::Phase;
use crate::core::resolver::DependencyGraph;
use crate::error::GenerateError;

/// A named collection of phases
#[derive(Debug)]
pub struct Project {
    name: String,
    variant: Option<String>,
    phases: Vec<Phase>,
}

impl Project {
    /// Create an empty project
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            variant: None,
            phases: Vec::new(),
        }
    }

    /// Set the build variant (e.g. `debug`, `release`)
    #[must_use]
    pub fn with_variant(mut self, variant: impl Into<String>) -> Self {
        self.variant = Some(variant.into());
        self
    }

    /// Add a phase
    pub fn with_phase(mut self, phase: Phase) -> Result<Self, GenerateError> {
        self.add_phase(phase)?;
        Ok(self)
    }

    /// Project name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Build variant, if set
    pub fn variant(&self) -> Option<&str> {
        self.variant.as_deref()
    }

    /// Add a phase; names are unique within a project
    pub fn add_phase(&mut self, phase: Phase) -> Result<(), GenerateError> {
        if self.phase(phase.name()).is_some() {
            return Err(GenerateError::DuplicatePhase {
                project: self.name.clone(),
                phase: phase.name().to_string(),
            });
        }
        self.phases.push(phase);
        Ok(())
    }

    /// Look up a phase by name
    pub fn phase(&self, name: &str) -> Option<&Phase> {
        self.phases.iter().find(|p| p.name() == name)
    }

    /// Mutable lookup, e.g. to attach extensions after declaration
    pub fn phase_mut(&mut self, name: &str) -> Option<&mut Phase> {
        self.phases.iter_mut().find(|p| p.name() == name)
    }

    /// Phases in declaration order
    pub fn phases(&self) -> &[Phase] {
        &self.phases
    }

    /// Phases in generation order: each phase after the local phases it takes
    /// inputs from or rebuilds on, declaration order otherwise
    pub fn build_order(&self) -> Result<Vec<&Phase>, GenerateError> {
        let mut graph = DependencyGraph::new();
        for phase in &self.phases {
            let dependencies = phase
                .inputs_from()
                .iter()
                .chain(phase.rebuild_on_from())
                .filter(|reference| reference.is_within(&self.name))
                .map(|reference| reference.phase().to_string())
                .collect();
            graph.add_phase(phase.name(), dependencies);
        }

        let order = graph.topological_sort()?;
        Ok(order.iter().filter_map(|name| self.phase(name)).collect())
    }
}
