//! Phase ordering
//!
//! Computes a generation order in which every phase follows the phases it
//! references. Ties keep declaration order so the result is stable.

use std::collections::{HashMap, HashSet};

use crate::error::GenerateError;

/// Dependency graph over phase names
#[derive(Debug, Default)]
pub struct DependencyGraph {
    /// Adjacency list: phase -> phases it depends on
    edges: HashMap<String, Vec<String>>,
    /// Phases in declaration order
    nodes: Vec<String>,
}

impl DependencyGraph {
    /// Create a new empty dependency graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a phase and its dependencies. Dependencies on phases never added
    /// as nodes are ignored when sorting.
    pub fn add_phase(&mut self, name: &str, dependencies: Vec<String>) {
        if !self.edges.contains_key(name) {
            self.nodes.push(name.to_string());
        }
        self.edges.insert(name.to_string(), dependencies);
    }

    /// Compute topological sort (generation order)
    ///
    /// Returns phases in order such that dependencies come before dependents.
    pub fn topological_sort(&self) -> Result<Vec<String>, GenerateError> {
        let mut visited = HashSet::new();
        let mut temp_visited = HashSet::new();
        let mut result = Vec::new();
        let mut cycle_path = Vec::new();

        for node in &self.nodes {
            if !visited.contains(node) {
                self.visit(
                    node,
                    &mut visited,
                    &mut temp_visited,
                    &mut result,
                    &mut cycle_path,
                )?;
            }
        }

        Ok(result)
    }

    fn visit(
        &self,
        node: &str,
        visited: &mut HashSet<String>,
        temp_visited: &mut HashSet<String>,
        result: &mut Vec<String>,
        cycle_path: &mut Vec<String>,
    ) -> Result<(), GenerateError> {
        if temp_visited.contains(node) {
            cycle_path.push(node.to_string());
            return Err(GenerateError::CircularDependency {
                cycle: cycle_path.clone(),
            });
        }

        if visited.contains(node) {
            return Ok(());
        }

        temp_visited.insert(node.to_string());
        cycle_path.push(node.to_string());

        if let Some(deps) = self.edges.get(node) {
            for dep in deps.iter().filter(|dep| self.edges.contains_key(*dep)) {
                self.visit(dep, visited, temp_visited, result, cycle_path)?;
            }
        }

        cycle_path.pop();
        temp_visited.remove(node);
        visited.insert(node.to_string());
        result.push(node.to_string());

        Ok(())
    }

    /// Check if the graph has any cycles
    pub fn has_cycle(&self) -> bool {
        self.topological_sort().is_err()
    }
}
