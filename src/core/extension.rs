//! Extensions and kind dispatch
//!
//! An extension attaches to a phase once ([`Extension::apply_to_phase`]) and
//! may act on the phase's executor every time its command is finalized
//! ([`Extension::apply_to_executor`]), but only for the kind tags it declares
//! in [`Extension::executor_kinds`]. The per-phase [`KindDispatch`] table maps
//! each tag to the extensions that handle it, in attachment order.

use std::collections::BTreeMap;
use std::fmt;

use crate::core::executor::{Executor, Kind};
use crate::core::phase::{Phase, PhaseRef};
use crate::core::value::EvalContext;
use crate::error::{CapabilityError, Result};

/// A capability attached to a phase
pub trait Extension: fmt::Debug + Send + Sync {
    /// Identity used for private phase state and in error messages
    fn name(&self) -> &str;

    /// Kinds the phase's executor must declare for this extension to apply
    fn required_kinds(&self) -> Vec<Kind> {
        Vec::new()
    }

    /// Kinds this extension has an executor action for
    fn executor_kinds(&self) -> Vec<Kind> {
        Vec::new()
    }

    /// Structural changes to the phase, run once at attachment
    fn apply_to_phase(&self, _phase: &mut Phase) -> Result<()> {
        Ok(())
    }

    /// Executor changes for `kind`, run at every finalize
    fn apply_to_executor(
        &self,
        _kind: &Kind,
        _executor: &mut Executor,
        _ctx: &EvalContext<'_>,
    ) -> Result<()> {
        Ok(())
    }
}

/// Kind tag -> indices of the phase's extensions handling it
#[derive(Debug, Clone, Default)]
pub struct KindDispatch {
    table: BTreeMap<Kind, Vec<usize>>,
}

impl KindDispatch {
    /// Register the extension at `index` for each of `kinds`
    pub fn register(&mut self, index: usize, kinds: Vec<Kind>) {
        for kind in kinds {
            let entries = self.table.entry(kind).or_default();
            if !entries.contains(&index) {
                entries.push(index);
            }
        }
    }

    /// Actions applicable to an executor declaring `kinds`, ordered by
    /// attachment and then by the executor's kind order
    pub fn actions_for(&self, kinds: &[Kind]) -> Vec<(usize, Kind)> {
        let mut actions: Vec<(usize, usize, Kind)> = kinds
            .iter()
            .enumerate()
            .flat_map(|(kind_pos, kind)| {
                self.table
                    .get(kind)
                    .into_iter()
                    .flatten()
                    .map(move |&index| (index, kind_pos, kind.clone()))
            })
            .collect();
        actions.sort_by_key(|(index, kind_pos, _)| (*index, *kind_pos));
        actions
            .into_iter()
            .map(|(index, _, kind)| (index, kind))
            .collect()
    }

    /// Whether no kind has an action
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

/// Extension-private data stashed on a phase
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtensionState {
    /// Phases whose outputs the extension consumes
    pub refs: Vec<PhaseRef>,
}

/// Fail unless `executor` declares every kind `extension` requires
pub fn check_required_kinds(
    extension: &dyn Extension,
    executor: &Executor,
    phase: &str,
) -> Result<(), CapabilityError> {
    for kind in extension.required_kinds() {
        if !executor.has_kind(&kind) {
            return Err(CapabilityError::KindMismatch {
                extension: extension.name().to_string(),
                kind: kind.to_string(),
                phase: phase.to_string(),
                declared: executor.kinds().iter().map(ToString::to_string).collect(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_actions_follow_attachment_order() {
        let mut dispatch = KindDispatch::default();
        dispatch.register(1, vec![Kind::from("java_jar")]);
        dispatch.register(0, vec![Kind::from("java_jar"), Kind::from("zip")]);
        dispatch.register(2, vec![Kind::from("gcc_link")]);

        let actions = dispatch.actions_for(&[Kind::from("zip"), Kind::from("java_jar")]);
        let order: Vec<(usize, &str)> = actions
            .iter()
            .map(|(index, kind)| (*index, kind.as_str()))
            .collect();

        assert_eq!(order, vec![(0, "zip"), (0, "java_jar"), (1, "java_jar")]);
    }

    #[test]
    fn test_no_actions_for_undeclared_kinds() {
        let mut dispatch = KindDispatch::default();
        dispatch.register(0, vec![Kind::from("java_jar")]);
        assert!(dispatch.actions_for(&[Kind::from("java_compile")]).is_empty());
        assert!(dispatch.actions_for(&[]).is_empty());
    }
}
