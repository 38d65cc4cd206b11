//! Test utilities for property-based testing
//!
//! This module provides generators and helpers for proptest.

#[cfg(test)]
pub mod generators {
    use proptest::prelude::*;

    /// Generate a valid project or phase name (lowercase alphanumeric with
    /// hyphens and underscores, no `/`)
    pub fn phase_name() -> impl Strategy<Value = String> {
        "[a-z][a-z0-9_-]{0,20}"
    }

    /// Generate a dotted configuration key such as `java.javac_command`
    pub fn config_key() -> impl Strategy<Value = String> {
        ("[a-z]{1,8}", "[a-z][a-z_]{0,12}").prop_map(|(section, name)| format!("{section}.{name}"))
    }

    /// Generate a plain string configuration value
    pub fn config_value() -> impl Strategy<Value = String> {
        "[A-Za-z0-9/._-]{0,24}"
    }

    /// Generate a phase reference, either local (`phase`) or qualified
    /// (`project/phase`)
    pub fn phase_ref() -> impl Strategy<Value = (Option<String>, String)> {
        (proptest::option::of(phase_name()), phase_name())
    }
}

#[cfg(test)]
mod tests {
    use super::generators::*;
    use crate::config::defaults::MIN_PROPTEST_ITERATIONS;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(MIN_PROPTEST_ITERATIONS))]

        #[test]
        fn test_phase_name_generator(name in phase_name()) {
            prop_assert!(!name.is_empty());
            prop_assert!(!name.contains('/'));
            prop_assert!(name
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '-' | '_')));
        }

        #[test]
        fn test_config_key_generator(key in config_key()) {
            let parts: Vec<&str> = key.split('.').collect();
            prop_assert_eq!(parts.len(), 2);
            prop_assert!(parts.iter().all(|part| !part.is_empty()));
        }

        #[test]
        fn test_config_value_generator(value in config_value()) {
            prop_assert!(!value.contains('='));
            prop_assert!(!value.contains(' '));
        }
    }
}
