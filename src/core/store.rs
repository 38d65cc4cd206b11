//! Hierarchical configuration store
//!
//! A stack of named scopes holding dotted-key entries. Lookups walk from the
//! innermost active scope outward to the root (and then to an optional shared
//! read-only base). Writes always land in the innermost scope.
//!
//! Scopes are acquired with [`ConfigStore::push_scope`], which returns a
//! [`ScopeGuard`] that pops the scope when dropped, including on early return
//! through `?`.

use std::collections::BTreeMap;
use std::fs;
use std::ops::{Deref, DerefMut};
use std::path::Path;
use std::sync::Arc;

use toml::Value;

use crate::config::defaults::ROOT_SCOPE;
use crate::error::ConfigError;

/// One level of the configuration store
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Scope {
    /// Scope name, used in logs
    name: String,
    /// Dotted key -> value
    entries: BTreeMap<String, Value>,
}

impl Scope {
    /// Create an empty scope
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entries: BTreeMap::new(),
        }
    }

    /// Scope name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Look up a key in this scope only
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    /// Set a key in this scope
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.entries.insert(key.into(), value.into());
    }

    /// Iterate over entries in key order
    pub fn entries(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.entries.iter()
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the scope holds no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Merge a TOML table into this scope, flattening nested tables into
    /// dotted keys. Later merges overwrite earlier ones.
    pub fn merge_table(&mut self, table: &toml::Table) {
        flatten_into(&mut self.entries, "", table);
    }

    /// Load a scope from a TOML file
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ReadError` if the file cannot be read and
    /// `ConfigError::ParseError` if it is not valid TOML.
    pub fn load_from_path(name: impl Into<String>, path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.display().to_string(),
            error: e.to_string(),
        })?;

        let table: toml::Table = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.display().to_string(),
            error: e.to_string(),
        })?;

        let mut scope = Self::new(name);
        scope.merge_table(&table);
        Ok(scope)
    }
}

fn flatten_into(entries: &mut BTreeMap<String, Value>, prefix: &str, table: &toml::Table) {
    for (key, value) in table {
        let full_key = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{prefix}.{key}")
        };
        match value {
            Value::Table(inner) => flatten_into(entries, &full_key, inner),
            other => {
                entries.insert(full_key, other.clone());
            }
        }
    }
}

/// Parse a `KEY=VALUE` override. The value is read as a TOML literal
/// (`true`, `3`, `"x"`, `[..]`) and falls back to a plain string.
pub fn parse_override(input: &str) -> Result<(String, Value), ConfigError> {
    let (key, raw) = input
        .split_once('=')
        .ok_or_else(|| ConfigError::InvalidOverride {
            input: input.to_string(),
        })?;
    let key = key.trim();
    if key.is_empty() {
        return Err(ConfigError::InvalidOverride {
            input: input.to_string(),
        });
    }

    let value = toml::from_str::<toml::Table>(&format!("v = {raw}"))
        .ok()
        .and_then(|mut t| t.remove("v"))
        .unwrap_or_else(|| Value::String(raw.to_string()));

    Ok((key.to_string(), value))
}

/// Scoped key/value configuration
#[derive(Debug, Clone)]
pub struct ConfigStore {
    /// Shared read-only base, consulted after every owned scope
    base: Option<Arc<Scope>>,
    /// Owned scopes; index 0 is the root and is never popped
    scopes: Vec<Scope>,
}

impl Default for ConfigStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigStore {
    /// Create a store holding only an empty root scope
    pub fn new() -> Self {
        Self::from_root(Scope::new(ROOT_SCOPE))
    }

    /// Create a store whose root scope is `root`
    pub fn from_root(root: Scope) -> Self {
        Self {
            base: None,
            scopes: vec![root],
        }
    }

    /// Create an independent scope stack on top of a shared read-only base.
    ///
    /// Used when generation lanes run concurrently: each lane owns its stack,
    /// all lanes read the same base.
    pub fn with_base(base: Arc<Scope>) -> Self {
        Self {
            base: Some(base),
            scopes: vec![Scope::new(ROOT_SCOPE)],
        }
    }

    /// Flatten every visible entry into a single read-only scope
    pub fn freeze(&self) -> Arc<Scope> {
        let mut frozen = Scope::new(ROOT_SCOPE);
        if let Some(base) = &self.base {
            frozen.entries.extend(base.entries.clone());
        }
        for scope in &self.scopes {
            frozen.entries.extend(scope.entries.clone());
        }
        Arc::new(frozen)
    }

    /// Number of owned scopes, root included
    pub fn depth(&self) -> usize {
        self.scopes.len()
    }

    /// Push a new innermost scope; it is popped when the guard drops
    pub fn push_scope(&mut self, name: impl Into<String>) -> ScopeGuard<'_> {
        let name = name.into();
        tracing::debug!("Entering scope '{}'", name);
        self.scopes.push(Scope::new(name));
        let depth = self.scopes.len();
        ScopeGuard { store: self, depth }
    }

    /// Pop the innermost scope explicitly
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ScopeUnderflow` when only the root scope is active.
    pub fn pop_scope(&mut self) -> Result<Scope, ConfigError> {
        if self.scopes.len() <= 1 {
            return Err(ConfigError::ScopeUnderflow);
        }
        self.scopes.pop().ok_or(ConfigError::ScopeUnderflow)
    }

    /// Run `f` inside a fresh scope
    pub fn with_scope<R>(&mut self, name: impl Into<String>, f: impl FnOnce(&mut Self) -> R) -> R {
        let mut guard = self.push_scope(name);
        f(&mut guard)
    }

    /// Look up a key, innermost scope first
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.scopes
            .iter()
            .rev()
            .find_map(|scope| scope.get(key))
            .or_else(|| self.base.as_ref().and_then(|base| base.get(key)))
    }

    /// Look up a key, returning `default` when absent
    pub fn get_or<'a>(&'a self, key: &str, default: &'a Value) -> &'a Value {
        self.get(key).unwrap_or(default)
    }

    /// Look up a string value. Non-string values are not coerced.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    /// Look up a boolean, returning `default` when absent or not a boolean
    pub fn get_bool(&self, key: &str, default: bool) -> bool {
        self.get(key).and_then(Value::as_bool).unwrap_or(default)
    }

    /// Look up a key that must be present
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingKey` when no scope holds the key.
    pub fn require(&self, key: &str) -> Result<&Value, ConfigError> {
        self.get(key).ok_or_else(|| ConfigError::MissingKey {
            key: key.to_string(),
        })
    }

    /// Look up a string key that must be present
    pub fn require_str(&self, key: &str) -> Result<&str, ConfigError> {
        let value = self.require(key)?;
        value.as_str().ok_or_else(|| ConfigError::InvalidType {
            key: key.to_string(),
            expected: "string".to_string(),
            got: value.type_str().to_string(),
        })
    }

    /// Set a key in the innermost scope; outer scopes are untouched
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.set(key, value);
        }
    }

    /// `explicit` when non-empty, else the string at `key`, else `default`
    pub fn fallback(&self, explicit: Option<&str>, key: &str, default: &str) -> String {
        if let Some(value) = explicit.filter(|v| !v.is_empty()) {
            return value.to_string();
        }
        match self.get(key) {
            Some(Value::String(s)) if !s.is_empty() => s.clone(),
            Some(Value::String(_)) | None => default.to_string(),
            Some(other) => other.to_string(),
        }
    }

    fn release(&mut self, depth: usize) {
        if self.scopes.len() != depth {
            tracing::error!(
                "Scope nesting violated: expected depth {}, found {}",
                depth,
                self.scopes.len()
            );
        }
        self.scopes.truncate(depth.saturating_sub(1).max(1));
    }
}

/// Guard for a pushed scope; pops it (and anything pushed above it) on drop
#[derive(Debug)]
pub struct ScopeGuard<'a> {
    store: &'a mut ConfigStore,
    depth: usize,
}

impl Deref for ScopeGuard<'_> {
    type Target = ConfigStore;

    fn deref(&self) -> &ConfigStore {
        self.store
    }
}

impl DerefMut for ScopeGuard<'_> {
    fn deref_mut(&mut self) -> &mut ConfigStore {
        self.store
    }
}

impl Drop for ScopeGuard<'_> {
    fn drop(&mut self) {
        self.store.release(self.depth);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::defaults::MIN_PROPTEST_ITERATIONS;
    use crate::test_utils::generators::{config_key, config_value};
    use proptest::prelude::*;

    fn store_with(key: &str, value: &str) -> ConfigStore {
        let mut store = ConfigStore::new();
        store.set(key, value);
        store
    }

    #[test]
    fn test_inner_scope_shadows_and_reverts() {
        let mut store = store_with("java.javac_command", "javac");
        {
            let mut phase = store.push_scope("phase");
            assert_eq!(phase.get_str("java.javac_command"), Some("javac"));
            phase.set("java.javac_command", "custom-javac");
            assert_eq!(phase.get_str("java.javac_command"), Some("custom-javac"));
        }
        assert_eq!(store.get_str("java.javac_command"), Some("javac"));
        assert_eq!(store.depth(), 1);
    }

    #[test]
    fn test_guard_releases_on_error_path() {
        fn fails(store: &mut ConfigStore) -> Result<(), ConfigError> {
            let scope = store.push_scope("failing");
            scope.require("missing.key")?;
            Ok(())
        }

        let mut store = ConfigStore::new();
        assert!(fails(&mut store).is_err());
        assert_eq!(store.depth(), 1);
    }

    #[test]
    fn test_pop_without_push_is_underflow() {
        let mut store = ConfigStore::new();
        assert!(matches!(store.pop_scope(), Err(ConfigError::ScopeUnderflow)));
    }

    #[test]
    fn test_get_missing_returns_none_and_default() {
        let store = ConfigStore::new();
        let default = Value::Boolean(false);
        assert!(store.get("nope").is_none());
        assert_eq!(store.get_or("nope", &default), &default);
        assert!(!store.get_bool("nope", false));
    }

    #[test]
    fn test_fallback_precedence() {
        let store = store_with("java.jar_command", "fastjar");
        assert_eq!(store.fallback(Some("myjar"), "java.jar_command", "jar"), "myjar");
        assert_eq!(store.fallback(Some(""), "java.jar_command", "jar"), "fastjar");
        assert_eq!(store.fallback(None, "java.jar_command", "jar"), "fastjar");
        assert_eq!(store.fallback(None, "other", "jar"), "jar");
    }

    #[test]
    fn test_nested_tables_flatten() {
        let table: toml::Table = toml::from_str(
            r#"
            [java]
            javac_command = "javac8"

            [build]
            debug = true
            "#,
        )
        .unwrap();
        let mut root = Scope::new("root");
        root.merge_table(&table);
        let store = ConfigStore::from_root(root);

        assert_eq!(store.get_str("java.javac_command"), Some("javac8"));
        assert!(store.get_bool("build.debug", false));
    }

    #[test]
    fn test_parse_override() {
        let (key, value) = parse_override("build.debug=true").unwrap();
        assert_eq!(key, "build.debug");
        assert_eq!(value, Value::Boolean(true));

        let (_, value) = parse_override("java.javac_command=/opt/jdk/bin/javac").unwrap();
        assert_eq!(value, Value::String("/opt/jdk/bin/javac".to_string()));

        assert!(parse_override("no-equals").is_err());
        assert!(parse_override("=value").is_err());
    }

    #[test]
    fn test_lane_reads_shared_base() {
        let mut store = store_with("paths.output", "out");
        store.set("build.debug", true);
        let base = store.freeze();

        let mut lane = ConfigStore::with_base(Arc::clone(&base));
        assert_eq!(lane.get_str("paths.output"), Some("out"));
        lane.set("paths.output", "lane-out");
        assert_eq!(lane.get_str("paths.output"), Some("lane-out"));
        assert_eq!(base.get("paths.output"), Some(&Value::String("out".into())));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(MIN_PROPTEST_ITERATIONS))]

        /// Inner values are visible inside the scope and gone after it is popped
        #[test]
        fn prop_scope_set_visible_then_reverted(
            key in config_key(),
            outer in proptest::option::of(config_value()),
            inner in config_value(),
        ) {
            let mut store = ConfigStore::new();
            if let Some(outer) = &outer {
                store.set(key.clone(), outer.clone());
            }
            {
                let mut scope = store.push_scope("inner");
                scope.set(key.clone(), inner.clone());
                prop_assert_eq!(scope.get_str(&key), Some(inner.as_str()));
            }
            prop_assert_eq!(store.get_str(&key), outer.as_deref());
        }

        /// A non-empty explicit value always wins
        #[test]
        fn prop_fallback_explicit_wins(
            explicit in "[a-z]{1,10}",
            stored in proptest::option::of("[a-z]{0,10}"),
            default in "[a-z]{0,10}",
        ) {
            let mut store = ConfigStore::new();
            if let Some(stored) = stored {
                store.set("k.v", stored);
            }
            prop_assert_eq!(store.fallback(Some(&explicit), "k.v", &default), explicit);
        }
    }
}
