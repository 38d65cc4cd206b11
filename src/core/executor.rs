//! Command builder
//!
//! An [`Executor`] describes one phase's command line: where the command comes
//! from, an ordered list of arguments, the kind tags extensions dispatch on,
//! and hooks that run right before the command is rendered.
//!
//! Toolchain families are plain constructor functions that configure an
//! `Executor` (see [`crate::toolchains`]); nothing here knows about any
//! particular compiler.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use serde::Serialize;

use crate::config::keys::BUILD_PLATFORM;
use crate::core::generate::ResolvedBuild;
use crate::core::store::ConfigStore;
use crate::core::value::{Lazy, LazyFn, Var};
use crate::error::{ResolveError, Result};
use crate::infra::executables::ExecutableResolver;

/// Capability tag declared by an executor
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Kind(String);

impl Kind {
    /// Create a kind tag
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Tag name
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Kind {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Target platform for argument filtering
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    /// `/` separators, `:` path lists
    Unix,
    /// `\` separators, `;` path lists
    Windows,
}

impl Platform {
    /// Platform of the running process
    pub fn host() -> Self {
        if cfg!(windows) {
            Self::Windows
        } else {
            Self::Unix
        }
    }

    /// Platform named by `build.platform`, else the host
    pub fn from_store(store: &ConfigStore) -> Self {
        match store.get_str(BUILD_PLATFORM) {
            Some("windows") => Self::Windows,
            Some("unix") => Self::Unix,
            _ => Self::host(),
        }
    }

    /// Separator for path lists such as a classpath
    pub fn list_separator(self) -> char {
        match self {
            Self::Unix => ':',
            Self::Windows => ';',
        }
    }
}

/// Normalize a filtered argument for the target platform.
///
/// Separators are converted, `$` is escaped so the build file passes it
/// through literally, and tokens containing whitespace are quoted.
pub fn filter_argument(value: &str, platform: Platform) -> String {
    let normalized = match platform {
        Platform::Windows => value.replace('/', "\\"),
        Platform::Unix => value.to_string(),
    };
    let escaped = normalized.replace('$', "$$");
    if escaped.chars().any(char::is_whitespace) {
        format!("\"{}\"", escaped.replace('"', "\\\""))
    } else {
        escaped
    }
}

/// How a phase's outputs are derived from its inputs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputType {
    /// One output per input
    Object,
    /// Single output
    #[default]
    Binary,
    /// Single library output
    Library,
    /// Single generated source output
    Source,
}

impl OutputType {
    /// Whether each input produces its own output
    pub fn per_input(self) -> bool {
        matches!(self, Self::Object)
    }

    /// Directory under the output root this type is placed in
    pub fn dir_name(self) -> &'static str {
        match self {
            Self::Object => "obj",
            Self::Binary => "bin",
            Self::Library => "lib",
            Self::Source => "src",
        }
    }
}

impl FromStr for OutputType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "object" => Ok(Self::Object),
            "binary" => Ok(Self::Binary),
            "library" => Ok(Self::Library),
            "source" => Ok(Self::Source),
            other => Err(format!(
                "unknown output type '{other}' (expected object, binary, library or source)"
            )),
        }
    }
}

/// Where the command comes from
#[derive(Clone)]
pub enum CommandSource {
    /// Command name or path, searched for when bare
    Literal(String),
    /// Path used verbatim, never searched for
    Path(PathBuf),
    /// `fallback(explicit, key, default)` against the active configuration
    Configured {
        explicit: Option<String>,
        key: String,
        default: String,
    },
    /// Computed from the active configuration
    Deferred(LazyFn),
}

impl CommandSource {
    /// Literal command name or path
    pub fn literal(command: impl Into<String>) -> Self {
        Self::Literal(command.into())
    }

    /// Path used verbatim
    pub fn path(path: impl Into<PathBuf>) -> Self {
        Self::Path(path.into())
    }

    /// Command taken from `explicit`, then the configuration key, then `default`
    pub fn configured(
        explicit: Option<String>,
        key: impl Into<String>,
        default: impl Into<String>,
    ) -> Self {
        Self::Configured {
            explicit,
            key: key.into(),
            default: default.into(),
        }
    }

    /// Command computed from the active configuration
    pub fn deferred(f: impl Fn(&ConfigStore) -> String + Send + Sync + 'static) -> Self {
        Self::Deferred(Arc::new(f))
    }

    /// Configuration key that supplies the command, if any
    pub fn key(&self) -> Option<&str> {
        match self {
            Self::Configured { key, .. } => Some(key),
            _ => None,
        }
    }

    /// Command value before executable search
    pub fn resolve_value(&self, store: &ConfigStore) -> String {
        match self {
            Self::Literal(command) => command.clone(),
            Self::Path(path) => path.display().to_string(),
            Self::Configured {
                explicit,
                key,
                default,
            } => store.fallback(explicit.as_deref(), key, default),
            Self::Deferred(f) => f(store),
        }
    }

    /// Resolve to an invocable program. Bare names go through the executable
    /// resolver; anything with a path separator is used as given.
    pub fn resolve_program(
        &self,
        store: &ConfigStore,
        resolver: &dyn ExecutableResolver,
    ) -> Result<String, ResolveError> {
        let value = self.resolve_value(store);
        if value.is_empty() {
            return Err(ResolveError::EmptyCommand {
                key: self.key().map(str::to_string),
            });
        }
        if matches!(self, Self::Path(_)) || !is_bare_command(&value) {
            return Ok(value);
        }
        resolver
            .resolve(&value)
            .map(|path| path.display().to_string())
            .ok_or_else(|| ResolveError::CommandNotFound {
                command: value,
                key: self.key().map(str::to_string),
            })
    }
}

impl fmt::Debug for CommandSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(command) => f.debug_tuple("Literal").field(command).finish(),
            Self::Path(path) => f.debug_tuple("Path").field(path).finish(),
            Self::Configured {
                explicit,
                key,
                default,
            } => f
                .debug_struct("Configured")
                .field("explicit", explicit)
                .field("key", key)
                .field("default", default)
                .finish(),
            Self::Deferred(_) => f.write_str("Deferred(..)"),
        }
    }
}

fn is_bare_command(value: &str) -> bool {
    !value.contains('/') && !value.contains('\\')
}

/// One command-line argument
#[derive(Debug, Clone)]
pub struct Argument {
    value: Lazy,
    filtered: bool,
}

impl Argument {
    /// Argument subject to platform filtering
    pub fn filtered(value: impl Into<Lazy>) -> Self {
        Self {
            value: value.into(),
            filtered: true,
        }
    }

    /// Argument passed through verbatim (`$in`, `>`, ...)
    pub fn unfiltered(value: impl Into<Lazy>) -> Self {
        Self {
            value: value.into(),
            filtered: false,
        }
    }

    /// Whether the argument is filtered
    pub fn is_filtered(&self) -> bool {
        self.filtered
    }

    /// Render against the active configuration
    pub fn render(&self, store: &ConfigStore, platform: Platform) -> String {
        let value = self.value.resolve(store);
        if self.filtered {
            filter_argument(&value, platform)
        } else {
            value
        }
    }
}

/// What a hook sees while it runs
#[derive(Debug, Clone, Copy)]
pub struct HookContext<'a> {
    /// Configuration, with the phase scope active
    pub store: &'a ConfigStore,
    /// Project name
    pub project: &'a str,
    /// Phase name
    pub phase: &'a str,
    /// Base directory of the phase's literal inputs
    pub input_path: Option<&'a Path>,
    /// Output directory of the phase
    pub output_dir: &'a Path,
    /// Build statements with their resolved variables
    pub builds: &'a [ResolvedBuild],
}

/// Mutation run on a working copy of the executor before rendering
pub type Hook = Arc<dyn Fn(&mut Executor, &HookContext<'_>) -> Result<()> + Send + Sync>;

/// Finalized command line, program first
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommandLine {
    /// Program followed by its arguments
    pub tokens: Vec<String>,
}

impl CommandLine {
    /// The program token
    pub fn program(&self) -> &str {
        self.tokens.first().map_or("", String::as_str)
    }

    /// Arguments after the program
    pub fn args(&self) -> &[String] {
        self.tokens.get(1..).unwrap_or_default()
    }
}

impl fmt::Display for CommandLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.tokens.join(" "))
    }
}

/// Command builder
#[derive(Clone)]
pub struct Executor {
    command: CommandSource,
    kinds: Vec<Kind>,
    arguments: Vec<Argument>,
    hooks: Vec<Hook>,
    lists: BTreeMap<String, Vec<Lazy>>,
    vars: BTreeMap<String, Var>,
    output_type: OutputType,
    output_extension: Option<String>,
}

impl Executor {
    /// Create an executor with no arguments, kinds or hooks
    pub fn new(command: CommandSource) -> Self {
        Self {
            command,
            kinds: Vec::new(),
            arguments: Vec::new(),
            hooks: Vec::new(),
            lists: BTreeMap::new(),
            vars: BTreeMap::new(),
            output_type: OutputType::default(),
            output_extension: None,
        }
    }

    /// Declare a kind tag
    #[must_use]
    pub fn with_kind(mut self, kind: impl Into<Kind>) -> Self {
        let kind = kind.into();
        if !self.kinds.contains(&kind) {
            self.kinds.push(kind);
        }
        self
    }

    /// Set how outputs are derived
    #[must_use]
    pub fn with_output(mut self, output_type: OutputType, extension: Option<&str>) -> Self {
        self.output_type = output_type;
        self.output_extension = extension.map(str::to_string);
        self
    }

    /// Command source
    pub fn command(&self) -> &CommandSource {
        &self.command
    }

    /// Declared kind tags, in declaration order
    pub fn kinds(&self) -> &[Kind] {
        &self.kinds
    }

    /// Whether the executor declares `kind`
    pub fn has_kind(&self, kind: &Kind) -> bool {
        self.kinds.contains(kind)
    }

    /// Output type
    pub fn output_type(&self) -> OutputType {
        self.output_type
    }

    /// Output file extension, without the dot
    pub fn output_extension(&self) -> Option<&str> {
        self.output_extension.as_deref()
    }

    /// Arguments in order
    pub fn arguments(&self) -> &[Argument] {
        &self.arguments
    }

    /// Append a filtered argument
    pub fn add_argument(&mut self, value: impl Into<Lazy>) {
        self.arguments.push(Argument::filtered(value));
    }

    /// Append several filtered arguments
    pub fn add_arguments<I, V>(&mut self, values: I)
    where
        I: IntoIterator<Item = V>,
        V: Into<Lazy>,
    {
        self.arguments
            .extend(values.into_iter().map(Argument::filtered));
    }

    /// Append an argument passed through verbatim
    pub fn add_argument_unfiltered(&mut self, value: impl Into<Lazy>) {
        self.arguments.push(Argument::unfiltered(value));
    }

    /// Whether a literal unfiltered argument equal to `value` is present
    pub fn has_unfiltered(&self, value: &str) -> bool {
        self.arguments
            .iter()
            .any(|arg| !arg.filtered && arg.value.as_literal() == Some(value))
    }

    /// Register a hook; hooks run in registration order at finalize time
    pub fn register_hook(
        &mut self,
        hook: impl Fn(&mut Executor, &HookContext<'_>) -> Result<()> + Send + Sync + 'static,
    ) {
        self.hooks.push(Arc::new(hook));
    }

    /// Declare a named value list (e.g. a classpath) extensions may append to
    pub fn declare_list(&mut self, name: impl Into<String>) {
        self.lists.entry(name.into()).or_default();
    }

    /// Values of a declared list
    pub fn list(&self, name: &str) -> Option<&[Lazy]> {
        self.lists.get(name).map(Vec::as_slice)
    }

    /// Mutable access to a declared list; `None` if it was never declared
    pub fn list_mut(&mut self, name: &str) -> Option<&mut Vec<Lazy>> {
        self.lists.get_mut(name)
    }

    /// Provide a default variable binding for phases using this executor
    pub fn bind_var(&mut self, name: impl Into<String>, var: impl Into<Var>) {
        self.vars.insert(name.into(), var.into());
    }

    /// Executor-provided variable bindings
    pub fn vars(&self) -> &BTreeMap<String, Var> {
        &self.vars
    }

    /// Run hooks on this executor, then render the command line.
    ///
    /// Call on a working copy: hooks mutate the executor they run on.
    pub fn finalize(
        mut self,
        ctx: &HookContext<'_>,
        resolver: &dyn ExecutableResolver,
    ) -> Result<CommandLine> {
        let hooks = std::mem::take(&mut self.hooks);
        for hook in &hooks {
            hook(&mut self, ctx)?;
        }

        let platform = Platform::from_store(ctx.store);
        let program = self.command.resolve_program(ctx.store, resolver)?;

        let mut tokens = Vec::with_capacity(self.arguments.len() + 1);
        tokens.push(filter_argument(&program, platform));
        tokens.extend(
            self.arguments
                .iter()
                .map(|arg| arg.render(ctx.store, platform)),
        );
        Ok(CommandLine { tokens })
    }

    /// Finalize a copy, leaving this executor untouched
    pub fn command_line(
        &self,
        ctx: &HookContext<'_>,
        resolver: &dyn ExecutableResolver,
    ) -> Result<CommandLine> {
        self.clone().finalize(ctx, resolver)
    }
}

impl fmt::Debug for Executor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Executor")
            .field("command", &self.command)
            .field("kinds", &self.kinds)
            .field("arguments", &self.arguments)
            .field("hooks", &self.hooks.len())
            .field("lists", &self.lists)
            .field("vars", &self.vars)
            .field("output_type", &self.output_type)
            .field("output_extension", &self.output_extension)
            .finish()
    }
}
