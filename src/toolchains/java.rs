//! Java toolchain
//!
//! [`JavaCompile`] turns `.java` sources into one `.class` per source;
//! [`Jar`] bundles classes into a `.jar`. Jar phases usually take no direct
//! inputs: [`JavaClasses`] points them at a compile phase, adds a rebuild-on
//! edge and renders that phase's recorded outputs as `-C <dir> <file>` pairs.
//!
//! Commands come from `java.javac_command` / `java.jar_command` unless the
//! executor names one explicitly, and are resolved when the phase is
//! generated, so a phase scope can swap the compiler.

use crate::config::keys::{BUILD_DEBUG, JAVA_JAR_COMMAND, JAVA_JAVAC_COMMAND};
use crate::core::executor::{
    filter_argument, CommandSource, Executor, HookContext, Kind, OutputType, Platform,
};
use crate::core::extension::Extension;
use crate::core::outputs::Artifact;
use crate::core::phase::{Phase, PhaseRef};
use crate::core::store::ConfigStore;
use crate::core::value::{EvalContext, Lazy, Var};
use crate::error::{CapabilityError, Result};

/// Default `javac` command
pub const DEFAULT_JAVAC_COMMAND: &str = "javac";

/// Default `jar` command
pub const DEFAULT_JAR_COMMAND: &str = "jar";

/// Kind tag of [`JavaCompile`] executors
pub const JAVA_COMPILE: &str = "java_compile";

/// Kind tag of [`Jar`] executors
pub const JAVA_JAR: &str = "java_jar";

/// Name of the classpath list on compile executors
pub const CLASSPATH: &str = "classpath";

const JAVA_CLASSES: &str = "java.classes";

/// Write the Java commands into the innermost scope. Empty or missing
/// values fall back to `javac` / `jar`.
pub fn configure_java(
    store: &mut ConfigStore,
    javac_command: Option<&str>,
    jar_command: Option<&str>,
) {
    let javac = javac_command
        .filter(|c| !c.is_empty())
        .unwrap_or(DEFAULT_JAVAC_COMMAND);
    let jar = jar_command
        .filter(|c| !c.is_empty())
        .unwrap_or(DEFAULT_JAR_COMMAND);
    tracing::debug!("Configuring Java: javac={}, jar={}", javac, jar);
    store.set(JAVA_JAVAC_COMMAND, javac);
    store.set(JAVA_JAR_COMMAND, jar);
}

/// `javac` executor builder
#[derive(Debug, Clone, Default)]
pub struct JavaCompile {
    command: Option<String>,
    classpath: Vec<Lazy>,
}

impl JavaCompile {
    /// Compiler taken from `java.javac_command`
    pub fn new() -> Self {
        Self::default()
    }

    /// Use an explicit compiler command
    #[must_use]
    pub fn with_command(mut self, command: impl Into<String>) -> Self {
        self.command = Some(command.into());
        self
    }

    /// Add an initial classpath entry
    #[must_use]
    pub fn with_classpath(mut self, entry: impl Into<Lazy>) -> Self {
        self.classpath.push(entry.into());
        self
    }

    /// Build the executor.
    ///
    /// Arguments are `$in`, then from hooks: `-g` when `build.debug` is set,
    /// `-d $output_path`, and `-classpath` when the classpath is non-empty.
    /// The phase's `input_path` joins the classpath so sources can see each
    /// other's packages.
    pub fn into_executor(self) -> Executor {
        let mut executor = Executor::new(CommandSource::configured(
            self.command,
            JAVA_JAVAC_COMMAND,
            DEFAULT_JAVAC_COMMAND,
        ))
        .with_kind(JAVA_COMPILE)
        .with_output(OutputType::Object, Some("class"));

        executor.declare_list(CLASSPATH);
        if let Some(classpath) = executor.list_mut(CLASSPATH) {
            classpath.extend(self.classpath);
        }
        executor.add_argument_unfiltered("$in");
        executor.bind_var("output_path", Var::deferred(output_path_var));
        executor.register_hook(debug_hook);
        executor.register_hook(compile_hook);
        executor.register_hook(classpath_hook);
        executor
    }
}

impl From<JavaCompile> for Executor {
    fn from(compile: JavaCompile) -> Self {
        compile.into_executor()
    }
}

/// Custom ninja variables are not shell-quoted, so the directory is
/// filtered like any other argument
fn output_path_var(
    ctx: &EvalContext<'_>,
    _output: &Artifact,
    _inputs: &[Artifact],
) -> Result<String> {
    let dir = ctx.output_dir.display().to_string();
    Ok(filter_argument(&dir, Platform::from_store(ctx.store)))
}

fn debug_hook(executor: &mut Executor, ctx: &HookContext<'_>) -> Result<()> {
    if ctx.store.get_bool(BUILD_DEBUG, false) {
        executor.add_argument("-g");
    }
    Ok(())
}

fn compile_hook(executor: &mut Executor, ctx: &HookContext<'_>) -> Result<()> {
    executor.add_argument_unfiltered("-d");
    executor.add_argument_unfiltered("$output_path");
    if let Some(input_path) = ctx.input_path {
        classpath_of(executor, "java.compile")?.push(Lazy::from(input_path));
    }
    Ok(())
}

fn classpath_hook(executor: &mut Executor, ctx: &HookContext<'_>) -> Result<()> {
    let entries: Vec<String> = executor
        .list(CLASSPATH)
        .unwrap_or_default()
        .iter()
        .map(|entry| entry.resolve(ctx.store))
        .filter(|entry| !entry.is_empty())
        .collect();
    if !entries.is_empty() {
        let separator = Platform::from_store(ctx.store).list_separator().to_string();
        executor.add_argument("-classpath");
        executor.add_argument(entries.join(separator.as_str()));
    }
    Ok(())
}

fn classpath_of<'e>(
    executor: &'e mut Executor,
    extension: &str,
) -> Result<&'e mut Vec<Lazy>, CapabilityError> {
    executor
        .list_mut(CLASSPATH)
        .ok_or_else(|| CapabilityError::MissingCapability {
            extension: extension.to_string(),
            capability: CLASSPATH.to_string(),
        })
}

/// `jar` executor builder
#[derive(Debug, Clone, Default)]
pub struct Jar {
    command: Option<String>,
    manifest: Option<Lazy>,
    store_only: bool,
    preserve_paths: bool,
    disable_manifest: bool,
}

impl Jar {
    /// Jar tool taken from `java.jar_command`
    pub fn new() -> Self {
        Self::default()
    }

    /// Use an explicit jar command
    #[must_use]
    pub fn with_command(mut self, command: impl Into<String>) -> Self {
        self.command = Some(command.into());
        self
    }

    /// Include a manifest file (`cfm`)
    #[must_use]
    pub fn with_manifest(mut self, manifest: impl Into<Lazy>) -> Self {
        self.manifest = Some(manifest.into());
        self
    }

    /// Store entries without compression (`-0`)
    #[must_use]
    pub fn store_only(mut self) -> Self {
        self.store_only = true;
        self
    }

    /// Keep absolute paths and `..` components (`-P`)
    #[must_use]
    pub fn preserve_paths(mut self) -> Self {
        self.preserve_paths = true;
        self
    }

    /// Do not write a manifest (`-M`)
    #[must_use]
    pub fn disable_manifest(mut self) -> Self {
        self.disable_manifest = true;
        self
    }

    /// Build the executor: `cf $out` or `cfm $out <manifest>`, then options
    pub fn into_executor(self) -> Executor {
        let mut executor = Executor::new(CommandSource::configured(
            self.command,
            JAVA_JAR_COMMAND,
            DEFAULT_JAR_COMMAND,
        ))
        .with_kind(JAVA_JAR)
        .with_output(OutputType::Binary, Some("jar"));

        if let Some(manifest) = self.manifest {
            executor.add_argument_unfiltered("cfm");
            executor.add_argument_unfiltered("$out");
            executor.add_argument(manifest);
        } else {
            executor.add_argument_unfiltered("cf");
            executor.add_argument_unfiltered("$out");
        }
        if self.store_only {
            executor.add_argument("-0");
        }
        if self.preserve_paths {
            executor.add_argument("-P");
        }
        if self.disable_manifest {
            executor.add_argument("-M");
        }
        executor
    }
}

impl From<Jar> for Executor {
    fn from(jar: Jar) -> Self {
        jar.into_executor()
    }
}

/// Classes produced by another phase, bundled by a jar phase
#[derive(Debug, Clone)]
pub struct JavaClasses {
    source: PhaseRef,
}

impl JavaClasses {
    /// Bundle the outputs of `source`
    pub fn new(source: impl Into<PhaseRef>) -> Self {
        Self {
            source: source.into(),
        }
    }
}

impl Extension for JavaClasses {
    fn name(&self) -> &str {
        JAVA_CLASSES
    }

    fn required_kinds(&self) -> Vec<Kind> {
        vec![Kind::from(JAVA_JAR)]
    }

    fn executor_kinds(&self) -> Vec<Kind> {
        vec![Kind::from(JAVA_JAR)]
    }

    fn apply_to_phase(&self, phase: &mut Phase) -> Result<()> {
        phase.add_rebuild_on_from(self.source.clone());
        phase.bind_variable("inputs", Var::deferred(jar_inputs_var));
        phase
            .extension_state_mut(JAVA_CLASSES)
            .refs
            .push(self.source.clone());
        Ok(())
    }

    fn apply_to_executor(
        &self,
        _kind: &Kind,
        executor: &mut Executor,
        _ctx: &EvalContext<'_>,
    ) -> Result<()> {
        // Several JavaClasses share one `$inputs` variable
        if !executor.has_unfiltered("$inputs") {
            executor.add_argument_unfiltered("$inputs");
        }
        Ok(())
    }
}

fn jar_inputs_var(
    ctx: &EvalContext<'_>,
    _output: &Artifact,
    _inputs: &[Artifact],
) -> Result<String> {
    let platform = Platform::from_store(ctx.store);
    let sources = ctx
        .phase
        .extension_state(JAVA_CLASSES)
        .map(|state| state.refs.as_slice())
        .unwrap_or_default();

    let entries: Vec<String> = sources
        .iter()
        .flat_map(|source| ctx.outputs_of(source))
        .map(|artifact| jar_entry(artifact, platform))
        .collect();
    Ok(entries.join(" "))
}

/// `-C <dir> <relative file>`, or the bare file when it is not under its dir
fn jar_entry(artifact: &Artifact, platform: Platform) -> String {
    let file = |path: &std::path::Path| filter_argument(&path.display().to_string(), platform);
    match artifact.file.strip_prefix(&artifact.dir) {
        Ok(relative) if !artifact.dir.as_os_str().is_empty() => {
            format!("-C {} {}", file(&artifact.dir), file(relative))
        }
        _ => file(&artifact.file),
    }
}

/// Extra classpath entries for compile phases
#[derive(Debug, Clone)]
pub struct Classpath {
    entries: Vec<Lazy>,
}

impl Classpath {
    /// Add `entries` to the classpath of every compile executor on the phase
    pub fn new<I, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Lazy>,
    {
        Self {
            entries: entries.into_iter().map(Into::into).collect(),
        }
    }
}

impl Extension for Classpath {
    fn name(&self) -> &str {
        "java.classpath"
    }

    fn required_kinds(&self) -> Vec<Kind> {
        vec![Kind::from(JAVA_COMPILE)]
    }

    fn executor_kinds(&self) -> Vec<Kind> {
        vec![Kind::from(JAVA_COMPILE)]
    }

    fn apply_to_executor(
        &self,
        _kind: &Kind,
        executor: &mut Executor,
        _ctx: &EvalContext<'_>,
    ) -> Result<()> {
        classpath_of(executor, self.name())?.extend(self.entries.iter().cloned());
        Ok(())
    }
}

/// Put another phase's outputs on the classpath.
///
/// Class files contribute their output directory (once); anything else, such
/// as a jar, contributes the file itself.
#[derive(Debug, Clone)]
pub struct ClasspathFrom {
    source: PhaseRef,
}

impl ClasspathFrom {
    /// Use the outputs of `source`
    pub fn new(source: impl Into<PhaseRef>) -> Self {
        Self {
            source: source.into(),
        }
    }
}

impl Extension for ClasspathFrom {
    fn name(&self) -> &str {
        "java.classpath_from"
    }

    fn required_kinds(&self) -> Vec<Kind> {
        vec![Kind::from(JAVA_COMPILE)]
    }

    fn executor_kinds(&self) -> Vec<Kind> {
        vec![Kind::from(JAVA_COMPILE)]
    }

    fn apply_to_phase(&self, phase: &mut Phase) -> Result<()> {
        phase.add_rebuild_on_from(self.source.clone());
        Ok(())
    }

    fn apply_to_executor(
        &self,
        _kind: &Kind,
        executor: &mut Executor,
        ctx: &EvalContext<'_>,
    ) -> Result<()> {
        let mut entries: Vec<String> = Vec::new();
        for artifact in ctx.outputs_of(&self.source) {
            let is_class = artifact.file.extension().is_some_and(|ext| ext == "class");
            let entry = if is_class { &artifact.dir } else { &artifact.file };
            let entry = entry.display().to_string();
            if !entries.contains(&entry) {
                entries.push(entry);
            }
        }
        classpath_of(executor, self.name())?.extend(entries.into_iter().map(Lazy::from));
        Ok(())
    }
}
