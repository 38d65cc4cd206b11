//! Well-known configuration store keys
//!
//! Keys are dotted paths; nested TOML tables flatten into them
//! (`[java] javac_command` becomes `java.javac_command`).

/// Enables debug flags in executors that support them
pub const BUILD_DEBUG: &str = "build.debug";

/// Build variant, appended to the output directory when set
pub const BUILD_VARIANT: &str = "build.variant";

/// Target platform for argument path filtering (`unix` or `windows`)
pub const BUILD_PLATFORM: &str = "build.platform";

/// Root output directory
pub const PATHS_OUTPUT: &str = "paths.output";

/// Name of the project being generated
pub const CURRENT_PROJECT: &str = "current.project";

/// Name of the phase being generated
pub const CURRENT_PHASE: &str = "current.phase";

/// Output directory of the phase being generated
pub const CURRENT_OUTPUT_PATH: &str = "current.output_path";

/// Java compiler command, used when a `JavaCompile` executor names none
pub const JAVA_JAVAC_COMMAND: &str = "java.javac_command";

/// Jar tool command, used when a `Jar` executor names none
pub const JAVA_JAR_COMMAND: &str = "java.jar_command";
