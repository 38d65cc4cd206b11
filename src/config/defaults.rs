//! Default configuration values

/// Default output directory, relative to the project root
pub const DEFAULT_OUTPUT_DIR: &str = "build";

/// Default project manifest file name
pub const DEFAULT_MANIFEST: &str = "plinth.toml";

/// Default build file written by `plinth generate`
pub const DEFAULT_BUILD_FILE: &str = "build.ninja";

/// Name of the root configuration scope
pub const ROOT_SCOPE: &str = "root";

/// Minimum proptest iterations
pub const MIN_PROPTEST_ITERATIONS: u32 = 100;
