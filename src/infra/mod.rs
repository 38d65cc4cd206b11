//! Infrastructure layer
//!
//! Filesystem access, globbing, executable lookup and build-file output.
//! This module is the only place where side effects occur.

pub mod executables;
pub mod filesystem;
pub mod glob;
pub mod ninja;
