//! Plinth - build-configuration composition engine
//!
//! Declare build steps ("phases"), each driven by a command builder
//! ("executor"), and combine them into dependency-ordered pipelines whose
//! command lines, inputs and outputs are computed at generation time.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - [`cli`] - Command-line interface parsing and output formatting
//! - [`core`] - Composition engine (no I/O operations)
//! - [`toolchains`] - Executor families for concrete tools
//! - [`infra`] - Infrastructure layer (filesystem, globbing, build files)
//! - [`config`] - Configuration keys and defaults
//! - [`error`] - Error types and handling

pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod infra;
pub mod toolchains;

#[cfg(test)]
pub mod test_utils;
