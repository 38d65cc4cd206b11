//! Core composition engine
//!
//! Apart from reading the manifest, nothing here touches the filesystem or
//! spawns processes. Globbing and executable lookup come in through the
//! traits in [`crate::infra`].
//!
//! # Submodules
//!
//! - [`store`] - Scoped configuration store
//! - [`value`] - Literal-or-deferred values and variable resolution
//! - [`executor`] - Command builder and hook pipeline
//! - [`outputs`] - Output registry
//! - [`phase`] - Phases and phase references
//! - [`extension`] - Extensions and kind dispatch
//! - [`resolver`] - Phase dependency ordering
//! - [`project`] - Projects
//! - [`generate`] - Generation pipeline
//! - [`manifest`] - Manifest (plinth.toml) parsing

pub mod executor;
pub mod extension;
pub mod generate;
pub mod manifest;
pub mod outputs;
pub mod phase;
pub mod project;
pub mod resolver;
pub mod store;
pub mod value;
