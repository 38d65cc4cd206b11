//! Configuration constants
//!
//! - [`defaults`] - Default values seeded into the root configuration scope
//! - [`keys`] - Well-known configuration store keys

pub mod defaults;
pub mod keys;
