//! Toolchain families
//!
//! A family is a set of constructors that configure an [`Executor`] for one
//! tool (its command key, default arguments, hooks and kind tags) plus the
//! extensions that act on executors of those kinds.
//!
//! - [`java`] - `javac` and `jar`
//!
//! [`Executor`]: crate::core::executor::Executor

pub mod java;
