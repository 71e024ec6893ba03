//! Tooling & Integration Layer
//!
//! The `recall` command line: the prompt hook entry point plus the
//! maintenance commands that operate on the same local state.

pub mod cli;

pub use cli::{Cli, CliContext, Commands};
