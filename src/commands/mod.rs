//! # CLI Command Implementations
//!
//! Each subcommand of the `repolish` tool lives in its own file with:
//! - An `Args` struct that defines the command-specific arguments, derived
//!   using `clap`.
//! - An `execute` function that takes the parsed `Args` and the output
//!   configuration, calls into the `repolish` library and returns the
//!   process exit code.

pub mod apply;
pub mod link;
pub mod preview;
