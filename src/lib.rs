//! # bucket-sync
//!
//! Command-line front end for the [`core_sync`] engine. The binary maps
//! container names onto directories under `--root` through
//! [`bridge_local::DirectoryObjectStore`] and prints progress and the final
//! report to stdout; logs go to stderr.

pub mod cli;

pub use cli::{command, run, CliArgs, EXIT_FATAL, EXIT_PARTIAL_FAILURE, EXIT_SUCCESS};
