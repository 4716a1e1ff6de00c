//! Command-line interface for `sds-rulemgr`.
//!
//! - `args`: CLI argument definitions (clap)
//! - `run`: entry point and dispatch
//! - `commands`: per-subcommand implementations

pub mod args;
mod commands;
mod run;

pub use run::run;
