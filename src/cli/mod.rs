//! Command-line interface module.

pub mod args;
pub mod build;
pub mod scan;

pub use args::{BuildArgs, Cli, Commands, ScanArgs};
