//! Command-line interface definitions.

use crate::asset::MinifierVariant;
use clap::{ColorChoice, Parser, Subcommand};
use std::path::PathBuf;

/// Build-time script bundler for HTML templates
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None, arg_required_else_help = true)]
pub struct Cli {
    /// Control colored output (auto, always, never)
    #[arg(long, global = true, default_value = "auto")]
    pub color: ColorChoice,

    /// Source directory path (relative to project root)
    #[arg(short, long, global = true, value_hint = clap::ValueHint::DirPath)]
    pub source: Option<PathBuf>,

    /// Output directory path (relative to project root)
    #[arg(short, long, global = true, value_hint = clap::ValueHint::DirPath)]
    pub output: Option<PathBuf>,

    /// Config file path (default: scriptmin.toml)
    #[arg(short = 'C', long, global = true, default_value = "scriptmin.toml", value_hint = clap::ValueHint::FilePath)]
    pub config: PathBuf,

    /// subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Rewrite templates and emit bundled scripts into the output tree
    #[command(visible_alias = "b")]
    Build {
        #[command(flatten)]
        build_args: BuildArgs,
    },

    /// List the script groups of every template without writing anything
    Scan {
        #[command(flatten)]
        args: ScanArgs,
    },
}

/// Build command arguments.
#[derive(clap::Args, Debug, Clone, Default)]
pub struct BuildArgs {
    /// Remove the output directory before building
    #[arg(short, long)]
    pub clean: bool,

    /// Minification strategy for every minify step
    #[arg(short, long, value_enum)]
    pub processor: Option<MinifierVariant>,

    /// Only print warnings and errors
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Enable verbose output for debugging
    #[arg(short = 'V', long)]
    pub verbose: bool,
}

/// Scan command arguments.
#[derive(clap::Args, Debug, Clone, Default)]
pub struct ScanArgs {
    /// Emit JSON instead of a human-readable listing
    #[arg(short, long)]
    pub json: bool,

    /// Pretty-print JSON output
    #[arg(short, long, requires = "json")]
    pub pretty: bool,

    /// Enable verbose output for debugging
    #[arg(short = 'V', long)]
    pub verbose: bool,
}

impl Cli {
    pub const fn is_build(&self) -> bool {
        matches!(self.command, Commands::Build { .. })
    }

    /// Verbose flag of whichever command is running.
    pub const fn verbose(&self) -> bool {
        match &self.command {
            Commands::Build { build_args } => build_args.verbose,
            Commands::Scan { args } => args.verbose,
        }
    }
}
